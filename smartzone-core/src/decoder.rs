//! Control channel decoder: symbols in, events out.
//!
//! Chains the framer, the word decoder and the OSW sequencer for one control
//! channel. Nothing here blocks or performs I/O; the caller supplies the
//! receive time of each symbol.

use crate::events::ZoneEvent;
use crate::sequencer::OswSequencer;
use crate::session::SESSION_WINDOW;
use crate::sync::{BitframeSync, SyncState};
use crate::types::{Osw, Symbol};
use crate::word::{encode_osw, ControlWord, WordDecoder};

#[derive(Debug)]
pub struct ControlChannelDecoder {
    sync: BitframeSync,
    words: WordDecoder,
    sequencer: OswSequencer,
}

impl ControlChannelDecoder {
    pub fn new(session_window: f64) -> Self {
        ControlChannelDecoder {
            sync: BitframeSync::new(),
            words: WordDecoder::new(),
            sequencer: OswSequencer::new(session_window),
        }
    }

    /// Feed one symbol received at `now` (seconds).
    pub fn push_symbol(&mut self, sym: Symbol, now: f64) -> Option<ZoneEvent> {
        let word = self.sync.push(sym)?;
        self.push_word(&word, now)
    }

    /// Feed a run of symbols sharing one timestamp.
    pub fn push_symbols<I>(&mut self, symbols: I, now: f64) -> Vec<ZoneEvent>
    where
        I: IntoIterator<Item = Symbol>,
    {
        symbols
            .into_iter()
            .filter_map(|s| self.push_symbol(s, now))
            .collect()
    }

    /// Decode a framed word. A CRC failure yields a `CrcError` event.
    pub fn push_word(&mut self, word: &ControlWord, now: f64) -> Option<ZoneEvent> {
        match self.words.decode(word) {
            Ok(osw) => self.sequencer.process(osw, now),
            Err(_) => Some(ZoneEvent::CrcError {
                error_rate: self.words.error_rate(),
            }),
        }
    }

    /// Feed an already validated OSW.
    pub fn process_osw(&mut self, osw: Osw, now: f64) -> Option<ZoneEvent> {
        self.sequencer.process(osw, now)
    }

    pub fn error_rate(&self) -> f64 {
        self.words.error_rate()
    }

    pub fn valid_words(&self) -> u64 {
        self.words.valid()
    }

    pub fn crc_errors(&self) -> u64 {
        self.words.errors()
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn sequencer(&self) -> &OswSequencer {
        &self.sequencer
    }
}

impl Default for ControlChannelDecoder {
    fn default() -> Self {
        ControlChannelDecoder::new(SESSION_WINDOW)
    }
}

/// Symbols that carry `osw` as one word, sync flag on the first bit.
pub fn symbols_for(osw: &Osw) -> Vec<Symbol> {
    encode_osw(osw)
        .0
        .iter()
        .enumerate()
        .map(|(i, &bit)| Symbol::new(bit, i == 0))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cmd;

    fn stream(osws: &[Osw], gap: usize) -> Vec<Symbol> {
        let mut out = Vec::new();
        for osw in osws {
            out.extend(std::iter::repeat(Symbol::new(1, false)).take(gap));
            out.extend(symbols_for(osw));
        }
        out
    }

    #[test]
    fn test_end_to_end_grant() {
        let osws = [
            Osw::new(0x2c65, false, cmd::FIRST_NORMAL),
            Osw::new(0x2800 | 693, false, cmd::EXTENDED_FCN),
            Osw::new(0x4001, false, cmd::FIRST_NORMAL),
            Osw::new(0x1230, true, 100),
        ];
        let mut dec = ControlChannelDecoder::default();
        let events = dec.push_symbols(stream(&osws, 13), 0.0);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), "system_id");
        let a = events[1].assignment().unwrap();
        assert_eq!(a.system_id, 0x2c65);
        assert_eq!(a.channel, 100);
        assert_eq!(a.group_id, 0x1230);
        assert_eq!(a.radio_id, Some(0x4001));
        assert_eq!(dec.valid_words(), 4);
        assert_eq!(dec.error_rate(), 0.0);
    }

    #[test]
    fn test_crc_error_event() {
        let mut dec = ControlChannelDecoder::default();
        let ev = dec.push_word(&ControlWord([0u8; 76]), 0.0);
        assert_eq!(ev, Some(ZoneEvent::CrcError { error_rate: 1.0 }));

        dec.push_symbols(symbols_for(&Osw::new(0, false, cmd::BACKGROUND_IDLE)), 0.0);
        assert_eq!(dec.crc_errors(), 1);
        assert_eq!(dec.valid_words(), 1);
        assert_eq!(dec.error_rate(), 0.5);
    }

    #[test]
    fn test_unsynced_noise_produces_nothing() {
        let mut dec = ControlChannelDecoder::default();
        let noise = (0..500).map(|i| Symbol::new((i % 2) as u8, false));
        assert!(dec.push_symbols(noise, 0.0).is_empty());
        assert_eq!(dec.sync_state(), SyncState::Unsynced);
        assert_eq!(dec.valid_words() + dec.crc_errors(), 0);
    }

    #[test]
    fn test_process_osw_bypasses_framing() {
        let mut dec = ControlChannelDecoder::default();
        let ev = dec.process_osw(Osw::new(0x0101, false, 0x361), 0.0);
        assert_eq!(ev, Some(ZoneEvent::SiteId { site: 1, id: 0x0101 }));
        assert_eq!(dec.sequencer().site_id(), Some(1));
    }
}
