//! Frame synchronization: collect one control word per sync marker.
//!
//! The correlator upstream flags the first bit after each sync pattern. The
//! framer waits for that flag, then takes exactly 76 bits and goes back to
//! waiting. Every word needs its own marker; there is no free-running mode.

use crate::types::Symbol;
use crate::word::{ControlWord, CONTROL_WORD_BITS};

/// Framer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Scanning for a sync flag.
    Unsynced,
    /// Inside a word, collecting bits.
    Tracking,
}

/// Collects control words from a flagged symbol stream.
#[derive(Debug)]
pub struct BitframeSync {
    state: SyncState,
    buf: Vec<u8>,
}

impl BitframeSync {
    pub fn new() -> Self {
        BitframeSync {
            state: SyncState::Unsynced,
            buf: Vec::with_capacity(CONTROL_WORD_BITS),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Bits collected towards the current word.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Feed one symbol. Returns a word when the 76th bit arrives.
    pub fn push(&mut self, sym: Symbol) -> Option<ControlWord> {
        if self.state == SyncState::Unsynced {
            if !sym.sync {
                return None;
            }
            self.state = SyncState::Tracking;
            self.buf.clear();
        }

        self.buf.push(sym.bit & 1);
        if self.buf.len() < CONTROL_WORD_BITS {
            return None;
        }

        let word = ControlWord::from_bits(&self.buf).ok();
        self.buf.clear();
        self.state = SyncState::Unsynced;
        word
    }
}

impl Default for BitframeSync {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn flagged(bits: &[u8]) -> Vec<Symbol> {
        bits.iter()
            .enumerate()
            .map(|(i, &b)| Symbol::new(b, i == 0))
            .collect()
    }

    #[test]
    fn test_ignores_bits_before_sync() {
        let mut sync = BitframeSync::new();
        for _ in 0..200 {
            assert!(sync.push(Symbol::new(1, false)).is_none());
        }
        assert_eq!(sync.state(), SyncState::Unsynced);
        assert_eq!(sync.buffered(), 0);
    }

    #[test]
    fn test_emits_word_after_76_bits() {
        let bits: Vec<u8> = (0..76).map(|i| (i % 3 == 0) as u8).collect();
        let mut sync = BitframeSync::new();
        let mut words = Vec::new();
        for sym in flagged(&bits) {
            if let Some(w) = sync.push(sym) {
                words.push(w);
            }
        }
        assert_eq!(words.len(), 1);
        assert_eq!(&words[0].0[..], &bits[..]);
        assert_eq!(sync.state(), SyncState::Unsynced);
    }

    #[test]
    fn test_flagged_bit_is_first_bit() {
        let mut sync = BitframeSync::new();
        sync.push(Symbol::new(0, false));
        sync.push(Symbol::new(1, true));
        assert_eq!(sync.state(), SyncState::Tracking);
        assert_eq!(sync.buffered(), 1);
    }

    #[test]
    fn test_requires_reacquisition() {
        let mut sync = BitframeSync::new();
        let bits = [0u8; 76];
        for sym in flagged(&bits) {
            sync.push(sym);
        }
        // Unflagged bits after a word are dropped
        for _ in 0..100 {
            assert!(sync.push(Symbol::new(0, false)).is_none());
        }
        assert_eq!(sync.buffered(), 0);
    }

    #[test]
    fn test_sync_flag_inside_word_ignored() {
        let mut sync = BitframeSync::new();
        let mut out = None;
        for i in 0..76 {
            out = sync.push(Symbol::new(1, i == 0 || i == 40));
        }
        assert!(out.is_some());
    }

    #[test]
    fn test_partial_word_waits() {
        let mut sync = BitframeSync::new();
        let bits = [1u8; 50];
        for sym in flagged(&bits) {
            assert!(sync.push(sym).is_none());
        }
        assert_eq!(sync.buffered(), 50);
        assert_eq!(sync.state(), SyncState::Tracking);
    }
}
