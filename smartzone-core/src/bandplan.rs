//! Standard 800 MHz SmartZone band plan.
//!
//! Channel numbers map onto five disjoint sub-bands, each an arithmetic
//! progression with 25 kHz spacing:
//!
//! | Channels   | First frequency | Notes                         |
//! |------------|-----------------|-------------------------------|
//! | 0–719      | 851.0125 MHz    | x.y125 + 0.025·a              |
//! | 720–759    | 866.0000 MHz    |                               |
//! | 815–831    | 867.0000 MHz    |                               |
//! | 958        | 868.9750 MHz    | single channel                |
//! | 961–1022   | 867.4250 MHz    |                               |
//!
//! Channels 760–814, 832–957, 959–960 and 1023+ have no frequency.
//!
//! Frequencies are handled internally as whole Hz so that channel lookups
//! never depend on floating-point boundary behaviour.

/// Channel spacing in Hz.
pub const CHANNEL_SPACING_HZ: i64 = 25_000;

/// One contiguous run of channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubBand {
    pub first: u16,
    pub last: u16,
    pub base_hz: i64,
}

impl SubBand {
    pub fn contains(&self, channel: u16) -> bool {
        self.first <= channel && channel <= self.last
    }

    /// Frequency of `channel` in Hz, if it belongs to this sub-band.
    pub fn frequency_hz(&self, channel: u16) -> Option<i64> {
        if !self.contains(channel) {
            return None;
        }
        Some(self.base_hz + (channel - self.first) as i64 * CHANNEL_SPACING_HZ)
    }
}

/// Sub-bands in channel order.
pub const SUB_BANDS: [SubBand; 5] = [
    SubBand { first: 0, last: 719, base_hz: 851_012_500 },
    SubBand { first: 720, last: 759, base_hz: 866_000_000 },
    SubBand { first: 815, last: 831, base_hz: 867_000_000 },
    SubBand { first: 958, last: 958, base_hz: 868_975_000 },
    SubBand { first: 961, last: 1022, base_hz: 867_425_000 },
];

// ---------------------------------------------------------------------------
// Channel → frequency
// ---------------------------------------------------------------------------

/// Frequency of a channel in Hz. `None` inside the reserved gaps.
pub fn frequency_hz(channel: u16) -> Option<i64> {
    SUB_BANDS.iter().find_map(|band| band.frequency_hz(channel))
}

/// Frequency of a channel in MHz. `None` inside the reserved gaps.
pub fn frequency_mhz(channel: u16) -> Option<f64> {
    frequency_hz(channel).map(|hz| hz as f64 / 1e6)
}

// ---------------------------------------------------------------------------
// Frequency → channel
// ---------------------------------------------------------------------------

/// Channel number for a frequency given in MHz, or in Hz when above 1e6.
///
/// The frequency is rounded to the nearest Hz (six decimal places of MHz)
/// before classification. A fourth fractional MHz digit of 5 (x.y125,
/// x.y375, ...) can only belong to the first sub-band; every other pattern is
/// classified by range.
pub fn channel_for(freq: f64) -> Option<u16> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }
    let hz = if freq > 1e6 {
        freq.round() as i64
    } else {
        (freq * 1e6).round() as i64
    };
    channel_for_hz(hz)
}

/// Channel number for a frequency in whole Hz.
pub fn channel_for_hz(hz: i64) -> Option<u16> {
    let fourth_digit = (hz % 1_000_000) / 100 % 10;
    // Nearest grid step; off-grid input may round past the end of a band
    let step = |band: &SubBand| {
        let n = ((hz - band.base_hz) as f64 / CHANNEL_SPACING_HZ as f64).round() as i64;
        let channel = i64::from(band.first) + n;
        (channel <= i64::from(band.last)).then_some(channel as u16)
    };

    if fourth_digit == 5 {
        if (851_012_500..869_012_500).contains(&hz) {
            return step(&SUB_BANDS[0]);
        }
        return None;
    }

    if (866_000_000..867_000_000).contains(&hz) {
        return step(&SUB_BANDS[1]);
    }
    if (867_000_000..867_425_000).contains(&hz) {
        return step(&SUB_BANDS[2]);
    }
    if (867_425_000..868_975_000).contains(&hz) {
        return step(&SUB_BANDS[4]);
    }
    if hz == SUB_BANDS[3].base_hz {
        return Some(SUB_BANDS[3].first);
    }
    None
}

// ---------------------------------------------------------------------------
// Command classification
// ---------------------------------------------------------------------------

/// True if an OSW command value names a voice channel.
///
/// Commands and channel numbers share the 10-bit command field; this
/// predicate is what separates grants from other commands.
pub fn is_valid_channel(c: u16) -> bool {
    c <= 0x2f7 || (0x32f..=0x33f).contains(&c) || (0x3c1..=0x3fe).contains(&c) || c == 0x3be
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
