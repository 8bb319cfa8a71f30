//! Decode raw 76-bit control words into OSWs.
//!
//! Responsibilities:
//! - Undo the 4-way interleave (four 19-bit runs)
//! - Correct single-bit errors with the differential parity code
//! - Extract the id / group / command / checksum fields
//! - Reject words that fail the 10-bit CRC, keeping running error counts
//!
//! Bits are carried as received polarity (one per byte). The logical value of
//! a bit is its polarity inverted; the inversion happens in field extraction.

use tracing::debug;

use crate::crc;
use crate::types::{Osw, Result, SmartZoneError};

/// Raw bits per control word.
pub const CONTROL_WORD_BITS: usize = 76;

/// Data bits per control word after parity removal.
pub const DATA_BITS: usize = CONTROL_WORD_BITS / 2;

const INTERLEAVE_DEPTH: usize = 4;
const INTERLEAVE_SPAN: usize = CONTROL_WORD_BITS / INTERLEAVE_DEPTH; // 19

const ID_XOR: u16 = 0x33c7;
const CMD_XOR: u16 = 0x032a;

// Field layout inside the 38 data bits
const ID_BITS: std::ops::Range<usize> = 0..16;
const GROUP_BIT: usize = 16;
const CMD_BITS: std::ops::Range<usize> = 17..27;
const CRC_BITS: std::ops::Range<usize> = 27..37;

// ---------------------------------------------------------------------------
// ControlWord
// ---------------------------------------------------------------------------

/// One raw control word as captured after frame sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlWord(pub [u8; CONTROL_WORD_BITS]);

impl ControlWord {
    /// Build a word from a bit slice of exactly 76 entries.
    pub fn from_bits(bits: &[u8]) -> Result<Self> {
        let arr: [u8; CONTROL_WORD_BITS] =
            bits.try_into()
                .map_err(|_| SmartZoneError::InvalidLength {
                    expected: CONTROL_WORD_BITS,
                    actual: bits.len(),
                })?;
        Ok(ControlWord(arr.map(|b| b & 1)))
    }

    pub fn bits(&self) -> &[u8; CONTROL_WORD_BITS] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Interleave
// ---------------------------------------------------------------------------

/// Reorder a received word into sequential (data, parity) pairs.
///
/// `out[k * 4 + l] = word[k + 19 * l]`
pub fn deinterleave(word: &[u8; CONTROL_WORD_BITS]) -> [u8; CONTROL_WORD_BITS] {
    let mut out = [0u8; CONTROL_WORD_BITS];
    for k in 0..INTERLEAVE_SPAN {
        for l in 0..INTERLEAVE_DEPTH {
            out[k * INTERLEAVE_DEPTH + l] = word[k + l * INTERLEAVE_SPAN];
        }
    }
    out
}

/// Inverse of [`deinterleave`].
pub fn interleave(seq: &[u8; CONTROL_WORD_BITS]) -> [u8; CONTROL_WORD_BITS] {
    let mut out = [0u8; CONTROL_WORD_BITS];
    for k in 0..INTERLEAVE_SPAN {
        for l in 0..INTERLEAVE_DEPTH {
            out[k + l * INTERLEAVE_SPAN] = seq[k * INTERLEAVE_DEPTH + l];
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Differential parity
// ---------------------------------------------------------------------------

/// Split (data, parity) pairs and correct isolated data-bit errors.
///
/// Each parity bit is `data[i] ^ data[i - 1]`. A flipped data bit breaks
/// the parity of its own pair and of the next one, so two adjacent syndrome
/// bits locate it. A flipped parity bit raises a single syndrome and is
/// left alone.
pub fn parity_decode(seq: &[u8; CONTROL_WORD_BITS]) -> [u8; DATA_BITS] {
    let mut data = [0u8; DATA_BITS];
    let mut syndrome = [0u8; DATA_BITS];
    let mut prev = 0u8;
    for i in 0..DATA_BITS {
        data[i] = seq[2 * i];
        syndrome[i] = data[i] ^ prev ^ seq[2 * i + 1];
        prev = data[i];
    }
    for i in 0..DATA_BITS - 1 {
        if syndrome[i] & syndrome[i + 1] != 0 {
            data[i] ^= 1;
        }
    }
    data
}

/// Interleave-ready (data, parity) pairs for 38 data bits.
pub fn parity_encode(data: &[u8; DATA_BITS]) -> [u8; CONTROL_WORD_BITS] {
    let mut seq = [0u8; CONTROL_WORD_BITS];
    let mut prev = 0u8;
    for (i, &d) in data.iter().enumerate() {
        seq[2 * i] = d;
        seq[2 * i + 1] = d ^ prev;
        prev = d;
    }
    seq
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

/// MSB-first value of the logical (inverted) bits.
fn bits_to_uint(bits: &[u8]) -> u16 {
    bits.iter().fold(0u16, |r, &b| (r << 1) | ((b ^ 1) & 1) as u16)
}

/// Write `value` MSB-first as polarity bits (inverse of `bits_to_uint`).
fn uint_to_bits(value: u16, out: &mut [u8]) {
    let n = out.len();
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = (((value >> (n - 1 - i)) & 1) ^ 1) as u8;
    }
}

/// Pull the OSW fields out of corrected data bits. No CRC check.
pub fn extract_fields(data: &[u8; DATA_BITS]) -> Osw {
    Osw {
        id: bits_to_uint(&data[ID_BITS]) ^ ID_XOR,
        group: data[GROUP_BIT] & 1 == 0,
        cmd: bits_to_uint(&data[CMD_BITS]) ^ CMD_XOR,
        crc: bits_to_uint(&data[CRC_BITS]),
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Build the control word that carries `osw`, with a valid checksum.
///
/// The `crc` field of the input is ignored. The spare bit is sent as 0.
pub fn encode_osw(osw: &Osw) -> ControlWord {
    let mut data = [0u8; DATA_BITS];
    uint_to_bits(osw.id ^ ID_XOR, &mut data[ID_BITS]);
    data[GROUP_BIT] = if osw.group { 0 } else { 1 };
    uint_to_bits((osw.cmd & 0x3ff) ^ CMD_XOR, &mut data[CMD_BITS]);
    let checksum = crc::crc10(&data);
    uint_to_bits(checksum, &mut data[CRC_BITS]);
    ControlWord(interleave(&parity_encode(&data)))
}

// ---------------------------------------------------------------------------
// WordDecoder
// ---------------------------------------------------------------------------

/// Decodes control words and keeps the valid/error tallies for one channel.
#[derive(Debug, Default)]
pub struct WordDecoder {
    valid: u64,
    errors: u64,
}

impl WordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one word. CRC failures are counted and returned as errors.
    pub fn decode(&mut self, word: &ControlWord) -> Result<Osw> {
        let data = parity_decode(&deinterleave(&word.0));
        let osw = extract_fields(&data);
        let computed = crc::crc10(&data);

        if computed != osw.crc {
            self.errors += 1;
            debug!(
                computed = computed,
                received = osw.crc,
                "bad crc ({:.1}% errors)",
                100.0 * self.error_rate()
            );
            return Err(SmartZoneError::CrcMismatch {
                computed,
                received: osw.crc,
            });
        }

        self.valid += 1;
        Ok(osw)
    }

    /// Fraction of words rejected so far. Zero before any word is seen.
    pub fn error_rate(&self) -> f64 {
        let total = self.valid + self.errors;
        if total == 0 {
            return 0.0;
        }
        self.errors as f64 / total as f64
    }

    pub fn valid(&self) -> u64 {
        self.valid
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
