//! 10-bit CRC validation for SmartZone OSWs.
//!
//! The checksum covers the first 27 corrected bits of a word (address, group
//! flag, command). A shift register seeded with 0x036e steps once per bit
//! with feedback polynomial 0x0225; the register value is XORed into an
//! accumulator (seeded 0x0393) for every set bit.
//!
//! The register sequence does not depend on the data, so the 27 register
//! states are built at compile time and the checksum reduces to XORs.

/// Number of word bits covered by the checksum.
pub const CRC_COVERED_BITS: usize = 27;

const ACCUMULATOR_SEED: u16 = 0x0393;
const REGISTER_SEED: u16 = 0x036e;
const POLYNOMIAL: u16 = 0x0225;

// ---------------------------------------------------------------------------
// Register table (compile-time)
// ---------------------------------------------------------------------------

const fn build_crc_table() -> [u16; CRC_COVERED_BITS] {
    let mut table = [0u16; CRC_COVERED_BITS];
    let mut reg = REGISTER_SEED;
    let mut i = 0;
    while i < CRC_COVERED_BITS {
        if reg & 1 != 0 {
            reg = (reg >> 1) ^ POLYNOMIAL;
        } else {
            reg >>= 1;
        }
        table[i] = reg;
        i += 1;
    }
    table
}

static CRC_TABLE: [u16; CRC_COVERED_BITS] = build_crc_table();

// ---------------------------------------------------------------------------
// Core CRC functions
// ---------------------------------------------------------------------------

/// Compute the checksum over the covered bits of a word.
///
/// `bits` holds polarity bits (one per byte, 0 or 1) and must contain at
/// least 27 entries; anything beyond is ignored.
pub fn crc10(bits: &[u8]) -> u16 {
    bits.iter()
        .take(CRC_COVERED_BITS)
        .zip(CRC_TABLE.iter())
        .filter(|&(&b, _)| b != 0)
        .fold(ACCUMULATOR_SEED, |acc, (_, &reg)| acc ^ reg)
}

/// True if `received` matches the checksum of `bits`.
pub fn check(bits: &[u8], received: u16) -> bool {
    crc10(bits) == received
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Straight bit-serial form, stepping the register alongside the data.
    fn crc10_serial(bits: &[u8]) -> u16 {
        let mut acc = ACCUMULATOR_SEED;
        let mut reg = REGISTER_SEED;
        for &b in &bits[..CRC_COVERED_BITS] {
            reg = if reg & 1 != 0 {
                (reg >> 1) ^ POLYNOMIAL
            } else {
                reg >> 1
            };
            if b != 0 {
                acc ^= reg;
            }
        }
        acc
    }

    #[test]
    fn test_crc_of_zero_bits_is_seed() {
        assert_eq!(crc10(&[0u8; 27]), ACCUMULATOR_SEED);
    }

    #[test]
    fn test_table_first_entry() {
        // 0x036e is even: first step is a plain shift
        assert_eq!(CRC_TABLE[0], 0x036e >> 1);
    }

    #[test]
    fn test_table_matches_serial() {
        let patterns: [[u8; 27]; 3] = [
            [1; 27],
            core::array::from_fn(|i| (i % 2) as u8),
            core::array::from_fn(|i| ((i * 7 + 3) % 5 == 0) as u8),
        ];
        for p in &patterns {
            assert_eq!(crc10(p), crc10_serial(p));
        }
    }

    #[test]
    fn test_result_is_ten_bits() {
        for i in 0..27 {
            let mut bits = [0u8; 27];
            bits[i] = 1;
            assert!(crc10(&bits) <= 0x3ff);
        }
    }

    #[test]
    fn test_single_bit_changes_crc() {
        let base = crc10(&[0u8; 27]);
        for i in 0..27 {
            let mut bits = [0u8; 27];
            bits[i] = 1;
            assert_ne!(crc10(&bits), base, "bit {i} must affect the checksum");
        }
    }

    #[test]
    fn test_check() {
        let bits = [1u8; 30];
        let crc = crc10(&bits);
        assert!(check(&bits, crc));
        assert!(!check(&bits, crc ^ 1));
    }
}
