//! Shared types, error enum, and command constants for smartzone-core.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by smartzone-core.
#[derive(Debug, Error)]
pub enum SmartZoneError {
    #[error("CRC mismatch: computed {computed:#05x}, received {received:#05x}")]
    CrcMismatch { computed: u16, received: u16 },
    #[error("invalid word length: expected {expected} bits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("group table error: {0}")]
    GroupTable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SmartZoneError>;

// ---------------------------------------------------------------------------
// Stream symbols
// ---------------------------------------------------------------------------

/// One demodulated symbol: the sliced polarity bit plus the frame-sync flag
/// raised by the access-code correlator on the first bit of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Symbol {
    pub bit: u8,
    pub sync: bool,
}

impl Symbol {
    pub fn new(bit: u8, sync: bool) -> Self {
        Symbol { bit: bit & 1, sync }
    }

    /// Byte form used by correlator output streams: bit 0 polarity, bit 1 sync.
    pub fn to_byte(self) -> u8 {
        self.bit | if self.sync { 2 } else { 0 }
    }
}

impl From<u8> for Symbol {
    fn from(b: u8) -> Self {
        Symbol {
            bit: b & 1,
            sync: b & 2 == 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound Signaling Word
// ---------------------------------------------------------------------------

/// A CRC-validated Outbound Signaling Word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Osw {
    /// Address field (radio, talkgroup or command argument)
    pub id: u16,
    /// Group flag
    pub group: bool,
    /// 10-bit command; doubles as a channel number for grants
    pub cmd: u16,
    /// 10-bit checksum as transmitted
    pub crc: u16,
}

impl Osw {
    pub fn new(id: u16, group: bool, cmd: u16) -> Self {
        Osw {
            id,
            group,
            cmd: cmd & 0x3ff,
            crc: 0,
        }
    }
}

impl std::fmt::Display for Osw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:04x}, {}, {:04x})",
            self.id, self.group as u8, self.cmd
        )
    }
}

// ---------------------------------------------------------------------------
// Command opcodes
// ---------------------------------------------------------------------------

/// Known OSW command values.
pub mod cmd {
    pub const BACKGROUND_IDLE: u16 = 0x02f8;
    pub const FIRST_CODED_PC: u16 = 0x0304;
    pub const FIRST_NORMAL: u16 = 0x0308;
    pub const EXTENDED_FCN: u16 = 0x030b;
    pub const AFFIL_FCN: u16 = 0x030d;
    pub const TY2_AFFILIATION: u16 = 0x0310;
    pub const TY2_MESSAGE: u16 = 0x0311;
    pub const TY2_CALL_ALERT: u16 = 0x0319;
    pub const NEIGHBOR_LEAD: u16 = 0x0320;
    pub const FIRST_ASTRO: u16 = 0x0321;
    pub const SYSTEM_CLOCK: u16 = 0x0322;
    pub const SCAN_MARKER: u16 = 0x032b;
    pub const EMERG_ANNC: u16 = 0x032e;
    pub const PATCH_MIN: u16 = 0x0340;
    pub const PATCH_MAX: u16 = 0x0350;
    /// Opcodes inside the patch range that are not patches.
    pub const PATCH_EXCLUDED: &[u16] = &[0x034b, 0x034d, 0x034f];
    pub const AMSS_ID_MIN: u16 = 0x0360;
    pub const AMSS_ID_MAX: u16 = 0x039f;
    pub const CW_ID: u16 = 0x03a0;
    pub const SYS_NETSTAT: u16 = 0x03bf;
    pub const SYS_STATUS: u16 = 0x03c0;
}

// ---------------------------------------------------------------------------
// Display tables
// ---------------------------------------------------------------------------

/// Talkgroup type by the low nibble of a group address. Type 0 is a normal
/// talkgroup and renders as nothing.
pub const GROUP_TYPES: [&str; 16] = [
    "",
    "All Talkgroup",
    "Emergency",
    "Talkgroup Patch to Another",
    "Emergency Patch",
    "Emergency Multi-group",
    "Not Assigned",
    "Multi-select (initiated by dispatcher)",
    "DES Encryption Talkgroup",
    "DES All Talkgroup",
    "DES Emergency",
    "DES Talkgroup Patch",
    "DES Emergency Patch",
    "DES Emergency Multi-group",
    "Not Assigned",
    "DES Multi-select",
];

/// Site status tone frequencies, indexed by the 3-bit tone field.
pub const TONE_NAMES: [&str; 8] = [
    "105.88", "76.76", "83.72", "90", "97.3", "116.3", "128.57", "138.46",
];

/// Neighbor band codes.
pub const BAND_LIST: [&str; 8] = [
    "800",
    "Unknown (1)",
    "800 (2)",
    "821",
    "900",
    "Unknown (5)",
    "Unknown (6)",
    "Unknown (7)",
];

/// Equipment class for a diagnostic equipment number.
pub fn equipment_name(n: u16) -> &'static str {
    match n {
        0x30..=0x4b => "RIB",
        0x60..=0x7b => "TIB",
        _ => "other equipment",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_from_byte() {
        assert_eq!(Symbol::from(0), Symbol::new(0, false));
        assert_eq!(Symbol::from(1), Symbol::new(1, false));
        assert_eq!(Symbol::from(2), Symbol::new(0, true));
        assert_eq!(Symbol::from(3), Symbol::new(1, true));
        assert_eq!(Symbol::from(3).to_byte(), 3);
    }

    #[test]
    fn test_osw_display() {
        let osw = Osw::new(0x1234, true, cmd::FIRST_NORMAL);
        assert_eq!(osw.to_string(), "(1234, 1, 0308)");
    }

    #[test]
    fn test_osw_cmd_masked() {
        assert_eq!(Osw::new(0, false, 0xffff).cmd, 0x3ff);
    }

    #[test]
    fn test_equipment_name() {
        assert_eq!(equipment_name(0x30), "RIB");
        assert_eq!(equipment_name(0x7b), "TIB");
        assert_eq!(equipment_name(0x50), "other equipment");
    }
}
