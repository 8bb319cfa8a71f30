//! Typed events produced by the control channel decoder.
//!
//! The decoder never writes anywhere itself. Each input returns the events it
//! caused; the caller renders them (see `eventlog`) and forwards channel
//! assignments to whatever starts recordings.

use serde::Serialize;

use crate::session::ChannelAssignment;
use crate::types::{Osw, BAND_LIST, TONE_NAMES};

/// A voice channel grant that opened a new call session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallGrant {
    /// Talker, present for two-word grants
    pub source: Option<u16>,
    /// Talkgroup or individual address
    pub target: u16,
    pub group: bool,
    pub channel: u16,
    pub assignment: ChannelAssignment,
}

/// Acknowledgement flavours carried in extended-function words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AckKind {
    Status,
    Message,
    Unknown,
}

/// Site equipment diagnostics broadcast with the CW ID opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Diagnostic {
    /// CW identification on the given channel
    CwId { channel: u16 },
    Enabled { equipment: u16 },
    Disabled { equipment: u16 },
    Malfunction { equipment: u16 },
    Unknown { code: u16 },
}

/// Neighbor site description from the second word of a neighbor sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NeighborInfo {
    pub band: u8,
    pub voc: bool,
    pub astro: bool,
    pub analog: bool,
    pub encryption: bool,
    pub active: bool,
}

impl NeighborInfo {
    pub fn from_id(id: u16) -> Self {
        NeighborInfo {
            band: ((id >> 7) & 7) as u8,
            voc: (id >> 5) & 1 == 1,
            astro: (id >> 3) & 1 == 1,
            analog: (id >> 2) & 1 == 1,
            encryption: (id >> 1) & 1 == 1,
            active: id & 1 == 0,
        }
    }

    pub fn band_name(&self) -> &'static str {
        BAND_LIST[(self.band & 7) as usize]
    }
}

/// Everything the decoder reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ZoneEvent {
    /// A word failed its CRC; `error_rate` is the running fraction rejected.
    CrcError { error_rate: f64 },
    SiteId { site: u16, id: u16 },
    SystemId { system: u16, channel: u16 },
    /// Site status tone changed.
    SystemStatus { tone: u8 },
    ScanMarker { id: u16 },
    Diagnostic(Diagnostic),
    Call(CallGrant),
    /// Radio moved to a new talkgroup.
    Affiliation { radio: u16, group: u16, changes: u32 },
    Deaffiliation { radio: u16, group: u16 },
    CallAlert { source: u16, target: u16, group: bool },
    SystemClock {
        month: u8,
        day: u8,
        year: u8,
        hour: u8,
        minute: u8,
    },
    EmergencyAnnouncement { source: u16, target: u16 },
    Patch { first: Osw, second: Osw },
    Ack { kind: AckKind, target: u16, status: u8 },
    /// First sighting of a neighbor control channel. `known` lists every
    /// neighbor channel seen so far, in order of discovery.
    Neighbor {
        source: u16,
        site: u16,
        channel: u16,
        info: NeighborInfo,
        known: Vec<u16>,
    },
    /// Words no handler claimed, with an optional hint of what they were.
    Unknown {
        label: Option<&'static str>,
        words: Vec<Osw>,
    },
}

impl ZoneEvent {
    /// Short name, stable across releases, for counters and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            ZoneEvent::CrcError { .. } => "crc_error",
            ZoneEvent::SiteId { .. } => "site_id",
            ZoneEvent::SystemId { .. } => "system_id",
            ZoneEvent::SystemStatus { .. } => "system_status",
            ZoneEvent::ScanMarker { .. } => "scan_marker",
            ZoneEvent::Diagnostic(_) => "diagnostic",
            ZoneEvent::Call(_) => "call",
            ZoneEvent::Affiliation { .. } => "affiliation",
            ZoneEvent::Deaffiliation { .. } => "deaffiliation",
            ZoneEvent::CallAlert { .. } => "call_alert",
            ZoneEvent::SystemClock { .. } => "system_clock",
            ZoneEvent::EmergencyAnnouncement { .. } => "emergency_announcement",
            ZoneEvent::Patch { .. } => "patch",
            ZoneEvent::Ack { .. } => "ack",
            ZoneEvent::Neighbor { .. } => "neighbor",
            ZoneEvent::Unknown { .. } => "unknown",
        }
    }

    /// The channel assignment to hand to the recording scheduler, if any.
    pub fn assignment(&self) -> Option<&ChannelAssignment> {
        match self {
            ZoneEvent::Call(grant) => Some(&grant.assignment),
            _ => None,
        }
    }
}

/// Tone name for a status tone index.
pub fn tone_name(tone: u8) -> &'static str {
    TONE_NAMES[(tone & 7) as usize]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbor_info_bits() {
        // band 3, VOC, astro, active
        let id = (3 << 7) | (1 << 5) | (1 << 3);
        let info = NeighborInfo::from_id(id);
        assert_eq!(info.band, 3);
        assert_eq!(info.band_name(), "821");
        assert!(info.voc);
        assert!(info.astro);
        assert!(!info.analog);
        assert!(!info.encryption);
        assert!(info.active);
    }

    #[test]
    fn test_tone_name() {
        assert_eq!(tone_name(0), "105.88");
        assert_eq!(tone_name(7), "138.46");
    }

    #[test]
    fn test_assignment_only_for_calls() {
        let ev = ZoneEvent::ScanMarker { id: 1 };
        assert!(ev.assignment().is_none());
        assert_eq!(ev.kind(), "scan_marker");
    }
}
