//! OSW sequencing: group decoded words into messages and interpret them.
//!
//! Most control channel messages are a single OSW, but several span two or
//! three consecutive words introduced by a lead opcode (`FIRST_NORMAL`,
//! `FIRST_ASTRO`, `FIRST_CODED_PC`). Words of an incomplete sequence are
//! parked in a small queue and picked up again when the next word arrives.
//!
//! Dispatch is driven by ordered tables of (match rule, kind) pairs; the first
//! matching rule wins. Idle and site-id words are handled before queueing and
//! never disturb a parked sequence.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::bandplan::is_valid_channel;
use crate::events::{AckKind, CallGrant, Diagnostic, NeighborInfo, ZoneEvent};
use crate::session::{CallSessionTracker, SESSION_WINDOW};
use crate::types::{cmd, Osw};

/// Most words a sequence can hold (lead + two continuations).
pub const MAX_PENDING: usize = 3;

/// Single-word grant address that is broadcast but never a real call.
const IGNORED_GRANT_ID: u16 = 0x1ff2;

// ---------------------------------------------------------------------------
// Match rules
// ---------------------------------------------------------------------------

/// A test on a 16-bit field (command or address).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMatch {
    Exact(u16),
    /// Inclusive range
    Range(u16, u16),
    /// Inclusive range minus a few listed values
    RangeExcept(u16, u16, &'static [u16]),
    Masked { mask: u16, value: u16 },
    /// Any command that is a voice channel number
    VoiceChannel,
}

impl OpMatch {
    pub fn matches(&self, v: u16) -> bool {
        match *self {
            OpMatch::Exact(x) => v == x,
            OpMatch::Range(lo, hi) => lo <= v && v <= hi,
            OpMatch::RangeExcept(lo, hi, except) => lo <= v && v <= hi && !except.contains(&v),
            OpMatch::Masked { mask, value } => v & mask == value,
            OpMatch::VoiceChannel => is_valid_channel(v),
        }
    }
}

/// First matching kind for `v` in `table`.
pub fn classify<K: Copy>(table: &[(OpMatch, K)], v: u16) -> Option<K> {
    table.iter().find(|(rule, _)| rule.matches(v)).map(|&(_, k)| k)
}

/// Meaning of a word's command when it arrives or leads a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadKind {
    Idle,
    SiteId,
    Grant,
    NetStatus,
    SysStatus,
    ScanMarker,
    CwId,
    Normal,
    Astro,
    CodedPc,
}

pub const LEAD_TABLE: &[(OpMatch, LeadKind)] = &[
    (OpMatch::Exact(cmd::BACKGROUND_IDLE), LeadKind::Idle),
    (OpMatch::Range(cmd::AMSS_ID_MIN, cmd::AMSS_ID_MAX), LeadKind::SiteId),
    (OpMatch::VoiceChannel, LeadKind::Grant),
    (OpMatch::Exact(cmd::SYS_NETSTAT), LeadKind::NetStatus),
    (OpMatch::Exact(cmd::SYS_STATUS), LeadKind::SysStatus),
    (OpMatch::Exact(cmd::SCAN_MARKER), LeadKind::ScanMarker),
    (OpMatch::Exact(cmd::CW_ID), LeadKind::CwId),
    (OpMatch::Exact(cmd::FIRST_NORMAL), LeadKind::Normal),
    (OpMatch::Exact(cmd::FIRST_ASTRO), LeadKind::Astro),
    (OpMatch::Exact(cmd::FIRST_CODED_PC), LeadKind::CodedPc),
];

/// Meaning of the second word's command after `FIRST_NORMAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondKind {
    Grant,
    Affiliation,
    Message,
    CallAlert,
    SystemClock,
    EmergencyAnnouncement,
    AffiliationFunction,
    Patch,
    Extended,
    Neighbor,
}

pub const SECOND_TABLE: &[(OpMatch, SecondKind)] = &[
    (OpMatch::VoiceChannel, SecondKind::Grant),
    (OpMatch::Exact(cmd::TY2_AFFILIATION), SecondKind::Affiliation),
    (OpMatch::Exact(cmd::TY2_MESSAGE), SecondKind::Message),
    (OpMatch::Exact(cmd::TY2_CALL_ALERT), SecondKind::CallAlert),
    (OpMatch::Exact(cmd::SYSTEM_CLOCK), SecondKind::SystemClock),
    (OpMatch::Exact(cmd::EMERG_ANNC), SecondKind::EmergencyAnnouncement),
    (OpMatch::Exact(cmd::AFFIL_FCN), SecondKind::AffiliationFunction),
    (
        OpMatch::RangeExcept(cmd::PATCH_MIN, cmd::PATCH_MAX, cmd::PATCH_EXCLUDED),
        SecondKind::Patch,
    ),
    (OpMatch::Exact(cmd::EXTENDED_FCN), SecondKind::Extended),
    (OpMatch::Exact(cmd::NEIGHBOR_LEAD), SecondKind::Neighbor),
];

/// Extended-function sub-commands, matched on the second word's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKind {
    Deaffiliation,
    AckStatus,
    AckMessage,
    UnknownAck,
    SystemId,
    PeerId,
    Msc,
}

pub const EXTENDED_TABLE: &[(OpMatch, ExtendedKind)] = &[
    (OpMatch::Masked { mask: 0xfff0, value: 0x2610 }, ExtendedKind::Deaffiliation),
    (OpMatch::Masked { mask: 0xfff0, value: 0x26e0 }, ExtendedKind::AckStatus),
    (OpMatch::Masked { mask: 0xfff0, value: 0x26f0 }, ExtendedKind::AckMessage),
    (OpMatch::Masked { mask: 0xff00, value: 0x2c00 }, ExtendedKind::UnknownAck),
    (OpMatch::Masked { mask: 0xfc00, value: 0x2800 }, ExtendedKind::SystemId),
    (OpMatch::Masked { mask: 0xfc00, value: 0x6000 }, ExtendedKind::PeerId),
    (OpMatch::Exact(0x2021), ExtendedKind::Msc),
];

// ---------------------------------------------------------------------------
// Pending words
// ---------------------------------------------------------------------------

/// Words waiting for the rest of their sequence, oldest first.
#[derive(Debug, Default)]
pub struct PendingWords {
    words: VecDeque<Osw>,
}

impl PendingWords {
    pub fn new() -> Self {
        PendingWords {
            words: VecDeque::with_capacity(MAX_PENDING),
        }
    }

    /// Queue a newly received word behind anything already parked.
    pub fn stash_next(&mut self, osw: Osw) {
        if self.words.len() >= MAX_PENDING {
            if let Some(dropped) = self.words.pop_front() {
                warn!(%dropped, "pending queue full, dropping oldest word");
            }
        }
        self.words.push_back(osw);
    }

    /// Oldest queued word.
    pub fn take_pending(&mut self) -> Option<Osw> {
        self.words.pop_front()
    }

    /// Put a taken word back at the head so it is taken first next time.
    pub fn restore(&mut self, osw: Osw) {
        self.words.push_front(osw);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

/// Current talkgroup of an affiliated radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affiliation {
    pub group: u16,
    /// Number of distinct group assignments seen
    pub changes: u32,
}

/// Stateful OSW interpreter for one control channel.
#[derive(Debug)]
pub struct OswSequencer {
    pending: PendingWords,
    sessions: CallSessionTracker,
    site_id: Option<u16>,
    system_id: Option<u16>,
    system_channel: Option<u16>,
    tone: Option<u8>,
    neighbors: Vec<u16>,
    affiliations: HashMap<u16, Affiliation>,
}

impl OswSequencer {
    pub fn new(session_window: f64) -> Self {
        OswSequencer {
            pending: PendingWords::new(),
            sessions: CallSessionTracker::new(session_window),
            site_id: None,
            system_id: None,
            system_channel: None,
            tone: None,
            neighbors: Vec::new(),
            affiliations: HashMap::new(),
        }
    }

    /// Process one valid OSW received at `now` (seconds).
    ///
    /// Returns the event it completed, if any. A word that starts a sequence
    /// returns `None` and stays parked until its continuation arrives.
    pub fn process(&mut self, osw: Osw, now: f64) -> Option<ZoneEvent> {
        match classify(LEAD_TABLE, osw.cmd) {
            Some(LeadKind::Idle) => return None,
            Some(LeadKind::SiteId) => return self.site_id_word(osw),
            _ => {}
        }

        self.pending.stash_next(osw);
        let lead = self.pending.take_pending()?;

        match classify(LEAD_TABLE, lead.cmd) {
            Some(LeadKind::Grant) => self.single_grant(lead, now),
            Some(LeadKind::NetStatus) => None,
            Some(LeadKind::SysStatus) => self.system_status(lead),
            Some(LeadKind::ScanMarker) => Some(ZoneEvent::ScanMarker { id: lead.id }),
            Some(LeadKind::CwId) => Some(ZoneEvent::Diagnostic(diagnostic(lead.id))),
            Some(LeadKind::Normal) => {
                let second = self.continuation(lead)?;
                self.normal_pair(lead, second, now)
            }
            Some(LeadKind::Astro) => {
                let second = self.continuation(lead)?;
                Some(unknown("astro", vec![lead, second]))
            }
            Some(LeadKind::CodedPc) => {
                let second = self.continuation(lead)?;
                Some(unknown("coded pc", vec![lead, second]))
            }
            // Idle and site-id words are never queued
            Some(LeadKind::Idle) | Some(LeadKind::SiteId) => None,
            None => Some(ZoneEvent::Unknown {
                label: None,
                words: vec![lead],
            }),
        }
    }

    /// Next queued word, or park `lead` and wait.
    fn continuation(&mut self, lead: Osw) -> Option<Osw> {
        let next = self.pending.take_pending();
        if next.is_none() {
            self.pending.restore(lead);
        }
        next
    }

    fn normal_pair(&mut self, first: Osw, second: Osw, now: f64) -> Option<ZoneEvent> {
        let Some(kind) = classify(SECOND_TABLE, second.cmd) else {
            return Some(unknown("2-seq", vec![first, second]));
        };

        match kind {
            SecondKind::Grant => self.pair_grant(first, second, now),
            SecondKind::Affiliation => self.affiliate(first, second),
            SecondKind::Message => {
                // No decoding is known for this pair; report it raw.
                debug!(%first, %second, "type II message not decoded");
                Some(unknown("ty2 message", vec![first, second]))
            }
            SecondKind::CallAlert => Some(ZoneEvent::CallAlert {
                source: first.id,
                target: second.id,
                group: second.group,
            }),
            SecondKind::SystemClock => Some(system_clock(first.id, second.id)),
            SecondKind::EmergencyAnnouncement => Some(ZoneEvent::EmergencyAnnouncement {
                source: first.id,
                target: second.id,
            }),
            SecondKind::AffiliationFunction => Some(unknown("affil fcn", vec![first, second])),
            SecondKind::Patch => Some(ZoneEvent::Patch { first, second }),
            SecondKind::Extended => self.extended(first, second),
            SecondKind::Neighbor => {
                let Some(third) = self.pending.take_pending() else {
                    self.pending.restore(second);
                    self.pending.restore(first);
                    return None;
                };
                if third.cmd == cmd::EXTENDED_FCN {
                    self.neighbor(first, second, third)
                } else {
                    Some(unknown("3-seq", vec![first, second, third]))
                }
            }
        }
    }

    fn extended(&mut self, first: Osw, second: Osw) -> Option<ZoneEvent> {
        let Some(kind) = classify(EXTENDED_TABLE, second.id) else {
            return Some(unknown("ext fcn", vec![first, second]));
        };

        let status = (second.id & 0xf) as u8;
        match kind {
            ExtendedKind::Deaffiliation => self.deaffiliate(first.id),
            ExtendedKind::AckStatus => Some(ZoneEvent::Ack {
                kind: AckKind::Status,
                target: first.id,
                status,
            }),
            ExtendedKind::AckMessage => Some(ZoneEvent::Ack {
                kind: AckKind::Message,
                target: first.id,
                status,
            }),
            ExtendedKind::UnknownAck => Some(ZoneEvent::Ack {
                kind: AckKind::Unknown,
                target: first.id,
                status,
            }),
            ExtendedKind::SystemId => self.system_identity(first.id, second.id & 0x3ff),
            ExtendedKind::PeerId => Some(unknown("peer id", vec![first, second])),
            ExtendedKind::Msc => Some(unknown("msc", vec![first, second])),
        }
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    fn site_id_word(&mut self, osw: Osw) -> Option<ZoneEvent> {
        let site = osw.cmd - cmd::AMSS_ID_MIN;
        if self.site_id == Some(site) {
            return None;
        }
        self.site_id = Some(site);
        Some(ZoneEvent::SiteId { site, id: osw.id })
    }

    fn system_identity(&mut self, system: u16, channel: u16) -> Option<ZoneEvent> {
        if self.system_id == Some(system) && self.system_channel == Some(channel) {
            return None;
        }
        self.system_id = Some(system);
        self.system_channel = Some(channel);
        self.sessions.set_system(system, channel);
        Some(ZoneEvent::SystemId { system, channel })
    }

    fn system_status(&mut self, osw: Osw) -> Option<ZoneEvent> {
        if (osw.id >> 13) & 7 != 1 {
            return None;
        }
        let tone = ((osw.id >> 5) & 7) as u8;
        if self.tone == Some(tone) {
            return None;
        }
        self.tone = Some(tone);
        Some(ZoneEvent::SystemStatus { tone })
    }

    fn single_grant(&mut self, osw: Osw, now: f64) -> Option<ZoneEvent> {
        if osw.id == IGNORED_GRANT_ID {
            return None;
        }
        let assignment = self.sessions.start_call(osw.id, osw.cmd, None, now)?;
        Some(ZoneEvent::Call(CallGrant {
            source: None,
            target: osw.id,
            group: osw.group,
            channel: osw.cmd,
            assignment,
        }))
    }

    fn pair_grant(&mut self, first: Osw, second: Osw, now: f64) -> Option<ZoneEvent> {
        let assignment = self
            .sessions
            .start_call(second.id, second.cmd, Some(first.id), now)?;
        Some(ZoneEvent::Call(CallGrant {
            source: Some(first.id),
            target: second.id,
            group: second.group,
            channel: second.cmd,
            assignment,
        }))
    }

    fn affiliate(&mut self, first: Osw, second: Osw) -> Option<ZoneEvent> {
        let radio = first.id;
        let group = second.id & 0xfff0;
        let entry = self.affiliations.entry(radio).or_insert(Affiliation {
            group,
            changes: 0,
        });
        if entry.changes > 0 && entry.group == group {
            return None;
        }
        entry.group = group;
        entry.changes += 1;
        Some(ZoneEvent::Affiliation {
            radio,
            group,
            changes: entry.changes,
        })
    }

    fn deaffiliate(&mut self, radio: u16) -> Option<ZoneEvent> {
        self.affiliations
            .remove(&radio)
            .map(|a| ZoneEvent::Deaffiliation {
                radio,
                group: a.group,
            })
    }

    fn neighbor(&mut self, first: Osw, second: Osw, third: Osw) -> Option<ZoneEvent> {
        let channel = third.id & 0x3ff;
        if self.neighbors.contains(&channel) {
            return None;
        }
        self.neighbors.push(channel);
        Some(ZoneEvent::Neighbor {
            source: first.id,
            site: (second.id >> 10) & 0x3f,
            channel,
            info: NeighborInfo::from_id(second.id),
            known: self.neighbors.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn site_id(&self) -> Option<u16> {
        self.site_id
    }

    pub fn system_id(&self) -> Option<u16> {
        self.system_id
    }

    pub fn system_channel(&self) -> Option<u16> {
        self.system_channel
    }

    pub fn tone(&self) -> Option<u8> {
        self.tone
    }

    pub fn neighbors(&self) -> &[u16] {
        &self.neighbors
    }

    pub fn affiliation(&self, radio: u16) -> Option<&Affiliation> {
        self.affiliations.get(&radio)
    }

    pub fn affiliation_count(&self) -> usize {
        self.affiliations.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn sessions(&self) -> &CallSessionTracker {
        &self.sessions
    }
}

impl Default for OswSequencer {
    fn default() -> Self {
        OswSequencer::new(SESSION_WINDOW)
    }
}

fn unknown(label: &'static str, words: Vec<Osw>) -> ZoneEvent {
    ZoneEvent::Unknown {
        label: Some(label),
        words,
    }
}

fn diagnostic(id: u16) -> Diagnostic {
    if id & 0xe000 == 0xe000 {
        return Diagnostic::CwId { channel: id & 0x3ff };
    }
    let equipment = id & 0xff;
    match id & 0xf00 {
        0xa00 => Diagnostic::Enabled { equipment },
        0xb00 => Diagnostic::Disabled { equipment },
        0xc00 => Diagnostic::Malfunction { equipment },
        _ => Diagnostic::Unknown { code: id },
    }
}

/// Unpack the two system clock words.
///
/// First word: year (7 bits) | month (4) | day (5).
/// Second word: hour in bits 8–12, minute in the low byte.
fn system_clock(date: u16, time: u16) -> ZoneEvent {
    ZoneEvent::SystemClock {
        month: ((date >> 5) & 0xf) as u8,
        day: (date & 0x1f) as u8,
        year: (date >> 9) as u8,
        hour: ((time >> 8) & 0x1f) as u8,
        minute: (time & 0xff) as u8,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
