//! Fixed-column text rendering of decoder events.
//!
//! Each line has the form
//!
//! ```text
//! CMD   | SOURCE    | TARGET             | FREQ         | TEXT
//! ```
//!
//! with every column padded or truncated to its width (5, 9, 18, 12, 40).
//! Affiliation, deaffiliation and patch events are tracked by the decoder but
//! produce no lines.

use std::collections::HashMap;

use crate::bandplan::frequency_mhz;
use crate::events::{tone_name, AckKind, Diagnostic, ZoneEvent};
use crate::groups::GroupTable;
use crate::types::{equipment_name, GROUP_TYPES};

const CMD_WIDTH: usize = 5;
const SOURCE_WIDTH: usize = 9;
const TARGET_WIDTH: usize = 18;
const FREQ_WIDTH: usize = 12;
const TEXT_WIDTH: usize = 40;

/// Pad `s` with spaces to `n` characters, or cut it to `n`.
pub fn fill_to(n: usize, s: &str) -> String {
    let mut out: String = s.chars().take(n).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(n - len));
    out
}

/// Column values for one line.
#[derive(Debug, Default)]
struct Entry {
    command: &'static str,
    source: Option<u16>,
    show_count: bool,
    target: Option<u16>,
    target_is_group: bool,
    channel: Option<u16>,
    text: Option<String>,
}

impl Entry {
    fn new(command: &'static str) -> Self {
        Entry {
            command,
            ..Default::default()
        }
    }

    fn source(mut self, source: u16) -> Self {
        self.source = Some(source);
        self
    }

    fn counted_source(mut self, source: u16) -> Self {
        self.source = Some(source);
        self.show_count = true;
        self
    }

    fn target(mut self, target: u16, group: bool) -> Self {
        self.target = Some(target);
        self.target_is_group = group;
        self
    }

    fn channel(mut self, channel: u16) -> Self {
        self.channel = Some(channel);
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Renders events into log lines.
///
/// Keeps a per-source line count, shown next to talkers of calls and alerts.
#[derive(Debug, Default)]
pub struct EventLog {
    groups: Option<GroupTable>,
    source_counts: HashMap<u16, u32>,
}

impl EventLog {
    pub fn new(groups: Option<GroupTable>) -> Self {
        EventLog {
            groups,
            source_counts: HashMap::new(),
        }
    }

    /// Lines for one event, in output order. Most events give one line,
    /// unknown sequences give one per word.
    pub fn lines(&mut self, event: &ZoneEvent) -> Vec<String> {
        let entry = match event {
            ZoneEvent::CrcError { error_rate } => {
                return vec![format!("CRC: %{}", (100.0 * error_rate) as i64)];
            }
            ZoneEvent::SiteId { site, id } => {
                Entry::new("SITEID").source(*site).text(format!("id = {id:x}"))
            }
            ZoneEvent::SystemId { system, channel } => {
                Entry::new("SYSID").channel(*channel).source(*system)
            }
            ZoneEvent::SystemStatus { tone } => {
                Entry::new("SYSSTAT").text(format!("tone = {}", tone_name(*tone)))
            }
            ZoneEvent::ScanMarker { id } => Entry::new("SYSID").source(*id).text("Scan Marker"),
            ZoneEvent::Diagnostic(diag) => diagnostic_entry(diag),
            ZoneEvent::Call(grant) => {
                let mut e = Entry::new("CALL")
                    .target(grant.target, grant.group)
                    .channel(grant.channel);
                if let Some(source) = grant.source {
                    e = e.counted_source(source);
                }
                e
            }
            ZoneEvent::Affiliation { .. }
            | ZoneEvent::Deaffiliation { .. }
            | ZoneEvent::Patch { .. } => return Vec::new(),
            ZoneEvent::CallAlert {
                source,
                target,
                group,
            } => Entry::new("ALERT")
                .counted_source(*source)
                .target(*target, *group),
            ZoneEvent::SystemClock {
                month,
                day,
                year,
                hour,
                minute,
            } => Entry::new("SYSCLK").text(format!(
                "{month:02}/{day:02}/{year:02} {hour:02}:{minute:02}"
            )),
            ZoneEvent::EmergencyAnnouncement { source, target } => {
                Entry::new("EANN").source(*source).target(*target, false)
            }
            ZoneEvent::Ack {
                kind,
                target,
                status,
            } => match kind {
                AckKind::Status => Entry::new("ACKS")
                    .target(*target, false)
                    .text(format!("status: {:.6}", f64::from(*status))),
                AckKind::Message => Entry::new("ACKM")
                    .target(*target, false)
                    .text(format!("status: {:.6}", f64::from(*status))),
                AckKind::Unknown => Entry::new("ACK?")
                    .target(*target, false)
                    .text(format!("status: {status:x}")),
            },
            ZoneEvent::Neighbor {
                source,
                site,
                channel,
                known,
                ..
            } => {
                let text: String = known
                    .iter()
                    .filter_map(|&c| frequency_mhz(c))
                    .map(|f| format!("{f:.4} "))
                    .collect();
                Entry::new("NEIGHBOR")
                    .source(*source)
                    .target(*site, false)
                    .channel(*channel)
                    .text(text)
            }
            ZoneEvent::Unknown { label, words } => {
                return words
                    .iter()
                    .map(|w| {
                        let text = match label {
                            Some(l) => format!("{l}: {w}"),
                            None => w.to_string(),
                        };
                        self.render(Entry::new("UNKN").text(text))
                    })
                    .collect();
            }
        };
        vec![self.render(entry)]
    }

    fn render(&mut self, e: Entry) -> String {
        let cmd = fill_to(CMD_WIDTH, e.command);

        let src = match e.source {
            Some(source) => {
                let count = self.source_counts.entry(source).or_insert(0);
                *count += 1;
                if e.show_count {
                    format!("{source:4x} ({count})")
                } else {
                    format!("{source:4x}")
                }
            }
            None => String::new(),
        };
        let src = fill_to(SOURCE_WIDTH, &src);

        let mut txt = String::new();
        let tgt = match e.target {
            Some(target) if e.target_is_group => {
                txt.push_str(GROUP_TYPES[(target & 0xf) as usize]);
                match self.groups.as_ref().and_then(|g| g.alpha_tag(target)) {
                    Some(name) => format!("{target:4x}  {name}"),
                    None => format!("{target:4x}  G"),
                }
            }
            Some(target) => format!("{target:4x}"),
            None => String::new(),
        };
        let tgt = fill_to(TARGET_WIDTH, &tgt);

        let freq = e
            .channel
            .and_then(frequency_mhz)
            .map(|f| format!("{f:.4} MHz"))
            .unwrap_or_default();
        let freq = fill_to(FREQ_WIDTH, &freq);

        if let Some(text) = e.text {
            if !txt.is_empty() {
                txt.push_str("; ");
            }
            txt.push_str(&text);
        }
        let txt = fill_to(TEXT_WIDTH, &txt);

        format!("{cmd} | {src} | {tgt} | {freq} | {txt}")
    }
}

fn diagnostic_entry(diag: &Diagnostic) -> Entry {
    let e = Entry::new("DIAG");
    match *diag {
        Diagnostic::CwId { channel } => e.channel(channel).text("CW ID"),
        Diagnostic::Enabled { equipment } => e.text(format!(
            "{}({equipment:x}) Enabled",
            equipment_name(equipment)
        )),
        Diagnostic::Disabled { equipment } => e.text(format!(
            "{}({equipment:x}) Disabled",
            equipment_name(equipment)
        )),
        Diagnostic::Malfunction { equipment } => e.text(format!(
            "{}({equipment:x}) Malfunction",
            equipment_name(equipment)
        )),
        Diagnostic::Unknown { code } => e.text(format!("code ({code:x}) not known")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CallGrant;
    use crate::session::ChannelAssignment;
    use crate::types::Osw;

    fn columns(line: &str) -> Vec<&str> {
        line.split(" | ").collect()
    }

    fn call(source: Option<u16>, target: u16, group: bool, channel: u16) -> ZoneEvent {
        ZoneEvent::Call(CallGrant {
            source,
            target,
            group,
            channel,
            assignment: ChannelAssignment {
                system_id: 0x2c65,
                channel,
                group_id: target,
                radio_id: source,
            },
        })
    }

    #[test]
    fn test_fill_to() {
        assert_eq!(fill_to(5, "CALL"), "CALL ");
        assert_eq!(fill_to(5, "NEIGHBOR"), "NEIGH");
        assert_eq!(fill_to(3, ""), "   ");
    }

    #[test]
    fn test_column_widths() {
        let mut log = EventLog::default();
        let lines = log.lines(&call(Some(0x4001), 0x1230, true, 693));
        assert_eq!(lines.len(), 1);
        let cols = columns(&lines[0]);
        assert_eq!(cols.len(), 5);
        assert_eq!(cols[0].len(), 5);
        assert_eq!(cols[1].len(), 9);
        assert_eq!(cols[2].len(), 18);
        assert_eq!(cols[3].len(), 12);
        assert_eq!(cols[4].len(), 40);
    }

    #[test]
    fn test_call_line() {
        let mut log = EventLog::default();
        let line = &log.lines(&call(Some(0x4001), 0x1230, true, 693))[0];
        let cols = columns(line);
        assert_eq!(cols[0], "CALL ");
        assert_eq!(cols[1].trim_end(), "4001 (1)");
        assert_eq!(cols[2].trim_end(), "1230  G");
        assert_eq!(cols[3], "868.3375 MHz");
        assert_eq!(cols[4].trim_end(), "");

        // Second call from the same talker bumps its count
        let line = &log.lines(&call(Some(0x4001), 0x1231, true, 693))[0];
        let cols = columns(line);
        assert_eq!(cols[1].trim_end(), "4001 (2)");
        assert_eq!(cols[4].trim_end(), "All Talkgroup");
    }

    #[test]
    fn test_call_uses_group_names() {
        let groups = GroupTable::parse("Dec,Hex,Mode,Tag\n291,123,D,FIRE DISP\n");
        let mut log = EventLog::new(Some(groups));
        let line = &log.lines(&call(None, 0x1230, true, 100))[0];
        let cols = columns(line);
        assert_eq!(cols[1].trim_end(), "");
        assert_eq!(cols[2].trim_end(), "1230  FIRE DISP");
    }

    #[test]
    fn test_individual_target_plain() {
        let mut log = EventLog::default();
        let line = &log.lines(&call(None, 0x4002, false, 100))[0];
        assert_eq!(columns(line)[2].trim_end(), "4002");
    }

    #[test]
    fn test_unmapped_channel_blank_freq() {
        let mut log = EventLog::default();
        let line = &log.lines(&ZoneEvent::SystemId {
            system: 0x2c65,
            channel: 800,
        })[0];
        let cols = columns(line);
        assert_eq!(cols[0], "SYSID");
        assert_eq!(cols[1].trim_end(), "2c65");
        assert_eq!(cols[3], " ".repeat(12));
    }

    #[test]
    fn test_crc_line() {
        let mut log = EventLog::default();
        assert_eq!(
            log.lines(&ZoneEvent::CrcError { error_rate: 0.125 }),
            vec!["CRC: %12".to_string()]
        );
    }

    #[test]
    fn test_unknown_one_line_per_word() {
        let mut log = EventLog::default();
        let ev = ZoneEvent::Unknown {
            label: Some("3-seq"),
            words: vec![
                Osw::new(1, false, 0x308),
                Osw::new(2, true, 0x320),
                Osw::new(3, false, 0x32b),
            ],
        };
        let lines = log.lines(&ev);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("UNKN "));
        assert_eq!(columns(&lines[1])[4].trim_end(), "3-seq: (0002, 1, 0320)");
    }

    #[test]
    fn test_silent_events() {
        let mut log = EventLog::default();
        assert!(log
            .lines(&ZoneEvent::Affiliation {
                radio: 1,
                group: 0x1230,
                changes: 1
            })
            .is_empty());
        assert!(log
            .lines(&ZoneEvent::Patch {
                first: Osw::new(1, true, 0x308),
                second: Osw::new(2, true, 0x345),
            })
            .is_empty());
    }

    #[test]
    fn test_misc_texts() {
        let mut log = EventLog::default();
        let text = |log: &mut EventLog, ev: ZoneEvent| columns(&log.lines(&ev)[0])[4].trim_end().to_string();

        assert_eq!(text(&mut log, ZoneEvent::SystemStatus { tone: 3 }), "tone = 90");
        assert_eq!(
            text(
                &mut log,
                ZoneEvent::SystemClock {
                    month: 1,
                    day: 2,
                    year: 9,
                    hour: 3,
                    minute: 4
                }
            ),
            "01/02/09 03:04"
        );
        assert_eq!(
            text(
                &mut log,
                ZoneEvent::Ack {
                    kind: AckKind::Status,
                    target: 0x4001,
                    status: 5
                }
            ),
            "status: 5.000000"
        );
        assert_eq!(
            text(
                &mut log,
                ZoneEvent::Ack {
                    kind: AckKind::Unknown,
                    target: 0x4001,
                    status: 0xa
                }
            ),
            "status: a"
        );
        assert_eq!(
            text(
                &mut log,
                ZoneEvent::Diagnostic(Diagnostic::Enabled { equipment: 0x35 })
            ),
            "RIB(35) Enabled"
        );
        assert_eq!(
            text(&mut log, ZoneEvent::SiteId { site: 5, id: 0x101 }),
            "id = 101"
        );
    }

    #[test]
    fn test_neighbor_lists_known_frequencies() {
        let mut log = EventLog::default();
        let ev = ZoneEvent::Neighbor {
            source: 0x0a01,
            site: 4,
            channel: 693,
            info: crate::events::NeighborInfo::from_id(0),
            known: vec![0, 693],
        };
        let cols_line = &log.lines(&ev)[0];
        let cols = columns(cols_line);
        assert_eq!(cols[0], "NEIGH");
        assert_eq!(cols[2].trim_end(), "   4");
        assert_eq!(cols[4].trim_end(), "851.0125 868.3375");
    }
}
