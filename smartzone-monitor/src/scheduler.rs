//! Recording session bookkeeping for granted voice channels.
//!
//! Channel assignments arrive from the decoder over a channel. Per voice
//! channel one session is open at a time: another grant for the same group
//! adds a talker, a grant for a different group closes the session and opens
//! a new one. Audio capture itself is outside this crate; the scheduler keeps
//! the session record and reports it.

use std::collections::HashMap;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use smartzone_core::bandplan::frequency_mhz;
use smartzone_core::ChannelAssignment;
use tracing::{debug, info};

/// Assignment plus the stream time it was granted at.
pub type AssignmentMsg = (ChannelAssignment, f64);

/// One talkgroup's use of a voice channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSession {
    pub system_id: u16,
    pub channel: u16,
    pub group_id: u16,
    pub started: f64,
    /// Talkers in grant order; `None` when the grant carried no talker
    pub talkers: Vec<(Option<u16>, f64)>,
}

/// What an assignment did to the schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleAction {
    /// New session on an idle channel.
    Started,
    /// Same group on the channel, talker recorded.
    TalkerAdded,
    /// Channel moved to another group; the old session is returned.
    Replaced(RecordingSession),
}

#[derive(Debug, Default)]
pub struct RecordingScheduler {
    active: HashMap<u16, RecordingSession>,
    finished: Vec<RecordingSession>,
    assignments: u64,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, a: ChannelAssignment, now: f64) -> ScheduleAction {
        self.assignments += 1;

        if let Some(session) = self.active.get_mut(&a.channel) {
            if session.group_id == a.group_id {
                session.talkers.push((a.radio_id, now));
                return ScheduleAction::TalkerAdded;
            }
        }

        let replaced = self.active.insert(
            a.channel,
            RecordingSession {
                system_id: a.system_id,
                channel: a.channel,
                group_id: a.group_id,
                started: now,
                talkers: vec![(a.radio_id, now)],
            },
        );
        match replaced {
            Some(old) => {
                self.finished.push(old.clone());
                ScheduleAction::Replaced(old)
            }
            None => ScheduleAction::Started,
        }
    }

    /// Close every open session, in channel order.
    pub fn finish(&mut self) {
        let mut open: Vec<RecordingSession> = self.active.drain().map(|(_, s)| s).collect();
        open.sort_by_key(|s| s.channel);
        self.finished.extend(open);
    }

    pub fn active(&self, channel: u16) -> Option<&RecordingSession> {
        self.active.get(&channel)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn finished(&self) -> &[RecordingSession] {
        &self.finished
    }

    pub fn assignments(&self) -> u64 {
        self.assignments
    }

    /// Human-readable end-of-run summary, one line per session.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} assignments, {} sessions",
            self.assignments,
            self.finished.len() + self.active.len()
        )];
        for s in self.finished.iter().chain(self.active.values()) {
            let freq = frequency_mhz(s.channel)
                .map(|f| format!("{f:.4} MHz"))
                .unwrap_or_else(|| format!("chan {}", s.channel));
            lines.push(format!(
                "  sys {:x} {} group {:x}: {} talker grant(s)",
                s.system_id,
                freq,
                s.group_id,
                s.talkers.len()
            ));
        }
        lines
    }
}

/// Start the scheduler thread. It runs until every sender is dropped and
/// hands back the final schedule on join.
pub fn spawn() -> std::io::Result<(Sender<AssignmentMsg>, JoinHandle<RecordingScheduler>)> {
    let (tx, rx) = unbounded::<AssignmentMsg>();
    let handle = thread::Builder::new()
        .name("recording-scheduler".into())
        .spawn(move || run(rx))?;
    Ok((tx, handle))
}

fn run(rx: Receiver<AssignmentMsg>) -> RecordingScheduler {
    let mut scheduler = RecordingScheduler::new();
    for (a, now) in rx.iter() {
        let freq = frequency_mhz(a.channel).unwrap_or(0.0);
        match scheduler.assign(a, now) {
            ScheduleAction::Started => {
                info!(
                    sys = %format!("{:x}", a.system_id),
                    freq,
                    group = %format!("{:x}", a.group_id),
                    radio = a.radio_id.map(i32::from).unwrap_or(-1),
                    "recording session started"
                );
            }
            ScheduleAction::TalkerAdded => {
                debug!(channel = a.channel, radio = ?a.radio_id, "talker added");
            }
            ScheduleAction::Replaced(old) => {
                info!(
                    channel = a.channel,
                    old_group = %format!("{:x}", old.group_id),
                    new_group = %format!("{:x}", a.group_id),
                    talkers = old.talkers.len(),
                    "channel reassigned, session closed"
                );
            }
        }
    }
    scheduler.finish();
    scheduler
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(channel: u16, group_id: u16, radio_id: Option<u16>) -> ChannelAssignment {
        ChannelAssignment {
            system_id: 0x2c65,
            channel,
            group_id,
            radio_id,
        }
    }

    #[test]
    fn test_same_group_adds_talker() {
        let mut s = RecordingScheduler::new();
        assert_eq!(s.assign(assignment(100, 0x1230, Some(1)), 0.0), ScheduleAction::Started);
        assert_eq!(s.assign(assignment(100, 0x1230, None), 2.0), ScheduleAction::TalkerAdded);
        let session = s.active(100).unwrap();
        assert_eq!(session.talkers, vec![(Some(1), 0.0), (None, 2.0)]);
        assert_eq!(s.active_count(), 1);
    }

    #[test]
    fn test_group_change_replaces_session() {
        let mut s = RecordingScheduler::new();
        s.assign(assignment(100, 0x1230, Some(1)), 0.0);
        match s.assign(assignment(100, 0x4560, Some(2)), 5.0) {
            ScheduleAction::Replaced(old) => assert_eq!(old.group_id, 0x1230),
            other => panic!("expected replace, got {other:?}"),
        }
        assert_eq!(s.active(100).unwrap().group_id, 0x4560);
        assert_eq!(s.finished().len(), 1);
    }

    #[test]
    fn test_channels_independent() {
        let mut s = RecordingScheduler::new();
        s.assign(assignment(100, 0x1230, None), 0.0);
        assert_eq!(s.assign(assignment(200, 0x4560, None), 0.0), ScheduleAction::Started);
        assert_eq!(s.active_count(), 2);
    }

    #[test]
    fn test_summary() {
        let mut s = RecordingScheduler::new();
        s.assign(assignment(693, 0x1230, Some(1)), 0.0);
        s.assign(assignment(693, 0x1230, Some(2)), 1.0);
        s.assign(assignment(800, 0x4560, None), 1.0);
        s.finish();
        let lines = s.summary();
        assert_eq!(lines[0], "3 assignments, 2 sessions");
        assert_eq!(lines[1], "  sys 2c65 868.3375 MHz group 1230: 2 talker grant(s)");
        assert_eq!(lines[2], "  sys 2c65 chan 800 group 4560: 1 talker grant(s)");
    }

    #[test]
    fn test_thread_drains_channel() {
        let (tx, handle) = spawn().unwrap();
        tx.send((assignment(100, 0x1230, Some(1)), 0.0)).unwrap();
        tx.send((assignment(100, 0x4560, None), 1.0)).unwrap();
        drop(tx);
        let s = handle.join().unwrap();
        assert_eq!(s.assignments(), 2);
        assert_eq!(s.active_count(), 0);
        assert_eq!(s.finished().len(), 2);
    }
}
