//! Call session dedup for channel grants.
//!
//! The control channel repeats a grant for as long as the call is up. Only
//! the first grant of a (group, channel, talker) combination becomes a
//! notification; repeats refresh the session and are swallowed. A session
//! lapses once no grant has refreshed it for the window (1 s by default).
//!
//! Pure logic: time is passed in by the caller, expiry is checked lazily.

use serde::Serialize;
use tracing::trace;

/// Default session window in seconds.
pub const SESSION_WINDOW: f64 = 1.0;

/// Notification for the recording scheduler: a talkgroup has been put on a
/// voice channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelAssignment {
    pub system_id: u16,
    pub channel: u16,
    pub group_id: u16,
    /// Talker, if the grant carried one
    pub radio_id: Option<u16>,
}

impl std::fmt::Display for ChannelAssignment {
    /// Wire form `"sys chan group radio"`, with -1 for an unknown talker.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let radio = self.radio_id.map(i32::from).unwrap_or(-1);
        write!(
            f,
            "{} {} {} {}",
            self.system_id, self.channel, self.group_id, radio
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CallSession {
    group_id: u16,
    channel: u16,
    radio_id: Option<u16>,
    last_seen: f64,
}

/// Tracks live call sessions for one control channel.
#[derive(Debug)]
pub struct CallSessionTracker {
    window: f64,
    sessions: Vec<CallSession>,
    system_id: Option<u16>,
    system_channel: Option<u16>,
}

impl CallSessionTracker {
    pub fn new(window: f64) -> Self {
        CallSessionTracker {
            window,
            sessions: Vec::new(),
            system_id: None,
            system_channel: None,
        }
    }

    /// Record the system identity learned from the control channel.
    pub fn set_system(&mut self, system_id: u16, channel: u16) {
        self.system_id = Some(system_id);
        self.system_channel = Some(channel);
    }

    pub fn system_id(&self) -> Option<u16> {
        self.system_id
    }

    pub fn system_channel(&self) -> Option<u16> {
        self.system_channel
    }

    /// Register a grant. Returns the assignment to announce if this is a new
    /// session, `None` for a repeat or while the system is still unknown.
    pub fn start_call(
        &mut self,
        group_id: u16,
        channel: u16,
        radio_id: Option<u16>,
        now: f64,
    ) -> Option<ChannelAssignment> {
        let system_id = self.system_id?;

        self.prune(now);

        if let Some(s) = self
            .sessions
            .iter_mut()
            .find(|s| s.group_id == group_id && s.channel == channel && s.radio_id == radio_id)
        {
            s.last_seen = now;
            return None;
        }

        self.sessions.push(CallSession {
            group_id,
            channel,
            radio_id,
            last_seen: now,
        });
        trace!(group_id, channel, ?radio_id, "new call session");

        Some(ChannelAssignment {
            system_id,
            channel,
            group_id,
            radio_id,
        })
    }

    /// Drop sessions not refreshed within the window.
    pub fn prune(&mut self, now: f64) {
        let window = self.window;
        self.sessions.retain(|s| now < s.last_seen + window);
    }

    /// Number of sessions currently held (including any not yet pruned).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for CallSessionTracker {
    fn default() -> Self {
        CallSessionTracker::new(SESSION_WINDOW)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> CallSessionTracker {
        let mut t = CallSessionTracker::default();
        t.set_system(0x2c65, 693);
        t
    }

    #[test]
    fn test_unknown_system_suppresses() {
        let mut t = CallSessionTracker::default();
        assert!(t.start_call(0x1230, 100, None, 0.0).is_none());
        assert!(t.start_call(0x1230, 100, None, 0.1).is_none());
        assert!(t.is_empty());
    }

    #[test]
    fn test_repeat_within_window() {
        let mut t = tracker();
        assert!(t.start_call(0x1230, 100, Some(0x4001), 10.0).is_some());
        assert!(t.start_call(0x1230, 100, Some(0x4001), 10.9).is_none());
    }

    #[test]
    fn test_repeat_after_window() {
        let mut t = tracker();
        assert!(t.start_call(0x1230, 100, Some(0x4001), 10.0).is_some());
        assert!(t.start_call(0x1230, 100, Some(0x4001), 11.001).is_some());
    }

    #[test]
    fn test_refresh_extends_session() {
        let mut t = tracker();
        assert!(t.start_call(0x1230, 100, None, 0.0).is_some());
        assert!(t.start_call(0x1230, 100, None, 0.8).is_none());
        assert!(t.start_call(0x1230, 100, None, 1.6).is_none());
        assert!(t.start_call(0x1230, 100, None, 2.4).is_none());
    }

    #[test]
    fn test_different_radio_independent() {
        let mut t = tracker();
        assert!(t.start_call(0x1230, 100, Some(0x4001), 0.0).is_some());
        assert!(t.start_call(0x1230, 100, Some(0x4002), 0.1).is_some());
        assert!(t.start_call(0x1230, 100, None, 0.2).is_some());
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_prune_on_access() {
        let mut t = tracker();
        t.start_call(0x1230, 100, None, 0.0);
        t.start_call(0x2340, 200, None, 0.5);
        t.start_call(0x3450, 300, None, 1.2);
        // 0.0 expired at 1.2, the others are live
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_assignment_contents() {
        let mut t = tracker();
        let a = t.start_call(0x1230, 100, Some(0x4001), 0.0).unwrap();
        assert_eq!(a.system_id, 0x2c65);
        assert_eq!(a.channel, 100);
        assert_eq!(a.group_id, 0x1230);
        assert_eq!(a.radio_id, Some(0x4001));
        assert_eq!(a.to_string(), "11365 100 4656 16385");
    }

    #[test]
    fn test_assignment_unknown_talker_sentinel() {
        let mut t = tracker();
        let a = t.start_call(0x1230, 100, None, 0.0).unwrap();
        assert!(a.to_string().ends_with(" -1"));
    }
}
