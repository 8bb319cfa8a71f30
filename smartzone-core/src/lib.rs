//! smartzone-core: Pure decode library for Motorola SmartZone control channels.
//!
//! No async, no threads: symbols go in, typed events come out. File loading
//! is limited to the config file and the talkgroup name table. The
//! `smartzone-monitor` binary drives it from recorded bit streams.

pub mod bandplan;
pub mod config;
pub mod crc;
pub mod decoder;
pub mod eventlog;
pub mod events;
pub mod groups;
pub mod sequencer;
pub mod session;
pub mod sync;
pub mod types;
pub mod word;

// Re-export commonly used types at crate root
pub use decoder::{symbols_for, ControlChannelDecoder};
pub use eventlog::EventLog;
pub use events::ZoneEvent;
pub use groups::GroupTable;
pub use session::ChannelAssignment;
pub use types::*;
pub use word::{encode_osw, ControlWord};
