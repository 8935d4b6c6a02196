//! Append-only journal files
//!
//! The journal is the durability mechanism behind the durable patch store
//! and branch registry. Nothing is acknowledged unless it is in the journal.
//!
//! # Frame layout
//!
//! | Field | Size |
//! |-------|------|
//! | frame length (whole frame) | u32 LE |
//! | sequence number | u64 LE |
//! | payload (JSON) | variable |
//! | CRC32 over sequence + payload | u32 LE |
//!
//! # Rules
//!
//! - Sequence numbers start at 1 and increase by exactly 1
//! - Every frame is checksummed
//! - Replay halts on the first anomaly: no skipping, no repair
//! - Frames are never rewritten; deletions are journaled as entries

mod checksum;
mod errors;
mod frame;
mod reader;
mod writer;

pub use checksum::compute_checksum;
pub use errors::{JournalError, JournalErrorCode, JournalResult, Severity};
pub use frame::JournalFrame;
pub use reader::{replay_entries, JournalReader};
pub use writer::JournalWriter;
