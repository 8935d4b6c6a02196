//! Observable events
//!
//! Every log line the store emits names one of these.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & lifecycle
    BootStart,
    BootComplete,
    ConfigLoaded,
    Serving,
    ShutdownComplete,

    // Journal
    JournalReplayBegin,
    JournalReplayComplete,
    /// Replay found a bad frame (FATAL)
    JournalCorruption,

    // Writes
    PatchAppended,
    /// A write computed an empty patch and appended nothing
    WriteNoop,
    WriteContention,
    PatchRejected,
    EntityPurged,

    // Branches
    BranchCreated,
    BranchDeleted,

    /// Stored history failed to fold (FATAL)
    HistoryCorrupted,

    RequestFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "BOOT_START",
            Event::BootComplete => "BOOT_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::Serving => "SERVING",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::JournalReplayBegin => "JOURNAL_REPLAY_BEGIN",
            Event::JournalReplayComplete => "JOURNAL_REPLAY_COMPLETE",
            Event::JournalCorruption => "JOURNAL_CORRUPTION",
            Event::PatchAppended => "PATCH_APPENDED",
            Event::WriteNoop => "WRITE_NOOP",
            Event::WriteContention => "WRITE_CONTENTION",
            Event::PatchRejected => "PATCH_REJECTED",
            Event::EntityPurged => "ENTITY_PURGED",
            Event::BranchCreated => "BRANCH_CREATED",
            Event::BranchDeleted => "BRANCH_DELETED",
            Event::HistoryCorrupted => "HISTORY_CORRUPTED",
            Event::RequestFailed => "REQUEST_FAILED",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::JournalCorruption | Event::HistoryCorrupted)
    }

    /// Severity the event is logged at.
    pub fn severity(&self) -> Severity {
        match self {
            Event::JournalCorruption | Event::HistoryCorrupted => Severity::Fatal,
            Event::WriteContention | Event::PatchRejected => Severity::Warn,
            Event::RequestFailed => Severity::Error,
            Event::WriteNoop => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
