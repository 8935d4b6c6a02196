//! Journal error types
//!
//! Error codes:
//! - PALIMPSEST_JOURNAL_APPEND_FAILED (ERROR severity)
//! - PALIMPSEST_JOURNAL_FSYNC_FAILED (FATAL severity)
//! - PALIMPSEST_JOURNAL_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

/// Severity of a journal failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation fails, the process continues
    Error,
    /// The store can no longer be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Journal error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalErrorCode {
    /// Write to the journal failed
    AppendFailed,
    /// fsync after a write failed
    FsyncFailed,
    /// A frame failed validation during replay
    Corruption,
}

impl JournalErrorCode {
    /// Stable string code
    pub fn code(&self) -> &'static str {
        match self {
            JournalErrorCode::AppendFailed => "PALIMPSEST_JOURNAL_APPEND_FAILED",
            JournalErrorCode::FsyncFailed => "PALIMPSEST_JOURNAL_FSYNC_FAILED",
            JournalErrorCode::Corruption => "PALIMPSEST_JOURNAL_CORRUPTION",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            JournalErrorCode::AppendFailed => Severity::Error,
            JournalErrorCode::FsyncFailed | JournalErrorCode::Corruption => Severity::Fatal,
        }
    }
}

impl fmt::Display for JournalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Journal error with code, context, and the underlying I/O error if any
#[derive(Debug)]
pub struct JournalError {
    code: JournalErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl JournalError {
    pub fn append_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: JournalErrorCode::AppendFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    pub fn fsync_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: JournalErrorCode::FsyncFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    pub fn corruption(message: impl Into<String>) -> Self {
        Self {
            code: JournalErrorCode::Corruption,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Corruption located by sequence number
    pub fn corruption_at_sequence(sequence: u64, reason: impl Into<String>) -> Self {
        Self {
            code: JournalErrorCode::Corruption,
            message: reason.into(),
            details: Some(format!("sequence_number: {}", sequence)),
            source: None,
        }
    }

    /// Corruption located by byte offset
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: JournalErrorCode::Corruption,
            message: reason.into(),
            details: Some(format!("byte_offset: {}", offset)),
            source: None,
        }
    }

    pub fn code(&self) -> JournalErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for JournalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for journal operations
pub type JournalResult<T> = Result<T, JournalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_by_code() {
        assert_eq!(JournalErrorCode::AppendFailed.severity(), Severity::Error);
        assert_eq!(JournalErrorCode::FsyncFailed.severity(), Severity::Fatal);
        assert_eq!(JournalErrorCode::Corruption.severity(), Severity::Fatal);
    }

    #[test]
    fn test_append_failed_is_not_fatal() {
        let err = JournalError::append_failed("write failed", io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(!err.is_fatal());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_display_carries_code_and_location() {
        let err = JournalError::corruption_at_sequence(7, "checksum mismatch");
        let display = err.to_string();
        assert!(display.contains("FATAL"));
        assert!(display.contains("PALIMPSEST_JOURNAL_CORRUPTION"));
        assert!(display.contains("checksum mismatch"));
        assert!(display.contains("sequence_number: 7"));
    }
}
