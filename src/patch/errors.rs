//! Patch error types
//!
//! Error codes:
//! - PALIMPSEST_PATCH_APPLY_FAILED (ERROR severity)
//! - PALIMPSEST_INVALID_POINTER (ERROR severity)

use thiserror::Error;

/// A JSON pointer string that does not follow RFC 6901.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid JSON pointer {pointer:?}: {reason}")]
pub struct PointerError {
    /// The rejected pointer text
    pub pointer: String,
    /// Why it was rejected
    pub reason: &'static str,
}

impl PointerError {
    pub(crate) fn new(pointer: impl Into<String>, reason: &'static str) -> Self {
        Self {
            pointer: pointer.into(),
            reason,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        "PALIMPSEST_INVALID_POINTER"
    }
}

/// Why a single operation could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchFailure {
    /// Target (or `from`) location does not exist
    #[error("path {0} does not exist")]
    PathNotFound(String),

    /// Parent of the target exists but is a scalar
    #[error("parent of {0} is not an object or array")]
    ParentNotContainer(String),

    /// Array index token is malformed or out of bounds
    #[error("invalid array index {index:?} at {path}")]
    InvalidIndex {
        /// Full operation path
        path: String,
        /// Offending token
        index: String,
    },

    /// `move` whose destination lies inside its source
    #[error("cannot move {from} into its own child {path}")]
    MoveIntoChild {
        /// Source location
        from: String,
        /// Destination location
        path: String,
    },

    /// `test` found a different value
    #[error("test failed at {0}")]
    TestFailed(String),

    /// Operation could not be decoded or targets the root illegally
    #[error("malformed operation: {0}")]
    Malformed(String),
}

/// Failure to apply a patch, carrying the index of the failing operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("patch operation {op_index} failed: {reason}")]
pub struct PatchApplyError {
    /// What went wrong
    pub reason: PatchFailure,
    /// Zero-based index of the failing operation within its patch
    pub op_index: usize,
}

impl PatchApplyError {
    /// Create a new apply error
    pub fn new(reason: PatchFailure, op_index: usize) -> Self {
        Self { reason, op_index }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        "PALIMPSEST_PATCH_APPLY_FAILED"
    }
}
