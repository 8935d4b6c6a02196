//! Store errors

use thiserror::Error;

use crate::journal::JournalError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The durable journal refused a write or failed replay
    #[error("{0}")]
    Journal(#[from] JournalError),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Journal(e) => e.code().code(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        match self {
            StoreError::Journal(e) => e.is_fatal(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
