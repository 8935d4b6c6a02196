//! Errors surfaced by every document operation
//!
//! Error codes:
//! - PALIMPSEST_ENTITY_NOT_FOUND (ERROR)
//! - PALIMPSEST_BRANCH_NOT_FOUND (ERROR)
//! - PALIMPSEST_PATCH_APPLY_FAILED (ERROR)
//! - PALIMPSEST_WRITE_CONTENTION (ERROR)
//! - PALIMPSEST_HISTORY_CORRUPTED (FATAL)
//! - PALIMPSEST_JOURNAL_* (see the journal module)
//!
//! Not-found is an expected outcome, not a failure of the store. A fatal
//! error means stored state can no longer be trusted.

use std::time::Duration;

use thiserror::Error;

use crate::materializer::FoldError;
use crate::patch::PatchApplyError;
use crate::store::{BranchId, EntityId, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// No visible record for the entity under the requested view
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    #[error("branch {0} not found")]
    BranchNotFound(BranchId),

    /// A caller-supplied patch does not apply; nothing was stored
    #[error(transparent)]
    PatchApply(#[from] PatchApplyError),

    /// Another writer held the entity lock for the whole wait
    #[error("entity {entity_id} is locked by another writer (waited {waited:?})")]
    WriteContention {
        entity_id: EntityId,
        branch_id: Option<BranchId>,
        waited: Duration,
    },

    /// Stored history of an entity no longer folds
    #[error("history of entity {entity_id} is corrupted: {source}")]
    HistoryCorrupted {
        entity_id: EntityId,
        #[source]
        source: FoldError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::EntityNotFound(_) => "PALIMPSEST_ENTITY_NOT_FOUND",
            ServiceError::BranchNotFound(_) => "PALIMPSEST_BRANCH_NOT_FOUND",
            ServiceError::PatchApply(e) => e.code(),
            ServiceError::WriteContention { .. } => "PALIMPSEST_WRITE_CONTENTION",
            ServiceError::HistoryCorrupted { .. } => "PALIMPSEST_HISTORY_CORRUPTED",
            ServiceError::Store(e) => e.code(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        match self {
            ServiceError::HistoryCorrupted { .. } => true,
            ServiceError::Store(e) => e.is_fatal(),
            _ => false,
        }
    }

    /// True for the expected not-found outcomes.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::EntityNotFound(_) | ServiceError::BranchNotFound(_)
        )
    }

    pub(crate) fn corrupted(entity_id: EntityId, source: FoldError) -> Self {
        ServiceError::HistoryCorrupted { entity_id, source }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PatchFailure;

    #[test]
    fn test_codes_and_fatality() {
        let missing = ServiceError::EntityNotFound(EntityId::new());
        assert_eq!(missing.code(), "PALIMPSEST_ENTITY_NOT_FOUND");
        assert!(missing.is_not_found());
        assert!(!missing.is_fatal());

        let contention = ServiceError::WriteContention {
            entity_id: EntityId::new(),
            branch_id: None,
            waited: Duration::from_millis(5),
        };
        assert_eq!(contention.code(), "PALIMPSEST_WRITE_CONTENTION");
        assert!(!contention.is_fatal());
    }

    #[test]
    fn test_patch_apply_keeps_op_index() {
        let err: ServiceError =
            PatchApplyError::new(PatchFailure::TestFailed("/a".to_string()), 2).into();
        assert_eq!(err.code(), "PALIMPSEST_PATCH_APPLY_FAILED");
        match err {
            ServiceError::PatchApply(inner) => assert_eq!(inner.op_index, 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
