//! Patch records

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::patch::Patch;

use super::ids::{BranchId, EntityId, RecordId};

/// One immutable, stored unit of change.
///
/// Records of one entity are ordered by `(created_at, sequence)`. The store
/// assigns both on append, so a later append always sorts last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRecord {
    pub id: RecordId,
    pub entity_id: EntityId,
    /// `None` is the main timeline
    pub branch_id: Option<BranchId>,
    pub operations: Patch,
    pub created_at: NaiveDateTime,
    /// Store-wide, strictly increasing
    pub sequence: u64,
}

impl PatchRecord {
    /// Sort key within an entity's history.
    pub fn order_key(&self) -> (NaiveDateTime, u64) {
        (self.created_at, self.sequence)
    }
}

/// A record before the store has stamped it.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchDraft {
    pub entity_id: EntityId,
    pub branch_id: Option<BranchId>,
    pub operations: Patch,
}

impl PatchDraft {
    pub fn new(entity_id: EntityId, branch_id: Option<BranchId>, operations: Patch) -> Self {
        Self {
            entity_id,
            branch_id,
            operations,
        }
    }
}

/// The visible records of one entity, in fold order.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityHistory {
    pub entity_id: EntityId,
    pub records: Vec<PatchRecord>,
}

impl EntityHistory {
    /// Record with the greatest `(created_at, sequence)`.
    pub fn latest(&self) -> Option<&PatchRecord> {
        self.records.last()
    }
}
