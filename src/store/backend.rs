//! The storage contract every patch store implements

use super::errors::StoreResult;
use super::ids::{BranchId, EntityId};
use super::page::{Page, PageRequest};
use super::record::{EntityHistory, PatchDraft, PatchRecord};
use super::visibility::Visibility;

/// Which entities a multi-entity query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitySelection {
    All,
    Only(Vec<EntityId>),
}

/// Append-only storage of patch records.
///
/// Every read applies the [`Visibility`] itself and returns records in
/// `(created_at, sequence)` order. Implementations are shared across
/// threads; a single append is atomic with respect to readers.
pub trait PatchStore: Send + Sync {
    /// Stamps and stores a record. The stamped record is returned.
    fn append(&self, draft: PatchDraft) -> StoreResult<PatchRecord>;

    /// Visible history of one entity.
    fn query(&self, entity: EntityId, visibility: &Visibility) -> StoreResult<Vec<PatchRecord>>;

    /// Visible histories grouped by entity.
    ///
    /// Entities without a visible record are left out. The rest are ranked
    /// by their latest visible record, newest first, then `page` is sliced
    /// from that ranking (`None` returns all of them).
    fn query_many(
        &self,
        selection: &EntitySelection,
        visibility: &Visibility,
        page: Option<PageRequest>,
    ) -> StoreResult<Page<EntityHistory>>;

    fn count_visible(&self, entity: EntityId, visibility: &Visibility) -> StoreResult<u64>;

    /// True if any record, on any timeline, exists for `entity`.
    fn contains_entity(&self, entity: EntityId) -> StoreResult<bool>;

    /// Removes every record of `entity`. Returns the number removed.
    fn delete_entity(&self, entity: EntityId) -> StoreResult<usize>;

    /// Removes every record tagged with `branch`. Returns the number removed.
    fn delete_branch(&self, branch: BranchId) -> StoreResult<usize>;

    /// Removes every tagged record. Main-timeline records stay.
    fn delete_all_branches(&self) -> StoreResult<usize>;

    /// Removes everything.
    fn delete_all(&self) -> StoreResult<usize>;

    fn record_count(&self) -> usize;
}
