//! Volatile patch store

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::clock::Clock;

use super::backend::{EntitySelection, PatchStore};
use super::errors::StoreResult;
use super::ids::{BranchId, EntityId};
use super::index::PatchIndex;
use super::page::{Page, PageRequest};
use super::record::{EntityHistory, PatchDraft, PatchRecord};
use super::visibility::Visibility;

/// Patch store held entirely in memory. Nothing survives the process.
pub struct MemoryPatchStore {
    index: RwLock<PatchIndex>,
    clock: Arc<dyn Clock>,
}

impl MemoryPatchStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            index: RwLock::new(PatchIndex::new()),
            clock,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PatchIndex> {
        self.index.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PatchIndex> {
        self.index.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl PatchStore for MemoryPatchStore {
    fn append(&self, draft: PatchDraft) -> StoreResult<PatchRecord> {
        let mut index = self.write();
        let record = index.stamp(draft, self.clock.now());
        index.insert(record.clone());
        Ok(record)
    }

    fn query(&self, entity: EntityId, visibility: &Visibility) -> StoreResult<Vec<PatchRecord>> {
        Ok(self.read().query(entity, visibility))
    }

    fn query_many(
        &self,
        selection: &EntitySelection,
        visibility: &Visibility,
        page: Option<PageRequest>,
    ) -> StoreResult<Page<EntityHistory>> {
        Ok(self.read().query_many(selection, visibility, page))
    }

    fn count_visible(&self, entity: EntityId, visibility: &Visibility) -> StoreResult<u64> {
        Ok(self.read().count_visible(entity, visibility))
    }

    fn contains_entity(&self, entity: EntityId) -> StoreResult<bool> {
        Ok(self.read().contains_entity(entity))
    }

    fn delete_entity(&self, entity: EntityId) -> StoreResult<usize> {
        Ok(self.write().purge_entity(entity))
    }

    fn delete_branch(&self, branch: BranchId) -> StoreResult<usize> {
        Ok(self.write().purge_branch(branch))
    }

    fn delete_all_branches(&self) -> StoreResult<usize> {
        Ok(self.write().purge_all_branches())
    }

    fn delete_all(&self) -> StoreResult<usize> {
        Ok(self.write().purge_all())
    }

    fn record_count(&self) -> usize {
        self.read().record_count()
    }
}
