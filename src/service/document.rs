use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::branch::{Branch, BranchManager};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::diff::diff;
use crate::errors::ServiceResult;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, MetricsSnapshot};
use crate::patch::Patch;
use crate::resolver::{EntityFilter, EntityVersion, VersionResolver};
use crate::store::{
    BranchId, EntityId, JournalStore, MemoryPatchStore, Page, PageRequest, PatchRecord, PatchStore,
};
use crate::write::{LockTable, WriteCoordinator, WriteOutcome};

pub struct DocumentService {
    store: Arc<dyn PatchStore>,
    branches: Arc<BranchManager>,
    resolver: Arc<VersionResolver>,
    writer: WriteCoordinator,
    metrics: Arc<MetricsRegistry>,
    clock: Arc<dyn Clock>,
    max_page_size: usize,
}

impl DocumentService {
    /// Opens the service described by `config`.
    ///
    /// With a data directory both journals are replayed first; a corrupt
    /// journal fails the open.
    pub fn open(config: &Config, clock: Arc<dyn Clock>) -> ServiceResult<Self> {
        let (store, branches): (Arc<dyn PatchStore>, BranchManager) = match config.data_path() {
            Some(dir) => {
                let store: Arc<dyn PatchStore> =
                    Arc::new(JournalStore::open(dir, clock.clone(), config.fsync)?);
                let branches = BranchManager::open(dir, store.clone(), clock.clone(), config.fsync)?;
                (store, branches)
            }
            None => {
                let store: Arc<dyn PatchStore> = Arc::new(MemoryPatchStore::new(clock.clone()));
                let branches = BranchManager::new(store.clone(), clock.clone());
                (store, branches)
            }
        };

        let metrics = Arc::new(MetricsRegistry::new());
        let branches = Arc::new(branches);
        let resolver = Arc::new(VersionResolver::new(
            store.clone(),
            branches.clone(),
            metrics.clone(),
        ));
        let writer = WriteCoordinator::new(
            store.clone(),
            resolver.clone(),
            branches.clone(),
            LockTable::new(config.lock_timeout()),
            metrics.clone(),
        );

        log_event_with_fields(
            Event::BootComplete,
            &[
                ("records", &store.record_count().to_string()),
                ("branches", &branches.branch_count().to_string()),
                ("durable", &config.data_path().is_some().to_string()),
            ],
        );

        Ok(Self {
            store,
            branches,
            resolver,
            writer,
            metrics,
            clock,
            max_page_size: config.max_page_size,
        })
    }

    /// In-memory service on the wall clock with default settings.
    pub fn in_memory() -> ServiceResult<Self> {
        Self::open(&Config::in_memory(), Arc::new(SystemClock))
    }

    fn page(&self, page: PageRequest) -> PageRequest {
        page.clamp_size(self.max_page_size)
    }

    // Writes

    pub fn create_entity(&self, document: Value) -> ServiceResult<WriteOutcome> {
        self.writer.create(document, None)
    }

    pub fn create_entity_in_branch(&self, document: Value, branch: BranchId) -> ServiceResult<WriteOutcome> {
        self.writer.create(document, Some(branch))
    }

    pub fn create_entities(&self, documents: Vec<Value>) -> ServiceResult<Vec<WriteOutcome>> {
        self.writer.create_many(documents)
    }

    pub fn update_entity(&self, entity: EntityId, document: Value) -> ServiceResult<WriteOutcome> {
        self.writer.update(entity, None, document)
    }

    pub fn update_entity_in_branch(
        &self,
        entity: EntityId,
        branch: BranchId,
        document: Value,
    ) -> ServiceResult<WriteOutcome> {
        self.writer.update(entity, Some(branch), document)
    }

    /// Applies a raw JSON patch document to the main timeline.
    ///
    /// Undecodable input is rejected before anything is read or stored.
    pub fn apply_raw_patch(&self, entity: EntityId, operations: Value) -> ServiceResult<WriteOutcome> {
        let patch = Patch::from_value(operations)?;
        self.writer.patch(entity, None, patch)
    }

    pub fn apply_raw_patch_in_branch(
        &self,
        entity: EntityId,
        branch: BranchId,
        operations: Value,
    ) -> ServiceResult<WriteOutcome> {
        let patch = Patch::from_value(operations)?;
        self.writer.patch(entity, Some(branch), patch)
    }

    pub fn delete_entity(&self, entity: EntityId) -> ServiceResult<usize> {
        self.writer.delete(entity)
    }

    pub fn delete_all_entities(&self) -> ServiceResult<usize> {
        self.writer.delete_all()
    }

    // Reads

    pub fn get_entity(&self, entity: EntityId, as_of: Option<NaiveDateTime>) -> ServiceResult<EntityVersion> {
        self.resolver.as_of(entity, None, as_of)
    }

    pub fn get_entity_in_branch(
        &self,
        entity: EntityId,
        branch: BranchId,
        as_of: Option<NaiveDateTime>,
    ) -> ServiceResult<EntityVersion> {
        self.resolver.as_of(entity, Some(branch), as_of)
    }

    pub fn get_entity_at_version(&self, entity: EntityId, version: i64) -> ServiceResult<EntityVersion> {
        self.resolver.at_version(entity, None, version)
    }

    pub fn get_entity_at_version_in_branch(
        &self,
        entity: EntityId,
        branch: BranchId,
        version: i64,
    ) -> ServiceResult<EntityVersion> {
        self.resolver.at_version(entity, Some(branch), version)
    }

    /// Every version of the entity, oldest first.
    pub fn get_entity_versions(
        &self,
        entity: EntityId,
        page: Option<PageRequest>,
    ) -> ServiceResult<Page<EntityVersion>> {
        self.resolver.all_versions(entity, None, page.map(|p| self.page(p)))
    }

    pub fn get_entity_versions_in_branch(
        &self,
        entity: EntityId,
        branch: BranchId,
        page: Option<PageRequest>,
    ) -> ServiceResult<Page<EntityVersion>> {
        self.resolver.all_versions(entity, Some(branch), page.map(|p| self.page(p)))
    }

    pub fn list_entities(
        &self,
        page: PageRequest,
        as_of: Option<NaiveDateTime>,
        filters: &[EntityFilter],
    ) -> ServiceResult<Page<EntityVersion>> {
        self.resolver.page_as_of(self.page(page), None, as_of, filters)
    }

    pub fn list_entities_in_branch(
        &self,
        branch: BranchId,
        page: PageRequest,
        as_of: Option<NaiveDateTime>,
        filters: &[EntityFilter],
    ) -> ServiceResult<Page<EntityVersion>> {
        self.resolver.page_as_of(self.page(page), Some(branch), as_of, filters)
    }

    pub fn latest_version(&self, entity: EntityId, branch: Option<BranchId>) -> ServiceResult<u64> {
        self.resolver.latest_version(entity, branch)
    }

    /// Stored records of the entity, newest first.
    pub fn list_patch_history(
        &self,
        entity: EntityId,
        page: PageRequest,
        as_of: Option<NaiveDateTime>,
    ) -> ServiceResult<Page<PatchRecord>> {
        self.resolver.history(entity, None, self.page(page), as_of)
    }

    pub fn list_patch_history_in_branch(
        &self,
        entity: EntityId,
        branch: BranchId,
        page: PageRequest,
        as_of: Option<NaiveDateTime>,
    ) -> ServiceResult<Page<PatchRecord>> {
        self.resolver.history(entity, Some(branch), self.page(page), as_of)
    }

    // Diffs

    /// The patch that turns `a` into `b`.
    ///
    /// `b` is read as of `as_of`. `a` is read as of `as_of` too, except when
    /// both ids are the same: then `a` is its current state, so the result
    /// undoes whatever changed after `as_of`.
    pub fn diff_entities(
        &self,
        a: EntityId,
        b: EntityId,
        as_of: Option<NaiveDateTime>,
    ) -> ServiceResult<Patch> {
        if a == b {
            let before = self.resolver.as_of(a, None, None)?;
            let after = self.resolver.as_of(b, None, as_of)?;
            return Ok(diff(&before.document, &after.document));
        }
        let read = self.resolver.as_of_many(&[a, b], None, as_of)?;
        Ok(diff(&read[0].document, &read[1].document))
    }

    /// The patch from version `version_a` of `a` to version `version_b` of `b`.
    pub fn diff_entity_versions(
        &self,
        a: EntityId,
        version_a: i64,
        b: EntityId,
        version_b: i64,
    ) -> ServiceResult<Patch> {
        let before = self.resolver.at_version(a, None, version_a)?;
        let after = self.resolver.at_version(b, None, version_b)?;
        Ok(diff(&before.document, &after.document))
    }

    // Branches

    /// Creates a branch anchored at `anchor_as_of`, or at the current time.
    pub fn create_branch(&self, anchor_as_of: Option<NaiveDateTime>) -> ServiceResult<Branch> {
        let anchor = anchor_as_of.unwrap_or_else(|| self.clock.now());
        self.branches.create_branch(anchor)
    }

    pub fn get_branch(&self, branch: BranchId) -> ServiceResult<Branch> {
        self.branches.get_branch(branch)
    }

    pub fn delete_branch(&self, branch: BranchId) -> ServiceResult<usize> {
        self.writer.delete_branch(branch)
    }

    pub fn delete_all_branches(&self) -> ServiceResult<usize> {
        self.writer.delete_all_branches()
    }

    pub fn list_branches(&self, page: PageRequest, as_of: Option<NaiveDateTime>) -> Page<Branch> {
        self.branches.list_branches(self.page(page), as_of)
    }

    // Introspection

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn record_count(&self) -> usize {
        self.store.record_count()
    }
}
