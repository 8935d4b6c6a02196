use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::branch::BranchManager;
use crate::diff::diff;
use crate::errors::{ServiceError, ServiceResult};
use crate::materializer::empty_document;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::patch::{apply_patch, Patch};
use crate::resolver::VersionResolver;
use crate::store::{BranchId, EntityId, PatchDraft, PatchRecord, PatchStore};

use super::lock::{LockKey, LockTable, WriteGuard};

/// Result of a write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    pub entity_id: EntityId,
    pub branch_id: Option<BranchId>,
    pub document: Value,
    pub version: u64,
    /// `None` when the write changed nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<PatchRecord>,
}

impl WriteOutcome {
    pub fn appended(&self) -> bool {
        self.record.is_some()
    }
}

pub struct WriteCoordinator {
    store: Arc<dyn PatchStore>,
    resolver: Arc<VersionResolver>,
    branches: Arc<BranchManager>,
    locks: LockTable,
    metrics: Arc<MetricsRegistry>,
}

impl WriteCoordinator {
    pub fn new(
        store: Arc<dyn PatchStore>,
        resolver: Arc<VersionResolver>,
        branches: Arc<BranchManager>,
        locks: LockTable,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            store,
            resolver,
            branches,
            locks,
            metrics,
        }
    }

    /// Creates a new entity whose first record builds `document` from `{}`.
    ///
    /// An empty document still gets a (empty) first record, so the entity
    /// exists at version 1. With a branch the record is tagged and the
    /// entity exists only on that branch.
    pub fn create(&self, document: Value, branch: Option<BranchId>) -> ServiceResult<WriteOutcome> {
        let entity = EntityId::new();
        let _guard = self.lock(LockKey::new(entity, branch))?;
        if let Some(id) = branch {
            self.branches.get_branch(id)?;
        }
        let operations = diff(&empty_document(), &document);
        let record = self.append(entity, branch, operations, 1)?;

        Ok(WriteOutcome {
            entity_id: entity,
            branch_id: branch,
            document,
            version: 1,
            record: Some(record),
        })
    }

    pub fn create_many(&self, documents: Vec<Value>) -> ServiceResult<Vec<WriteOutcome>> {
        documents
            .into_iter()
            .map(|document| self.create(document, None))
            .collect()
    }

    /// Moves the entity to `desired`, appending the diff from its current state.
    pub fn update(
        &self,
        entity: EntityId,
        branch: Option<BranchId>,
        desired: Value,
    ) -> ServiceResult<WriteOutcome> {
        self.mutate(entity, branch, |current| Ok((diff(current, &desired), desired)))
    }

    /// Applies caller-supplied operations and stores them as given.
    ///
    /// A patch that fails, for example on a `test` operation, stores
    /// nothing and reports the failing operation. A patch that leaves the
    /// document as it was is a no-op.
    pub fn patch(
        &self,
        entity: EntityId,
        branch: Option<BranchId>,
        operations: Patch,
    ) -> ServiceResult<WriteOutcome> {
        self.mutate(entity, branch, |current| {
            let next = apply_patch(current, &operations).map_err(|e| {
                self.metrics.increment_patches_rejected();
                log_event_with_fields(
                    Event::PatchRejected,
                    &[
                        ("entity_id", &entity.to_string()),
                        ("op_index", &e.op_index.to_string()),
                        ("reason", &e.reason.to_string()),
                    ],
                );
                e
            })?;
            if &next == current {
                return Ok((Patch::new(), next));
            }
            Ok((operations, next))
        })
    }

    /// Lock, fold, compute, append. `change` returns the operations to store
    /// and the document they produce.
    fn mutate(
        &self,
        entity: EntityId,
        branch: Option<BranchId>,
        change: impl FnOnce(&Value) -> ServiceResult<(Patch, Value)>,
    ) -> ServiceResult<WriteOutcome> {
        let _guard = self.lock(LockKey::new(entity, branch))?;
        // Resolved under the lock: a purge cannot remove the branch or the
        // entity between here and the append.
        let view = self.resolver.view(branch, None)?;

        let records = self.store.query(entity, &view)?;
        if records.is_empty() {
            return Err(ServiceError::EntityNotFound(entity));
        }
        let current = self.resolver.fold_records(entity, &records)?;
        let current_version = records.len() as u64;

        let (operations, next) = change(&current)?;
        if operations.is_empty() {
            self.metrics.increment_noop_writes();
            log_event_with_fields(
                Event::WriteNoop,
                &[
                    ("entity_id", &entity.to_string()),
                    ("version", &current_version.to_string()),
                ],
            );
            return Ok(WriteOutcome {
                entity_id: entity,
                branch_id: branch,
                document: current,
                version: current_version,
                record: None,
            });
        }

        let version = current_version + 1;
        let record = self.append(entity, branch, operations, version)?;
        Ok(WriteOutcome {
            entity_id: entity,
            branch_id: branch,
            document: next,
            version,
            record: Some(record),
        })
    }

    fn lock(&self, key: LockKey) -> ServiceResult<WriteGuard<'_>> {
        self.locks.acquire(key).map_err(|e| {
            if let ServiceError::WriteContention { waited, .. } = &e {
                self.metrics.increment_write_contentions();
                log_event_with_fields(
                    Event::WriteContention,
                    &[
                        ("entity_id", &key.entity_id.to_string()),
                        ("waited_ms", &waited.as_millis().to_string()),
                    ],
                );
            }
            e
        })
    }

    fn append(
        &self,
        entity: EntityId,
        branch: Option<BranchId>,
        operations: Patch,
        version: u64,
    ) -> ServiceResult<PatchRecord> {
        let op_count = operations.len();
        let record = self.store.append(PatchDraft::new(entity, branch, operations))?;
        self.metrics.increment_patches_appended();
        log_event_with_fields(
            Event::PatchAppended,
            &[
                ("entity_id", &entity.to_string()),
                ("branch_id", &branch.map(|b| b.to_string()).unwrap_or_default()),
                ("version", &version.to_string()),
                ("operations", &op_count.to_string()),
                ("sequence", &record.sequence.to_string()),
            ],
        );
        Ok(record)
    }

    /// Drops every record of `entity` on every timeline.
    ///
    /// Like every purge, waits until no write is in flight on any key.
    pub fn delete(&self, entity: EntityId) -> ServiceResult<usize> {
        let _purge = self.locks.exclusive();
        if !self.store.contains_entity(entity)? {
            return Err(ServiceError::EntityNotFound(entity));
        }
        let removed = self.store.delete_entity(entity)?;
        self.metrics.increment_purges();
        log_event_with_fields(
            Event::EntityPurged,
            &[("entity_id", &entity.to_string()), ("records", &removed.to_string())],
        );
        Ok(removed)
    }

    pub fn delete_all(&self) -> ServiceResult<usize> {
        let _purge = self.locks.exclusive();
        let removed = self.store.delete_all()?;
        self.metrics.increment_purges();
        log_event_with_fields(Event::EntityPurged, &[("records", &removed.to_string())]);
        Ok(removed)
    }

    pub fn delete_branch(&self, branch: BranchId) -> ServiceResult<usize> {
        let _purge = self.locks.exclusive();
        let removed = self.branches.delete_branch(branch)?;
        self.metrics.increment_purges();
        Ok(removed)
    }

    pub fn delete_all_branches(&self) -> ServiceResult<usize> {
        let _purge = self.locks.exclusive();
        let removed = self.branches.delete_all_branches()?;
        self.metrics.increment_purges();
        Ok(removed)
    }
}
