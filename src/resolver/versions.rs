use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use crate::branch::BranchManager;
use crate::errors::{ServiceError, ServiceResult};
use crate::materializer::{materialize, materialize_prefixes, FoldError};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::{
    BranchId, EntityHistory, EntityId, EntitySelection, Page, PageRequest, PatchRecord, PatchStore, Visibility,
};

use super::filter::{matches_all, EntityFilter};

/// One entity as of some point in its history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityVersion {
    pub entity_id: EntityId,
    pub branch_id: Option<BranchId>,
    pub document: Value,
    /// Number of records folded into `document`
    pub version: u64,
    /// Number of records visible without an explicit cutoff
    pub latest_version: u64,
    /// Cutoff the document reflects
    pub as_of: Option<NaiveDateTime>,
}

/// The records a read will fold, plus where they sit in history.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub entity_id: EntityId,
    pub branch_id: Option<BranchId>,
    pub records: Vec<PatchRecord>,
    pub latest_version: u64,
    pub as_of: Option<NaiveDateTime>,
}

impl Resolution {
    pub fn version(&self) -> u64 {
        self.records.len() as u64
    }
}

/// Read side of the store. Takes no locks beyond the store's own.
pub struct VersionResolver {
    store: Arc<dyn PatchStore>,
    branches: Arc<BranchManager>,
    metrics: Arc<MetricsRegistry>,
}

impl VersionResolver {
    pub fn new(
        store: Arc<dyn PatchStore>,
        branches: Arc<BranchManager>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            store,
            branches,
            metrics,
        }
    }

    /// Visibility of a read on `branch` (main timeline for `None`).
    pub fn view(&self, branch: Option<BranchId>, as_of: Option<NaiveDateTime>) -> ServiceResult<Visibility> {
        match branch {
            None => Ok(Visibility::main(as_of)),
            Some(id) => self.branches.visibility(id, as_of),
        }
    }

    /// Visibility that `latest_version` is counted under for a read with
    /// `as_of`.
    ///
    /// A branch read with an explicit cutoff sees main-timeline records past
    /// the anchor, so its latest counts them too; otherwise the count uses
    /// the no-cutoff view.
    fn latest_view(&self, branch: Option<BranchId>, as_of: Option<NaiveDateTime>) -> ServiceResult<Visibility> {
        match (branch, as_of) {
            (Some(id), Some(_)) => {
                self.branches.get_branch(id)?;
                Ok(Visibility::branch_unbounded(id))
            }
            _ => self.view(branch, None),
        }
    }

    /// The cutoff a read reports when the caller gave none.
    fn default_as_of(&self, branch: Option<BranchId>, as_of: Option<NaiveDateTime>) -> ServiceResult<Option<NaiveDateTime>> {
        match (as_of, branch) {
            (Some(cutoff), _) => Ok(Some(cutoff)),
            (None, Some(id)) => Ok(Some(self.branches.get_branch(id)?.anchor_as_of)),
            (None, None) => Ok(None),
        }
    }

    /// Records visible to one entity at `as_of`.
    pub fn resolve_as_of(
        &self,
        entity: EntityId,
        branch: Option<BranchId>,
        as_of: Option<NaiveDateTime>,
    ) -> ServiceResult<Resolution> {
        let records = self.store.query(entity, &self.view(branch, as_of)?)?;
        if records.is_empty() {
            return Err(ServiceError::EntityNotFound(entity));
        }
        let latest_version = self.store.count_visible(entity, &self.latest_view(branch, as_of)?)?;
        let as_of = self
            .default_as_of(branch, as_of)?
            .or_else(|| records.last().map(|r| r.created_at));

        Ok(Resolution {
            entity_id: entity,
            branch_id: branch,
            records,
            latest_version,
            as_of,
        })
    }

    /// The first `version` visible records, `version` clamped to `[1, latest]`.
    pub fn resolve_version(
        &self,
        entity: EntityId,
        branch: Option<BranchId>,
        version: i64,
    ) -> ServiceResult<Resolution> {
        let mut records = self.store.query(entity, &self.view(branch, None)?)?;
        if records.is_empty() {
            return Err(ServiceError::EntityNotFound(entity));
        }
        let latest_version = records.len() as u64;
        let keep = clamp_version(version, latest_version);
        records.truncate(keep as usize);
        let as_of = records.last().map(|r| r.created_at);

        Ok(Resolution {
            entity_id: entity,
            branch_id: branch,
            records,
            latest_version,
            as_of,
        })
    }

    pub fn fold(&self, resolution: Resolution) -> ServiceResult<EntityVersion> {
        let document = self.fold_records(resolution.entity_id, &resolution.records)?;
        Ok(EntityVersion {
            entity_id: resolution.entity_id,
            branch_id: resolution.branch_id,
            version: resolution.version(),
            latest_version: resolution.latest_version,
            as_of: resolution.as_of,
            document,
        })
    }

    /// Folds the records of `entity`, treating failure as corrupted history.
    pub fn fold_records(&self, entity: EntityId, records: &[PatchRecord]) -> ServiceResult<Value> {
        self.metrics.record_fold(records.len());
        materialize(records).map_err(|e| self.corrupted(entity, e))
    }

    fn corrupted(&self, entity: EntityId, source: FoldError) -> ServiceError {
        log_event_with_fields(
            Event::HistoryCorrupted,
            &[
                ("entity_id", &entity.to_string()),
                ("record_id", &source.record_id.to_string()),
                ("error", &source.to_string()),
            ],
        );
        ServiceError::corrupted(entity, source)
    }

    pub fn as_of(
        &self,
        entity: EntityId,
        branch: Option<BranchId>,
        as_of: Option<NaiveDateTime>,
    ) -> ServiceResult<EntityVersion> {
        self.fold(self.resolve_as_of(entity, branch, as_of)?)
    }

    pub fn at_version(
        &self,
        entity: EntityId,
        branch: Option<BranchId>,
        version: i64,
    ) -> ServiceResult<EntityVersion> {
        self.fold(self.resolve_version(entity, branch, version)?)
    }

    /// Every version of `entity`, oldest first.
    pub fn all_versions(
        &self,
        entity: EntityId,
        branch: Option<BranchId>,
        page: Option<PageRequest>,
    ) -> ServiceResult<Page<EntityVersion>> {
        let records = self.store.query(entity, &self.view(branch, None)?)?;
        if records.is_empty() {
            return Err(ServiceError::EntityNotFound(entity));
        }
        self.metrics.record_fold(records.len());
        let prefixes = materialize_prefixes(&records).map_err(|e| self.corrupted(entity, e))?;

        let latest_version = records.len() as u64;
        let versions = prefixes
            .into_iter()
            .map(|m| EntityVersion {
                entity_id: entity,
                branch_id: branch,
                document: m.document,
                version: m.version,
                latest_version,
                as_of: m.last.map(|r| r.created_at),
            })
            .collect();
        Ok(Page::slice(versions, page))
    }

    /// One page of entities as of `as_of`, most recently changed first.
    ///
    /// Filters run against each folded document before the page is cut, so
    /// totals count only matching entities.
    pub fn page_as_of(
        &self,
        page: PageRequest,
        branch: Option<BranchId>,
        as_of: Option<NaiveDateTime>,
        filters: &[EntityFilter],
    ) -> ServiceResult<Page<EntityVersion>> {
        let visibility = self.view(branch, as_of)?;
        let latest_view = self.latest_view(branch, as_of)?;
        let reported_as_of = self.default_as_of(branch, as_of)?;
        let filtering = filters.iter().any(EntityFilter::is_active);

        let histories = self.store.query_many(
            &EntitySelection::All,
            &visibility,
            if filtering { None } else { Some(page) },
        )?;

        let folded = histories
            .try_map(|history| self.version_of(&history, branch, reported_as_of, &latest_view))?;

        if !filtering {
            return Ok(folded);
        }
        let kept = folded
            .items
            .into_iter()
            .filter(|v| matches_all(filters, &v.document))
            .collect();
        Ok(Page::slice(kept, Some(page)))
    }

    /// Several entities read under one view, in the order given.
    ///
    /// Fails with `EntityNotFound` for the first id with nothing visible.
    pub fn as_of_many(
        &self,
        entities: &[EntityId],
        branch: Option<BranchId>,
        as_of: Option<NaiveDateTime>,
    ) -> ServiceResult<Vec<EntityVersion>> {
        let visibility = self.view(branch, as_of)?;
        let latest_view = self.latest_view(branch, as_of)?;
        let reported_as_of = self.default_as_of(branch, as_of)?;

        let histories = self.store.query_many(
            &EntitySelection::Only(entities.to_vec()),
            &visibility,
            None,
        )?;
        entities
            .iter()
            .map(|&entity| {
                let history = histories
                    .items
                    .iter()
                    .find(|h| h.entity_id == entity)
                    .ok_or(ServiceError::EntityNotFound(entity))?;
                self.version_of(history, branch, reported_as_of, &latest_view)
            })
            .collect()
    }

    fn version_of(
        &self,
        history: &EntityHistory,
        branch: Option<BranchId>,
        reported_as_of: Option<NaiveDateTime>,
        latest_view: &Visibility,
    ) -> ServiceResult<EntityVersion> {
        let document = self.fold_records(history.entity_id, &history.records)?;
        Ok(EntityVersion {
            entity_id: history.entity_id,
            branch_id: branch,
            version: history.records.len() as u64,
            latest_version: self.store.count_visible(history.entity_id, latest_view)?,
            as_of: reported_as_of.or_else(|| history.latest().map(|r| r.created_at)),
            document,
        })
    }

    /// Visible records of `entity`, newest first.
    pub fn history(
        &self,
        entity: EntityId,
        branch: Option<BranchId>,
        page: PageRequest,
        as_of: Option<NaiveDateTime>,
    ) -> ServiceResult<Page<PatchRecord>> {
        let mut records = self.store.query(entity, &self.view(branch, as_of)?)?;
        if records.is_empty() {
            return Err(ServiceError::EntityNotFound(entity));
        }
        records.reverse();
        Ok(Page::slice(records, Some(page)))
    }

    /// Count of records visible without an explicit cutoff.
    pub fn latest_version(&self, entity: EntityId, branch: Option<BranchId>) -> ServiceResult<u64> {
        let count = self.store.count_visible(entity, &self.view(branch, None)?)?;
        if count == 0 {
            return Err(ServiceError::EntityNotFound(entity));
        }
        Ok(count)
    }
}

/// Maps a requested version into `[1, latest]`. `latest` must be at least 1.
fn clamp_version(requested: i64, latest: u64) -> u64 {
    if requested < 1 {
        1
    } else {
        (requested as u64).min(latest)
    }
}
