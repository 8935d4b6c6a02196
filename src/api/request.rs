//! API requests
//!
//! One JSON object per request, discriminated by `op`:
//!
//! ```json
//! {"op": "update_entity", "entityId": "…", "document": {"firstName": "Ann"}}
//! ```
//!
//! Timestamps are ISO-8601 local date-times without offset
//! (`2024-01-31T12:00:00`). Paged operations take an optional zero-based
//! `page` and a `size`.

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::resolver::EntityFilter;
use crate::store::{BranchId, EntityId};

use super::errors::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    #[serde(rename_all = "camelCase")]
    CreateEntity {
        document: Value,
        #[serde(default)]
        branch_id: Option<BranchId>,
    },
    CreateEntities {
        documents: Vec<Value>,
    },
    #[serde(rename_all = "camelCase")]
    GetEntity {
        entity_id: EntityId,
        #[serde(default)]
        branch_id: Option<BranchId>,
        #[serde(default)]
        as_of: Option<NaiveDateTime>,
    },
    #[serde(rename_all = "camelCase")]
    GetEntityAtVersion {
        entity_id: EntityId,
        #[serde(default)]
        branch_id: Option<BranchId>,
        version: i64,
    },
    #[serde(rename_all = "camelCase")]
    GetEntityVersions {
        entity_id: EntityId,
        #[serde(default)]
        branch_id: Option<BranchId>,
        #[serde(default)]
        page: Option<usize>,
        #[serde(default)]
        size: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    ListEntities {
        #[serde(default)]
        branch_id: Option<BranchId>,
        #[serde(default)]
        page: Option<usize>,
        #[serde(default)]
        size: Option<usize>,
        #[serde(default)]
        as_of: Option<NaiveDateTime>,
        #[serde(default)]
        filters: Vec<EntityFilter>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateEntity {
        entity_id: EntityId,
        #[serde(default)]
        branch_id: Option<BranchId>,
        document: Value,
    },
    #[serde(rename_all = "camelCase")]
    ApplyRawPatch {
        entity_id: EntityId,
        #[serde(default)]
        branch_id: Option<BranchId>,
        operations: Value,
    },
    #[serde(rename_all = "camelCase")]
    DiffEntities {
        entity_a: EntityId,
        entity_b: EntityId,
        #[serde(default)]
        as_of: Option<NaiveDateTime>,
    },
    #[serde(rename_all = "camelCase")]
    DiffEntityVersions {
        entity_a: EntityId,
        version_a: i64,
        entity_b: EntityId,
        version_b: i64,
    },
    #[serde(rename_all = "camelCase")]
    ListPatchHistory {
        entity_id: EntityId,
        #[serde(default)]
        branch_id: Option<BranchId>,
        #[serde(default)]
        page: Option<usize>,
        #[serde(default)]
        size: Option<usize>,
        #[serde(default)]
        as_of: Option<NaiveDateTime>,
    },
    #[serde(rename_all = "camelCase")]
    LatestVersion {
        entity_id: EntityId,
        #[serde(default)]
        branch_id: Option<BranchId>,
    },
    #[serde(rename_all = "camelCase")]
    DeleteEntity {
        entity_id: EntityId,
    },
    DeleteAllEntities,
    #[serde(rename_all = "camelCase")]
    CreateBranch {
        #[serde(default)]
        anchor_as_of: Option<NaiveDateTime>,
    },
    #[serde(rename_all = "camelCase")]
    GetBranch {
        branch_id: BranchId,
    },
    #[serde(rename_all = "camelCase")]
    DeleteBranch {
        branch_id: BranchId,
    },
    DeleteAllBranches,
    #[serde(rename_all = "camelCase")]
    ListBranches {
        #[serde(default)]
        page: Option<usize>,
        #[serde(default)]
        size: Option<usize>,
        #[serde(default)]
        as_of: Option<NaiveDateTime>,
    },
    Metrics,
}

impl Request {
    pub fn parse(line: &str) -> ApiResult<Self> {
        serde_json::from_str(line).map_err(|e| ApiError::invalid_request(format!("Invalid request: {}", e)))
    }

    /// The `op` name, for logging.
    pub fn op(&self) -> &'static str {
        match self {
            Request::CreateEntity { .. } => "create_entity",
            Request::CreateEntities { .. } => "create_entities",
            Request::GetEntity { .. } => "get_entity",
            Request::GetEntityAtVersion { .. } => "get_entity_at_version",
            Request::GetEntityVersions { .. } => "get_entity_versions",
            Request::ListEntities { .. } => "list_entities",
            Request::UpdateEntity { .. } => "update_entity",
            Request::ApplyRawPatch { .. } => "apply_raw_patch",
            Request::DiffEntities { .. } => "diff_entities",
            Request::DiffEntityVersions { .. } => "diff_entity_versions",
            Request::ListPatchHistory { .. } => "list_patch_history",
            Request::LatestVersion { .. } => "latest_version",
            Request::DeleteEntity { .. } => "delete_entity",
            Request::DeleteAllEntities => "delete_all_entities",
            Request::CreateBranch { .. } => "create_branch",
            Request::GetBranch { .. } => "get_branch",
            Request::DeleteBranch { .. } => "delete_branch",
            Request::DeleteAllBranches => "delete_all_branches",
            Request::ListBranches { .. } => "list_branches",
            Request::Metrics => "metrics",
        }
    }
}
