//! Request dispatch
//!
//! Parses one request, runs it against the [`DocumentService`] and encodes
//! the result. Error codes pass through unchanged from the subsystem that
//! raised them.

use serde::Serialize;
use serde_json::{json, Value};

use crate::observability::{log_event_with_fields, Event};
use crate::service::DocumentService;
use crate::store::PageRequest;

use super::errors::{ApiError, ApiResult};
use super::request::Request;
use super::response::Response;

pub struct ApiHandler {
    service: DocumentService,
    default_page_size: usize,
}

impl ApiHandler {
    pub fn new(service: DocumentService, default_page_size: usize) -> Self {
        Self {
            service,
            default_page_size,
        }
    }

    pub fn service(&self) -> &DocumentService {
        &self.service
    }

    /// Handle a raw JSON request line
    pub fn handle(&self, json_request: &str) -> Response {
        let result = Request::parse(json_request).and_then(|request| {
            let op = request.op();
            self.dispatch(request).map_err(|err| {
                if err.is_fatal() {
                    log_event_with_fields(
                        Event::RequestFailed,
                        &[("op", op), ("code", err.code()), ("message", err.message())],
                    );
                }
                err
            })
        });

        match result {
            Ok(data) => Response::success(data),
            Err(err) => Response::error(&err),
        }
    }

    /// Execute a parsed request
    pub fn dispatch(&self, request: Request) -> ApiResult<Value> {
        let service = &self.service;
        match request {
            Request::CreateEntity { document, branch_id } => match branch_id {
                Some(branch) => encode(service.create_entity_in_branch(document, branch)?),
                None => encode(service.create_entity(document)?),
            },
            Request::CreateEntities { documents } => encode(service.create_entities(documents)?),
            Request::GetEntity {
                entity_id,
                branch_id,
                as_of,
            } => match branch_id {
                Some(branch) => encode(service.get_entity_in_branch(entity_id, branch, as_of)?),
                None => encode(service.get_entity(entity_id, as_of)?),
            },
            Request::GetEntityAtVersion {
                entity_id,
                branch_id,
                version,
            } => match branch_id {
                Some(branch) => {
                    encode(service.get_entity_at_version_in_branch(entity_id, branch, version)?)
                }
                None => encode(service.get_entity_at_version(entity_id, version)?),
            },
            Request::GetEntityVersions {
                entity_id,
                branch_id,
                page,
                size,
            } => {
                // Without paging fields the whole version list is returned.
                let page = (page.is_some() || size.is_some()).then(|| self.page(page, size));
                match branch_id {
                    Some(branch) => {
                        encode(service.get_entity_versions_in_branch(entity_id, branch, page)?)
                    }
                    None => encode(service.get_entity_versions(entity_id, page)?),
                }
            }
            Request::ListEntities {
                branch_id,
                page,
                size,
                as_of,
                filters,
            } => {
                let page = self.page(page, size);
                match branch_id {
                    Some(branch) => encode(service.list_entities_in_branch(branch, page, as_of, &filters)?),
                    None => encode(service.list_entities(page, as_of, &filters)?),
                }
            }
            Request::UpdateEntity {
                entity_id,
                branch_id,
                document,
            } => match branch_id {
                Some(branch) => encode(service.update_entity_in_branch(entity_id, branch, document)?),
                None => encode(service.update_entity(entity_id, document)?),
            },
            Request::ApplyRawPatch {
                entity_id,
                branch_id,
                operations,
            } => match branch_id {
                Some(branch) => encode(service.apply_raw_patch_in_branch(entity_id, branch, operations)?),
                None => encode(service.apply_raw_patch(entity_id, operations)?),
            },
            Request::DiffEntities {
                entity_a,
                entity_b,
                as_of,
            } => Ok(service.diff_entities(entity_a, entity_b, as_of)?.to_value()),
            Request::DiffEntityVersions {
                entity_a,
                version_a,
                entity_b,
                version_b,
            } => Ok(service
                .diff_entity_versions(entity_a, version_a, entity_b, version_b)?
                .to_value()),
            Request::ListPatchHistory {
                entity_id,
                branch_id,
                page,
                size,
                as_of,
            } => {
                let page = self.page(page, size);
                match branch_id {
                    Some(branch) => {
                        encode(service.list_patch_history_in_branch(entity_id, branch, page, as_of)?)
                    }
                    None => encode(service.list_patch_history(entity_id, page, as_of)?),
                }
            }
            Request::LatestVersion {
                entity_id,
                branch_id,
            } => {
                let version = service.latest_version(entity_id, branch_id)?;
                Ok(json!({ "entityId": entity_id, "branchId": branch_id, "latestVersion": version }))
            }
            Request::DeleteEntity { entity_id } => {
                let removed = service.delete_entity(entity_id)?;
                Ok(json!({ "entityId": entity_id, "removedRecords": removed }))
            }
            Request::DeleteAllEntities => {
                let removed = service.delete_all_entities()?;
                Ok(json!({ "removedRecords": removed }))
            }
            Request::CreateBranch { anchor_as_of } => encode(service.create_branch(anchor_as_of)?),
            Request::GetBranch { branch_id } => encode(service.get_branch(branch_id)?),
            Request::DeleteBranch { branch_id } => {
                let removed = service.delete_branch(branch_id)?;
                Ok(json!({ "branchId": branch_id, "removedRecords": removed }))
            }
            Request::DeleteAllBranches => {
                let removed = service.delete_all_branches()?;
                Ok(json!({ "removedRecords": removed }))
            }
            Request::ListBranches { page, size, as_of } => {
                encode(service.list_branches(self.page(page, size), as_of))
            }
            Request::Metrics => encode(service.metrics()),
        }
    }

    fn page(&self, index: Option<usize>, size: Option<usize>) -> PageRequest {
        PageRequest::new(index.unwrap_or(0), size.unwrap_or(self.default_page_size))
    }
}

fn encode<T: Serialize>(value: T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::encoding_failed(e.to_string()))
}
