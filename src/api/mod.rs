//! Request layer
//!
//! One JSON request in, one JSON response out. Used by the `serve` and
//! `exec` commands.
//!
//! # Operations
//!
//! - create_entity, create_entities
//! - get_entity, get_entity_at_version, get_entity_versions, list_entities
//! - update_entity, apply_raw_patch
//! - diff_entities, diff_entity_versions
//! - list_patch_history, latest_version
//! - delete_entity, delete_all_entities
//! - create_branch, get_branch, delete_branch, delete_all_branches, list_branches
//! - metrics

mod errors;
mod handler;
mod request;
mod response;

pub use errors::{ApiError, ApiErrorCode, ApiResult};
pub use handler::ApiHandler;
pub use request::Request;
pub use response::Response;
