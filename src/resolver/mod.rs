//! Turning read requests into folded documents
//!
//! A read names an entity (or all of them), an optional branch, and either
//! an as-of cutoff or an ordinal version. The resolver picks the visible
//! records, folds them, and reports where the result sits in the entity's
//! history.

mod filter;
mod versions;

pub use filter::{matches_all, EntityFilter, FilterConstraint, MatchMode};
pub use versions::{EntityVersion, Resolution, VersionResolver};
