//! JSON Patch (RFC 6902) vocabulary for palimpsest
//!
//! Every stored change is a [`Patch`]: an ordered list of [`Operation`]s
//! addressed by [`JsonPointer`] paths (RFC 6901).
//!
//! # Guarantees
//!
//! - Operations are applied strictly in order
//! - [`apply_patch`] is all-or-nothing: a failing operation leaves the
//!   input document untouched and reports the failing operation index
//! - Nothing is skipped: a missing target or a failed `test` is an error

mod apply;
mod errors;
mod operation;
mod pointer;

pub use apply::{apply_patch, apply_patch_in_place};
pub use errors::{PatchApplyError, PatchFailure, PointerError};
pub use operation::{Operation, Patch};
pub use pointer::JsonPointer;
