//! Branches: alternate timelines over the same records
//!
//! A branch copies nothing. It is an id that write operations can tag
//! records with, plus an anchor instant that bounds how much of the main
//! timeline a branch read inherits when the caller gives no cutoff.

mod manager;

pub use manager::{Branch, BranchManager, BRANCH_JOURNAL_FILE};
