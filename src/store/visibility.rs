//! Which records a read may see
//!
//! A main-timeline read sees untagged records up to its cutoff. A branch
//! read additionally sees the records tagged with its branch. With an
//! explicit cutoff both kinds are bounded by it; with the branch defaults,
//! untagged records stop at the branch anchor while the branch's own
//! records stay unbounded, so a branch always sees its own writes.

use chrono::NaiveDateTime;

use super::ids::BranchId;
use super::record::PatchRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    branch: Option<BranchId>,
    main_cutoff: Option<NaiveDateTime>,
    branch_cutoff: Option<NaiveDateTime>,
}

impl Visibility {
    /// Main timeline, optionally bounded (inclusive).
    pub fn main(cutoff: Option<NaiveDateTime>) -> Self {
        Self {
            branch: None,
            main_cutoff: cutoff,
            branch_cutoff: None,
        }
    }

    /// Branch timeline with one cutoff for tagged and untagged records.
    pub fn branch(branch: BranchId, cutoff: NaiveDateTime) -> Self {
        Self {
            branch: Some(branch),
            main_cutoff: Some(cutoff),
            branch_cutoff: Some(cutoff),
        }
    }

    /// Branch timeline when the caller gives no cutoff.
    pub fn branch_default(branch: BranchId, anchor: NaiveDateTime) -> Self {
        Self {
            branch: Some(branch),
            main_cutoff: Some(anchor),
            branch_cutoff: None,
        }
    }

    /// Every main-timeline record plus every record tagged with `branch`.
    pub fn branch_unbounded(branch: BranchId) -> Self {
        Self {
            branch: Some(branch),
            main_cutoff: None,
            branch_cutoff: None,
        }
    }

    pub fn branch_id(&self) -> Option<BranchId> {
        self.branch
    }

    /// Bound on untagged records.
    pub fn main_cutoff(&self) -> Option<NaiveDateTime> {
        self.main_cutoff
    }

    pub fn admits(&self, record: &PatchRecord) -> bool {
        match record.branch_id {
            None => within(record.created_at, self.main_cutoff),
            Some(tag) => self.branch == Some(tag) && within(record.created_at, self.branch_cutoff),
        }
    }
}

fn within(at: NaiveDateTime, cutoff: Option<NaiveDateTime>) -> bool {
    cutoff.map_or(true, |c| at <= c)
}
