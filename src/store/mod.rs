//! Patch record storage
//!
//! Records are immutable once stamped. A store only ever appends records
//! or drops whole groups of them (one entity, one branch, everything).
//!
//! Two implementations share one in-memory index:
//! - [`MemoryPatchStore`]: volatile
//! - [`JournalStore`]: every mutation journaled to `patches.log` first

mod backend;
mod errors;
mod ids;
mod index;
mod journaled;
mod memory;
mod page;
mod record;
mod visibility;

pub use backend::{EntitySelection, PatchStore};
pub use errors::{StoreError, StoreResult};
pub use ids::{BranchId, EntityId, RecordId};
pub use journaled::{JournalStore, PATCH_JOURNAL_FILE};
pub use memory::MemoryPatchStore;
pub use page::{Page, PageRequest};
pub use record::{EntityHistory, PatchDraft, PatchRecord};
pub use visibility::Visibility;
