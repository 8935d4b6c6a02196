//! Durable patch store
//!
//! Every mutation is journaled before it becomes visible. Deletions are
//! journaled as purge markers; nothing already written is ever rewritten.
//! Opening the store replays the journal from the first frame and refuses
//! to start on any anomaly.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::journal::{replay_entries, JournalWriter};
use crate::observability::{log_event_with_fields, Event};

use super::backend::{EntitySelection, PatchStore};
use super::errors::StoreResult;
use super::ids::{BranchId, EntityId};
use super::index::PatchIndex;
use super::page::{Page, PageRequest};
use super::record::{EntityHistory, PatchDraft, PatchRecord};
use super::visibility::Visibility;

/// File name of the patch journal inside the data directory
pub const PATCH_JOURNAL_FILE: &str = "patches.log";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StoreEntry {
    Patch { record: PatchRecord },
    PurgeEntity { entity_id: EntityId },
    PurgeBranch { branch_id: BranchId },
    PurgeAllBranches,
    PurgeAll,
}

pub struct JournalStore {
    index: RwLock<PatchIndex>,
    writer: Mutex<JournalWriter>,
    clock: Arc<dyn Clock>,
    path: PathBuf,
}

impl JournalStore {
    /// Opens the journal under `data_dir`, replaying whatever it holds.
    pub fn open(data_dir: &Path, clock: Arc<dyn Clock>, fsync: bool) -> StoreResult<Self> {
        let path = data_dir.join(PATCH_JOURNAL_FILE);
        let path_text = path.display().to_string();
        log_event_with_fields(Event::JournalReplayBegin, &[("path", &path_text)]);

        let entries = replay_entries::<StoreEntry>(&path).map_err(|e| {
            log_event_with_fields(
                Event::JournalCorruption,
                &[("path", &path_text), ("error", &e.to_string())],
            );
            e
        })?;

        let mut index = PatchIndex::new();
        let replayed = entries.len();
        for (_, entry) in entries {
            apply_entry(&mut index, entry);
        }

        // Opening the writer scans the file once more for the next sequence.
        let writer = JournalWriter::open(&path, fsync)?;

        log_event_with_fields(
            Event::JournalReplayComplete,
            &[
                ("path", &path_text),
                ("entries", &replayed.to_string()),
                ("records", &index.record_count().to_string()),
            ],
        );

        Ok(Self {
            index: RwLock::new(index),
            writer: Mutex::new(writer),
            clock,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, PatchIndex> {
        self.index.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PatchIndex> {
        self.index.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Journals `entry` and then applies it, all under the index write lock
    /// so journal order equals stamp order.
    fn commit(&self, index: &mut PatchIndex, entry: StoreEntry) -> StoreResult<usize> {
        self.writer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .append_entry(&entry)?;
        Ok(apply_entry(index, entry))
    }
}

fn apply_entry(index: &mut PatchIndex, entry: StoreEntry) -> usize {
    match entry {
        StoreEntry::Patch { record } => {
            index.insert(record);
            1
        }
        StoreEntry::PurgeEntity { entity_id } => index.purge_entity(entity_id),
        StoreEntry::PurgeBranch { branch_id } => index.purge_branch(branch_id),
        StoreEntry::PurgeAllBranches => index.purge_all_branches(),
        StoreEntry::PurgeAll => index.purge_all(),
    }
}

impl PatchStore for JournalStore {
    fn append(&self, draft: PatchDraft) -> StoreResult<PatchRecord> {
        let mut index = self.write();
        let record = index.stamp(draft, self.clock.now());
        self.commit(&mut index, StoreEntry::Patch { record: record.clone() })?;
        Ok(record)
    }

    fn query(&self, entity: EntityId, visibility: &Visibility) -> StoreResult<Vec<PatchRecord>> {
        Ok(self.read().query(entity, visibility))
    }

    fn query_many(
        &self,
        selection: &EntitySelection,
        visibility: &Visibility,
        page: Option<PageRequest>,
    ) -> StoreResult<Page<EntityHistory>> {
        Ok(self.read().query_many(selection, visibility, page))
    }

    fn count_visible(&self, entity: EntityId, visibility: &Visibility) -> StoreResult<u64> {
        Ok(self.read().count_visible(entity, visibility))
    }

    fn contains_entity(&self, entity: EntityId) -> StoreResult<bool> {
        Ok(self.read().contains_entity(entity))
    }

    fn delete_entity(&self, entity: EntityId) -> StoreResult<usize> {
        let mut index = self.write();
        if !index.contains_entity(entity) {
            return Ok(0);
        }
        self.commit(&mut index, StoreEntry::PurgeEntity { entity_id: entity })
    }

    fn delete_branch(&self, branch: BranchId) -> StoreResult<usize> {
        let mut index = self.write();
        self.commit(&mut index, StoreEntry::PurgeBranch { branch_id: branch })
    }

    fn delete_all_branches(&self) -> StoreResult<usize> {
        let mut index = self.write();
        self.commit(&mut index, StoreEntry::PurgeAllBranches)
    }

    fn delete_all(&self) -> StoreResult<usize> {
        let mut index = self.write();
        if index.record_count() == 0 {
            return Ok(0);
        }
        self.commit(&mut index, StoreEntry::PurgeAll)
    }

    fn record_count(&self) -> usize {
        self.read().record_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::patch::{JsonPointer, Operation, Patch};
    use tempfile::TempDir;

    fn add_op(key: &str) -> Patch {
        Patch::from(vec![Operation::add(JsonPointer::root().key(key), 1)])
    }

    #[test]
    fn test_reopen_replays_records_and_purges() {
        let dir = TempDir::new().unwrap();
        let (kept, purged) = (EntityId::new(), EntityId::new());
        let branch = BranchId::new();
        {
            let store = JournalStore::open(dir.path(), Arc::new(SystemClock), true).unwrap();
            store.append(PatchDraft::new(kept, None, add_op("a"))).unwrap();
            store.append(PatchDraft::new(kept, Some(branch), add_op("b"))).unwrap();
            store.append(PatchDraft::new(purged, None, add_op("c"))).unwrap();
            store.delete_entity(purged).unwrap();
            store.delete_branch(branch).unwrap();
        }

        let store = JournalStore::open(dir.path(), Arc::new(SystemClock), true).unwrap();
        assert_eq!(store.record_count(), 1);
        assert!(!store.contains_entity(purged).unwrap());
        let history = store.query(kept, &Visibility::main(None)).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].operations, add_op("a"));
    }

    #[test]
    fn test_appends_after_reopen_sort_last() {
        let dir = TempDir::new().unwrap();
        let e = EntityId::new();
        let first = {
            let store = JournalStore::open(dir.path(), Arc::new(SystemClock), false).unwrap();
            store.append(PatchDraft::new(e, None, add_op("a"))).unwrap()
        };
        let store = JournalStore::open(dir.path(), Arc::new(SystemClock), false).unwrap();
        let second = store.append(PatchDraft::new(e, None, add_op("b"))).unwrap();
        assert!(second.sequence > first.sequence);
        assert_eq!(store.query(e, &Visibility::main(None)).unwrap().last(), Some(&second));
    }

    #[test]
    fn test_corrupt_journal_refuses_to_open() {
        let dir = TempDir::new().unwrap();
        {
            let store = JournalStore::open(dir.path(), Arc::new(SystemClock), true).unwrap();
            store.append(PatchDraft::new(EntityId::new(), None, add_op("a"))).unwrap();
        }
        let path = dir.path().join(PATCH_JOURNAL_FILE);
        let mut bytes = std::fs::read(&path).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0x20;
        std::fs::write(&path, bytes).unwrap();

        let err = JournalStore::open(dir.path(), Arc::new(SystemClock), true).err().unwrap();
        assert!(err.is_fatal());
        assert_eq!(err.code(), "PALIMPSEST_JOURNAL_CORRUPTION");
    }
}
