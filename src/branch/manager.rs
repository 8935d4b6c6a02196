use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::errors::{ServiceError, ServiceResult};
use crate::journal::{replay_entries, JournalWriter};
use crate::observability::{log_event_with_fields, Event};
use crate::store::{BranchId, Page, PageRequest, PatchStore, StoreError, Visibility};

/// File name of the branch journal inside the data directory
pub const BRANCH_JOURNAL_FILE: &str = "branches.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: BranchId,
    /// Default cutoff for main-timeline records seen through this branch
    pub anchor_as_of: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum BranchEntry {
    Created { branch: Branch },
    Deleted { branch_id: BranchId },
    Cleared,
}

/// Registry of live branches.
///
/// Deleting a branch also drops the records tagged with it from the patch
/// store; main-timeline records are never touched.
pub struct BranchManager {
    branches: RwLock<BTreeMap<BranchId, Branch>>,
    journal: Option<Mutex<JournalWriter>>,
    store: Arc<dyn PatchStore>,
    clock: Arc<dyn Clock>,
}

impl BranchManager {
    /// A registry that lives only in memory.
    pub fn new(store: Arc<dyn PatchStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            branches: RwLock::new(BTreeMap::new()),
            journal: None,
            store,
            clock,
        }
    }

    /// A registry journaled under `data_dir`, rebuilt from its journal.
    pub fn open(
        data_dir: &Path,
        store: Arc<dyn PatchStore>,
        clock: Arc<dyn Clock>,
        fsync: bool,
    ) -> ServiceResult<Self> {
        let path = data_dir.join(BRANCH_JOURNAL_FILE);
        let path_text = path.display().to_string();
        log_event_with_fields(Event::JournalReplayBegin, &[("path", &path_text)]);

        let entries = replay_entries::<BranchEntry>(&path).map_err(|e| {
            log_event_with_fields(
                Event::JournalCorruption,
                &[("path", &path_text), ("error", &e.to_string())],
            );
            StoreError::from(e)
        })?;

        let mut branches = BTreeMap::new();
        let replayed = entries.len();
        for (_, entry) in entries {
            match entry {
                BranchEntry::Created { branch } => {
                    branches.insert(branch.id, branch);
                }
                BranchEntry::Deleted { branch_id } => {
                    branches.remove(&branch_id);
                }
                BranchEntry::Cleared => branches.clear(),
            }
        }

        let writer = JournalWriter::open(&path, fsync).map_err(StoreError::from)?;
        log_event_with_fields(
            Event::JournalReplayComplete,
            &[
                ("path", &path_text),
                ("entries", &replayed.to_string()),
                ("branches", &branches.len().to_string()),
            ],
        );

        Ok(Self {
            branches: RwLock::new(branches),
            journal: Some(Mutex::new(writer)),
            store,
            clock,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<BranchId, Branch>> {
        self.branches.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<BranchId, Branch>> {
        self.branches.write().unwrap_or_else(|e| e.into_inner())
    }

    fn journal(&self, entry: &BranchEntry) -> ServiceResult<()> {
        if let Some(journal) = &self.journal {
            journal
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .append_entry(entry)
                .map_err(StoreError::from)?;
        }
        Ok(())
    }

    pub fn create_branch(&self, anchor_as_of: NaiveDateTime) -> ServiceResult<Branch> {
        let branch = Branch {
            id: BranchId::new(),
            anchor_as_of,
            created_at: self.clock.now(),
        };

        let mut branches = self.write();
        self.journal(&BranchEntry::Created {
            branch: branch.clone(),
        })?;
        branches.insert(branch.id, branch.clone());
        drop(branches);

        log_event_with_fields(
            Event::BranchCreated,
            &[
                ("branch_id", &branch.id.to_string()),
                ("anchor_as_of", &branch.anchor_as_of.to_string()),
            ],
        );
        Ok(branch)
    }

    pub fn get_branch(&self, id: BranchId) -> ServiceResult<Branch> {
        self.read()
            .get(&id)
            .cloned()
            .ok_or(ServiceError::BranchNotFound(id))
    }

    /// Deletes the branch and every record tagged with it.
    ///
    /// Returns the number of records dropped. Records go before the branch
    /// entry: the two live in separate journals, and a crash in between
    /// leaves an empty branch that can be deleted again, never tagged
    /// records without a branch.
    pub fn delete_branch(&self, id: BranchId) -> ServiceResult<usize> {
        let purged = {
            let mut branches = self.write();
            if !branches.contains_key(&id) {
                return Err(ServiceError::BranchNotFound(id));
            }
            let purged = self.store.delete_branch(id)?;
            self.journal(&BranchEntry::Deleted { branch_id: id })?;
            branches.remove(&id);
            purged
        };

        log_event_with_fields(
            Event::BranchDeleted,
            &[("branch_id", &id.to_string()), ("records", &purged.to_string())],
        );
        Ok(purged)
    }

    /// Deletes every branch and every tagged record.
    pub fn delete_all_branches(&self) -> ServiceResult<usize> {
        let (removed, purged) = {
            let mut branches = self.write();
            let purged = self.store.delete_all_branches()?;
            self.journal(&BranchEntry::Cleared)?;
            let removed = branches.len();
            branches.clear();
            (removed, purged)
        };

        log_event_with_fields(
            Event::BranchDeleted,
            &[("branches", &removed.to_string()), ("records", &purged.to_string())],
        );
        Ok(removed)
    }

    /// Branches created at or before `as_of`, newest first.
    pub fn list_branches(&self, page: PageRequest, as_of: Option<NaiveDateTime>) -> Page<Branch> {
        let mut listed: Vec<Branch> = self
            .read()
            .values()
            .filter(|b| as_of.map_or(true, |cutoff| b.created_at <= cutoff))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Page::slice(listed, Some(page))
    }

    pub fn branch_count(&self) -> usize {
        self.read().len()
    }

    /// The visibility of a read through `id`.
    ///
    /// An explicit cutoff bounds every record; without one, main-timeline
    /// records stop at the anchor and the branch's own records do not.
    pub fn visibility(&self, id: BranchId, as_of: Option<NaiveDateTime>) -> ServiceResult<Visibility> {
        let branch = self.get_branch(id)?;
        Ok(match as_of {
            Some(cutoff) => Visibility::branch(id, cutoff),
            None => Visibility::branch_default(id, branch.anchor_as_of),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::patch::Patch;
    use crate::store::{EntityId, MemoryPatchStore, PatchDraft};
    use chrono::{Duration, NaiveDate};
    use tempfile::TempDir;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn setup() -> (Arc<ManualClock>, Arc<MemoryPatchStore>, BranchManager) {
        let clock = Arc::new(ManualClock::new(start()));
        let store = Arc::new(MemoryPatchStore::new(clock.clone()));
        let manager = BranchManager::new(store.clone(), clock.clone());
        (clock, store, manager)
    }

    #[test]
    fn test_create_and_get() {
        let (_, _, manager) = setup();
        let branch = manager.create_branch(start()).unwrap();
        assert_eq!(manager.get_branch(branch.id).unwrap(), branch);
        assert!(matches!(
            manager.get_branch(BranchId::new()),
            Err(ServiceError::BranchNotFound(_))
        ));
    }

    #[test]
    fn test_delete_cascades_only_to_tagged_records() {
        let (_, store, manager) = setup();
        let branch = manager.create_branch(start()).unwrap();
        let e = EntityId::new();
        store.append(PatchDraft::new(e, None, Patch::new())).unwrap();
        store.append(PatchDraft::new(e, Some(branch.id), Patch::new())).unwrap();

        assert_eq!(manager.delete_branch(branch.id).unwrap(), 1);
        assert_eq!(store.record_count(), 1);
        assert!(matches!(
            manager.delete_branch(branch.id),
            Err(ServiceError::BranchNotFound(_))
        ));
    }

    #[test]
    fn test_list_filters_on_creation_time_newest_first() {
        let (clock, _, manager) = setup();
        let first = manager.create_branch(start()).unwrap();
        let cutoff = clock.advance(Duration::seconds(10));
        let second = manager.create_branch(start()).unwrap();
        clock.advance(Duration::seconds(10));
        let third = manager.create_branch(start()).unwrap();

        let all = manager.list_branches(PageRequest::new(0, 10), None);
        let ids: Vec<_> = all.items.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);

        let bounded = manager.list_branches(PageRequest::new(0, 10), Some(cutoff));
        assert_eq!(bounded.total_elements, 2);
    }

    #[test]
    fn test_visibility_defaults_to_anchor() {
        let (_, _, manager) = setup();
        let anchor = start() + Duration::seconds(30);
        let branch = manager.create_branch(anchor).unwrap();
        let vis = manager.visibility(branch.id, None).unwrap();
        assert_eq!(vis.main_cutoff(), Some(anchor));
        let explicit = manager.visibility(branch.id, Some(start())).unwrap();
        assert_eq!(explicit.main_cutoff(), Some(start()));
    }

    #[test]
    fn test_journaled_registry_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(start()));
        let store = Arc::new(MemoryPatchStore::new(clock.clone()));
        let (kept, dropped) = {
            let manager = BranchManager::open(dir.path(), store.clone(), clock.clone(), true).unwrap();
            let kept = manager.create_branch(start()).unwrap();
            let dropped = manager.create_branch(start()).unwrap();
            manager.delete_branch(dropped.id).unwrap();
            (kept, dropped)
        };

        let manager = BranchManager::open(dir.path(), store, clock, true).unwrap();
        assert_eq!(manager.get_branch(kept.id).unwrap(), kept);
        assert!(manager.get_branch(dropped.id).is_err());
        assert_eq!(manager.branch_count(), 1);
    }
}
