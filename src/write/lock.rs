//! Per-key writer exclusion with a bounded wait
//!
//! Each key gets its own slot, created on first use and dropped when no
//! writer holds or waits on it. Writers on different keys never touch the
//! same slot; the table mutex is held only to find or retire a slot.
//!
//! Purges exclude every writer at once: a writer holds the purge gate
//! shared for as long as it holds its key, a purge holds it exclusively.
//! A writer therefore never appends onto history a purge has removed
//! underneath it.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use crate::errors::{ServiceError, ServiceResult};
use crate::store::{BranchId, EntityId};

/// What a writer locks: one entity on one timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockKey {
    pub entity_id: EntityId,
    pub branch_id: Option<BranchId>,
}

impl LockKey {
    pub fn new(entity_id: EntityId, branch_id: Option<BranchId>) -> Self {
        Self {
            entity_id,
            branch_id,
        }
    }
}

#[derive(Default)]
struct Slot {
    held: Mutex<bool>,
    released: Condvar,
}

struct TableEntry {
    slot: Arc<Slot>,
    /// Writers holding or waiting on the slot
    users: usize,
}

pub struct LockTable {
    slots: Mutex<HashMap<LockKey, TableEntry>>,
    timeout: Duration,
    purge: RwLock<()>,
}

impl LockTable {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            timeout,
            purge: RwLock::new(()),
        }
    }

    /// Blocks until `key` is free or the timeout passes.
    ///
    /// Waits without a bound for a running purge to finish first.
    pub fn acquire(&self, key: LockKey) -> ServiceResult<WriteGuard<'_>> {
        let shared = self.purge.read().unwrap_or_else(|e| e.into_inner());
        let slot = self.enter(key);
        let started = Instant::now();

        let mut held = slot.held.lock().unwrap_or_else(|e| e.into_inner());
        while *held {
            let remaining = self.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                drop(held);
                self.leave(key);
                return Err(ServiceError::WriteContention {
                    entity_id: key.entity_id,
                    branch_id: key.branch_id,
                    waited: started.elapsed(),
                });
            }
            held = slot
                .released
                .wait_timeout(held, remaining)
                .unwrap_or_else(|e| e.into_inner())
                .0;
        }
        *held = true;
        drop(held);

        Ok(WriteGuard {
            table: self,
            key,
            slot,
            _shared: shared,
        })
    }

    /// Waits until no writer holds a key, then keeps all of them out.
    pub fn exclusive(&self) -> PurgeGuard<'_> {
        PurgeGuard {
            _held: self.purge.write().unwrap_or_else(|e| e.into_inner()),
        }
    }

    fn enter(&self, key: LockKey) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let entry = slots.entry(key).or_insert_with(|| TableEntry {
            slot: Arc::new(Slot::default()),
            users: 0,
        });
        entry.users += 1;
        Arc::clone(&entry.slot)
    }

    fn leave(&self, key: LockKey) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = slots.get_mut(&key) {
            entry.users -= 1;
            if entry.users == 0 {
                slots.remove(&key);
            }
        }
    }

    /// Number of keys currently held or waited on.
    pub fn active_keys(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Exclusive hold on one key. Released on drop.
pub struct WriteGuard<'a> {
    table: &'a LockTable,
    key: LockKey,
    slot: Arc<Slot>,
    _shared: RwLockReadGuard<'a, ()>,
}

/// Exclusion of every writer. Released on drop.
pub struct PurgeGuard<'a> {
    _held: RwLockWriteGuard<'a, ()>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        *self.slot.held.lock().unwrap_or_else(|e| e.into_inner()) = false;
        self.slot.released.notify_one();
        self.table.leave(self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_second_writer_times_out() {
        let table = LockTable::new(Duration::from_millis(50));
        let key = LockKey::new(EntityId::new(), None);
        let _held = table.acquire(key).unwrap();

        let err = table.acquire(key).err().unwrap();
        match err {
            ServiceError::WriteContention { waited, .. } => {
                assert!(waited >= Duration::from_millis(50))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_distinct_keys_do_not_block() {
        let table = LockTable::new(Duration::from_millis(10));
        let entity = EntityId::new();
        let _main = table.acquire(LockKey::new(entity, None)).unwrap();
        let _branch = table.acquire(LockKey::new(entity, Some(BranchId::new()))).unwrap();
        let _other = table.acquire(LockKey::new(EntityId::new(), None)).unwrap();
        assert_eq!(table.active_keys(), 3);
    }

    #[test]
    fn test_release_wakes_waiter_and_retires_slot() {
        let table = Arc::new(LockTable::new(Duration::from_secs(5)));
        let key = LockKey::new(EntityId::new(), None);
        let guard = table.acquire(key).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                tx.send(()).unwrap();
                let _g = table.acquire(key).unwrap();
            })
        };
        rx.recv().unwrap();
        thread::sleep(Duration::from_millis(20));
        drop(guard);
        waiter.join().unwrap();

        assert_eq!(table.active_keys(), 0);
    }

    #[test]
    fn test_purge_waits_for_writers_and_blocks_new_ones() {
        let table = Arc::new(LockTable::new(Duration::from_secs(5)));
        let key = LockKey::new(EntityId::new(), None);
        let guard = table.acquire(key).unwrap();

        let (tx, rx) = mpsc::channel();
        let purger = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                let _purge = table.exclusive();
                tx.send("purged").unwrap();
                thread::sleep(Duration::from_millis(50));
            })
        };

        thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err());
        drop(guard);
        assert_eq!(rx.recv().unwrap(), "purged");

        // A writer arriving during the purge proceeds after it.
        let _again = table.acquire(key).unwrap();
        purger.join().unwrap();
    }
}
