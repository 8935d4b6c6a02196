//! Write path
//!
//! Every mutation of an existing entity runs under the lock of its
//! `(entity, branch)` key: fold the current state, compute the change,
//! append it, release. Purges wait for every in-flight write and hold off
//! new ones until they finish. Readers never take these locks.

mod coordinator;
mod lock;

pub use coordinator::{WriteCoordinator, WriteOutcome};
pub use lock::{LockKey, LockTable, PurgeGuard, WriteGuard};
