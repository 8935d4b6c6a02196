//! Operational counters
//!
//! - Counters only, monotonic, reset on process start
//! - Relaxed atomics: exact totals, no cross-counter consistency

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    patches_appended: AtomicU64,
    noop_writes: AtomicU64,
    folds: AtomicU64,
    patches_folded: AtomicU64,
    write_contentions: AtomicU64,
    patches_rejected: AtomicU64,
    purges: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_patches_appended(&self) {
        self.patches_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_noop_writes(&self) {
        self.noop_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one fold over `patches` records.
    pub fn record_fold(&self, patches: usize) {
        self.folds.fetch_add(1, Ordering::Relaxed);
        self.patches_folded.fetch_add(patches as u64, Ordering::Relaxed);
    }

    pub fn increment_write_contentions(&self) {
        self.write_contentions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_patches_rejected(&self) {
        self.patches_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_purges(&self) {
        self.purges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn patches_appended(&self) -> u64 {
        self.patches_appended.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            patches_appended: self.patches_appended.load(Ordering::Relaxed),
            noop_writes: self.noop_writes.load(Ordering::Relaxed),
            folds: self.folds.load(Ordering::Relaxed),
            patches_folded: self.patches_folded.load(Ordering::Relaxed),
            write_contentions: self.write_contentions.load(Ordering::Relaxed),
            patches_rejected: self.patches_rejected.load(Ordering::Relaxed),
            purges: self.purges.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub patches_appended: u64,
    pub noop_writes: u64,
    pub folds: u64,
    pub patches_folded: u64,
    pub write_contentions: u64,
    pub patches_rejected: u64,
    pub purges: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_registry_is_zero() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.patches_appended, 0);
        assert_eq!(snapshot.folds, 0);
    }

    #[test]
    fn test_record_fold_counts_patches() {
        let metrics = MetricsRegistry::new();
        metrics.record_fold(3);
        metrics.record_fold(2);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.folds, 2);
        assert_eq!(snapshot.patches_folded, 5);
    }

    #[test]
    fn test_thread_safety() {
        let metrics = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.increment_patches_appended();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.patches_appended(), 800);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = MetricsRegistry::new();
        metrics.increment_purges();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["purges"], 1);
    }
}
