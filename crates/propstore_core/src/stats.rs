//! Store statistics.
//!
//! Counters for monitoring a [`TransactionalStore`](crate::TransactionalStore).
//!
//! ```rust
//! use propstore_core::{PropertyKey, TransactionalStore};
//!
//! let store = TransactionalStore::new();
//! let key: PropertyKey<u8> = PropertyKey::new();
//! let txn = store.create_transaction();
//! txn.set(&key, 1).unwrap();
//! txn.commit().unwrap();
//!
//! let stats = store.stats();
//! assert_eq!(stats.writes, 1);
//! assert_eq!(stats.transactions_committed, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Store statistics.
///
/// All counters are atomic and can be read while operations are in progress.
/// Values are monotonically increasing.
#[derive(Debug, Default)]
pub struct StoreStats {
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,

    transactions_started: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
    transactions_expired: AtomicU64,

    drains: AtomicU64,
    entries_applied: AtomicU64,
    entries_discarded: AtomicU64,
}

impl StoreStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_start(&self) {
        self.transactions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_commit(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_rollback(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_expired(&self) {
        self.transactions_expired.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one drain pass and the entries it resolved.
    pub(crate) fn record_drain(&self, applied: u64, discarded: u64) {
        self.drains.fetch_add(1, Ordering::Relaxed);
        self.entries_applied.fetch_add(applied, Ordering::Relaxed);
        self.entries_discarded.fetch_add(discarded, Ordering::Relaxed);
    }

    /// Returns the total number of reads.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the total number of buffered set operations.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the total number of buffered delete operations.
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Returns the total number of transactions created.
    pub fn transactions_started(&self) -> u64 {
        self.transactions_started.load(Ordering::Relaxed)
    }

    /// Returns the total number of transactions committed.
    pub fn transactions_committed(&self) -> u64 {
        self.transactions_committed.load(Ordering::Relaxed)
    }

    /// Returns the total number of transactions rolled back.
    pub fn transactions_rolled_back(&self) -> u64 {
        self.transactions_rolled_back.load(Ordering::Relaxed)
    }

    /// Returns the total number of transactions expired by the lease.
    pub fn transactions_expired(&self) -> u64 {
        self.transactions_expired.load(Ordering::Relaxed)
    }

    /// Returns the total number of drain passes.
    pub fn drains(&self) -> u64 {
        self.drains.load(Ordering::Relaxed)
    }

    /// Returns the total number of log entries merged into the durable map.
    pub fn entries_applied(&self) -> u64 {
        self.entries_applied.load(Ordering::Relaxed)
    }

    /// Returns the total number of log entries discarded.
    pub fn entries_discarded(&self) -> u64 {
        self.entries_discarded.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reads: self.reads(),
            writes: self.writes(),
            deletes: self.deletes(),
            transactions_started: self.transactions_started(),
            transactions_committed: self.transactions_committed(),
            transactions_rolled_back: self.transactions_rolled_back(),
            transactions_expired: self.transactions_expired(),
            drains: self.drains(),
            entries_applied: self.entries_applied(),
            entries_discarded: self.entries_discarded(),
        }
    }
}

/// A point-in-time copy of [`StoreStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Total number of reads.
    pub reads: u64,
    /// Total number of buffered set operations.
    pub writes: u64,
    /// Total number of buffered delete operations.
    pub deletes: u64,
    /// Total number of transactions created.
    pub transactions_started: u64,
    /// Total number of transactions committed.
    pub transactions_committed: u64,
    /// Total number of transactions rolled back.
    pub transactions_rolled_back: u64,
    /// Total number of transactions expired by the lease.
    pub transactions_expired: u64,
    /// Total number of drain passes.
    pub drains: u64,
    /// Total number of log entries merged into the durable map.
    pub entries_applied: u64,
    /// Total number of log entries discarded.
    pub entries_discarded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = StoreStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_transactions() {
        let stats = StoreStats::new();

        stats.record_transaction_start();
        stats.record_transaction_start();
        stats.record_transaction_start();
        stats.record_transaction_commit();
        stats.record_transaction_rollback();
        stats.record_transaction_expired();

        let snap = stats.snapshot();
        assert_eq!(snap.transactions_started, 3);
        assert_eq!(snap.transactions_committed, 1);
        assert_eq!(snap.transactions_rolled_back, 1);
        assert_eq!(snap.transactions_expired, 1);
    }

    #[test]
    fn record_drain_accumulates() {
        let stats = StoreStats::new();
        stats.record_drain(3, 1);
        stats.record_drain(0, 2);

        assert_eq!(stats.drains(), 2);
        assert_eq!(stats.entries_applied(), 3);
        assert_eq!(stats.entries_discarded(), 3);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(StoreStats::new());
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_read();
                        s.record_write();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.reads(), 1000);
        assert_eq!(stats.writes(), 1000);
    }
}
