//! Stress tests for the property stores.
//!
//! These tests verify behavior under heavy load and concurrent access.

use crate::fixtures::int_keys;
use propstore_core::{
    PropertyContext, PropertyKey, Store, TransactionSequencer, TransactionalStore,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Combines per-thread results into one, keeping the longest duration.
    pub fn merge(results: impl IntoIterator<Item = Self>) -> Self {
        let (successful, failed, duration) = results.into_iter().fold(
            (0, 0, Duration::ZERO),
            |(s, f, d), r| (s + r.successful_ops, f + r.failed_ops, d.max(r.duration)),
        );
        Self::new(successful, failed, duration)
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of distinct keys.
    pub key_count: usize,
    /// Writes per transaction.
    pub writes_per_transaction: usize,
    /// Every n-th transaction is rolled back instead of committed. `0`
    /// commits everything.
    pub rollback_every: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            key_count: 64,
            writes_per_transaction: 8,
            rollback_every: 5,
        }
    }
}

impl StressConfig {
    /// A small configuration suitable for unit tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            operations: 500,
            threads: 4,
            key_count: 16,
            writes_per_transaction: 4,
            rollback_every: 3,
        }
    }

    fn should_roll_back(&self, n: usize) -> bool {
        self.rollback_every != 0 && n % self.rollback_every == self.rollback_every - 1
    }
}

fn spawn_workers<F>(config: &StressConfig, work: F) -> StressTestResult
where
    F: Fn(usize) -> StressTestResult + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let handles: Vec<_> = (0..config.threads)
        .map(|worker| {
            let work = Arc::clone(&work);
            thread::spawn(move || work(worker))
        })
        .collect();

    StressTestResult::merge(
        handles
            .into_iter()
            .map(|h| h.join().expect("Stress worker panicked")),
    )
}

/// Concurrent writers on a plain [`Store`].
pub fn stress_mutable_store(store: Arc<Store>, config: &StressConfig) -> StressTestResult {
    let keys = Arc::new(int_keys(config.key_count));
    let operations = config.operations;

    spawn_workers(config, move |worker| {
        let start = Instant::now();
        for i in 0..operations {
            let key = &keys[(worker + i) % keys.len()];
            store.set(key, i as i64);
            let _ = store.try_get(key);
        }
        StressTestResult::new(operations, 0, start.elapsed())
    })
}

/// Concurrent transactions against one [`TransactionalStore`].
///
/// Each thread creates, fills and completes its own transactions. A
/// transaction counts as failed if any of its calls returned an error.
pub fn stress_concurrent_transactions(
    store: &TransactionalStore,
    keys: &[PropertyKey<i64>],
    config: &StressConfig,
) -> StressTestResult {
    let store = store.clone();
    let keys = Arc::new(keys.to_vec());
    let cfg = config.clone();
    let transactions = config.operations / config.writes_per_transaction.max(1);

    spawn_workers(config, move |worker| {
        let start = Instant::now();
        let mut successful = 0usize;
        let mut failed = 0usize;

        for n in 0..transactions {
            let txn = store.create_transaction();
            let mut ok = true;
            for w in 0..cfg.writes_per_transaction {
                let key = &keys[(worker * 31 + n * 7 + w) % keys.len()];
                ok &= txn.set(key, (worker * 1_000_000 + n) as i64).is_ok();
            }
            let completed = if cfg.should_roll_back(n) {
                txn.rollback()
            } else {
                txn.commit()
            };
            ok &= completed.is_ok();

            if ok {
                successful += 1;
            } else {
                failed += 1;
            }
        }

        StressTestResult::new(successful, failed, start.elapsed())
    })
}

/// Concurrent readers while one thread keeps committing.
pub fn stress_reads_during_commits(
    store: &TransactionalStore,
    config: &StressConfig,
) -> StressTestResult {
    let keys = Arc::new(int_keys(config.key_count));
    let writer_store = store.clone();
    let writer_keys = Arc::clone(&keys);
    let operations = config.operations;

    let writer = thread::spawn(move || {
        for i in 0..operations {
            let txn = writer_store.create_transaction();
            let key = &writer_keys[i % writer_keys.len()];
            let _ = txn.set(key, i as i64);
            let _ = txn.commit();
        }
    });

    let store = store.clone();
    let result = spawn_workers(config, move |worker| {
        let start = Instant::now();
        let mut successful = 0usize;
        let mut failed = 0usize;
        for i in 0..operations {
            let key = &keys[(worker + i) % keys.len()];
            // Every committed value is non-negative; anything else is torn.
            match store.try_get(key) {
                Some(value) if value < 0 => failed += 1,
                _ => successful += 1,
            }
            if i % 64 == 0 {
                let _ = store.snapshot();
            }
        }
        StressTestResult::new(successful, failed, start.elapsed())
    });

    writer.join().expect("Writer thread panicked");
    result
}

/// Many threads sharing one [`TransactionSequencer`].
///
/// Threads interleave writes and completions; which writes land in which
/// transaction depends on scheduling, but every batch is resolved.
pub fn stress_shared_sequencer(
    sequencer: Arc<TransactionSequencer>,
    config: &StressConfig,
) -> StressTestResult {
    let keys = Arc::new(int_keys(config.key_count));
    let cfg = config.clone();

    spawn_workers(config, move |worker| {
        let start = Instant::now();
        let mut successful = 0usize;
        let mut failed = 0usize;
        for i in 0..cfg.operations {
            let key = &keys[(worker + i) % keys.len()];
            let result = if i % cfg.writes_per_transaction.max(1) == 0 {
                if cfg.should_roll_back(i) {
                    sequencer.rollback()
                } else {
                    sequencer.commit()
                }
            } else {
                sequencer.set(key, i as i64)
            };
            match result {
                Ok(()) => successful += 1,
                Err(_) => failed += 1,
            }
        }
        StressTestResult::new(successful, failed, start.elapsed())
    })
}
