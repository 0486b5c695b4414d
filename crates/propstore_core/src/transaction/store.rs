//! The transactional property store.

use crate::change_feed::{ChangeEvent, ChangeFeed};
use crate::config::StoreConfig;
use crate::error::CoreResult;
use crate::property::{ErasedKey, PropertyContext, PropertyKey, Snapshot, Value};
use crate::stats::{StatsSnapshot, StoreStats};
use crate::store::PropertyMap;
use crate::transaction::handle::Transaction;
use crate::transaction::log::{ChangeLog, Overlay, Resolved, Slot};
use crate::transaction::state::{TransactionState, TxnShared};
use crate::types::{SequenceNumber, TransactionId};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, trace};

/// A property store whose writes are batched into transactions.
///
/// The store keeps three structures behind one mutex:
/// - the **durable map**, the committed state
/// - the **change log**, pending writes tagged with their transaction
/// - the **overlay**, the latest still-relevant pending value per property
///
/// ## Visibility
///
/// Writes are visible to every reader the moment they are issued, including
/// other transactions (read-uncommitted). There is no snapshot isolation.
///
/// ## Ordering
///
/// Durable effects are applied in transaction creation order. A committed
/// transaction stays in the change log until every transaction created before
/// it has completed, even if the two touch unrelated properties. An active
/// transaction that is never completed therefore stalls all later durable
/// effects; see [`StoreConfig::transaction_lease`] for an opt-in bound.
///
/// `TransactionalStore` is a cheap handle: clones share the same store.
///
/// # Example
///
/// ```rust
/// use propstore_core::{PropertyKey, TransactionalStore};
///
/// let store = TransactionalStore::new();
/// let width = PropertyKey::with_default(800u32);
///
/// let txn = store.create_transaction();
/// txn.set(&width, 1024).unwrap();
/// assert_eq!(store.try_get(&width), Some(1024)); // visible before commit
/// txn.commit().unwrap();
///
/// assert_eq!(store.durable_snapshot().get(&width), Some(1024));
/// ```
#[derive(Clone)]
pub struct TransactionalStore {
    shared: Arc<StoreShared>,
}

struct StoreShared {
    config: StoreConfig,
    state: Mutex<StoreState>,
    stats: StoreStats,
    feed: ChangeFeed,
}

struct StoreState {
    durable: PropertyMap,
    log: ChangeLog,
    overlay: Overlay,
    next_txid: u64,
    applied_seq: SequenceNumber,
}

/// What one drain pass did.
#[derive(Debug, Default)]
struct DrainReport {
    events: Vec<ChangeEvent>,
    applied: u64,
    discarded: u64,
    expired: usize,
}

impl StoreState {
    fn lookup(&self, key: &ErasedKey) -> Option<Value> {
        match self.overlay.get(&key.id()) {
            Some((_, slot)) => slot.value().cloned(),
            None => self.durable.get(key).cloned(),
        }
    }

    /// Everything a reader can currently see.
    fn visible(&self) -> Snapshot {
        let durable = self
            .durable
            .iter()
            .filter(|(key, _)| !self.overlay.contains_key(&key.id()))
            .map(|(key, value)| (key.clone(), value.clone()));
        let pending = self
            .overlay
            .values()
            .filter_map(|(key, slot)| slot.value().map(|value| (key.clone(), value.clone())));
        durable.chain(pending).collect()
    }

    fn apply(&mut self, resolved: Resolved, report: &mut DrainReport) {
        trace!(
            txn = %resolved.id,
            outcome = ?resolved.outcome,
            writes = resolved.writes.len(),
            "transaction resolved"
        );
        match resolved.outcome {
            TransactionState::Committed => {
                self.applied_seq = self.applied_seq.next();
                let seq = self.applied_seq;
                for (key, slot) in resolved.writes {
                    report.applied += 1;
                    match slot {
                        Slot::Value(value) => {
                            let event = match self.durable.insert(&key, value.clone()) {
                                None => ChangeEvent::insert(seq, key, value),
                                Some(_) => ChangeEvent::update(seq, key, value),
                            };
                            report.events.push(event);
                        }
                        Slot::Tombstone => {
                            if self.durable.remove(&key).is_some() {
                                report.events.push(ChangeEvent::delete(seq, key));
                            }
                        }
                    }
                }
            }
            TransactionState::Expired => {
                report.expired += 1;
                report.discarded += resolved.writes.len() as u64;
            }
            TransactionState::RolledBack | TransactionState::Active => {
                report.discarded += resolved.writes.len() as u64;
            }
        }
    }
}

impl TransactionalStore {
    /// Creates an empty store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates an empty store.
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        let feed = ChangeFeed::with_max_history(config.change_feed_history);
        Self {
            shared: Arc::new(StoreShared {
                config,
                state: Mutex::new(StoreState {
                    durable: PropertyMap::new(),
                    log: ChangeLog::new(),
                    overlay: Overlay::new(),
                    next_txid: 0,
                    applied_seq: SequenceNumber::new(0),
                }),
                stats: StoreStats::new(),
                feed,
            }),
        }
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// Starts a new transaction.
    ///
    /// The transaction takes its place in the durable ordering now; it
    /// writes nothing to the change log until its first `set` or `delete`.
    pub fn create_transaction(&self) -> Transaction {
        let txn = {
            let mut state = self.shared.state.lock();
            state.next_txid += 1;
            let txn = Arc::new(TxnShared::new(TransactionId::new(state.next_txid)));
            state.log.register(Arc::clone(&txn));
            txn
        };
        self.shared.stats.record_transaction_start();
        debug!(txn = %txn.id(), "transaction created");
        Transaction::new(txn, self.clone())
    }

    /// Reads a typed value: pending writes first, then committed state.
    pub fn try_get<T: Any + Send + Sync + Clone>(&self, key: &PropertyKey<T>) -> Option<T> {
        key.try_get(self)
    }

    /// Copies the committed state only, ignoring pending writes.
    #[must_use]
    pub fn durable_snapshot(&self) -> Snapshot {
        self.shared.state.lock().durable.snapshot()
    }

    /// Returns the number of writes still in the change log.
    #[must_use]
    pub fn pending_entries(&self) -> usize {
        self.shared.state.lock().log.len()
    }

    /// Returns the number of transactions not yet drained.
    #[must_use]
    pub fn outstanding_transactions(&self) -> usize {
        self.shared.state.lock().log.outstanding()
    }

    /// Runs a drain without completing a transaction.
    ///
    /// Only useful with a configured lease: a head transaction older than the
    /// lease is expired and its successors are applied. Returns the number of
    /// transactions expired.
    pub fn reap_expired(&self) -> usize {
        let mut state = self.shared.state.lock();
        self.drain_locked(&mut state)
    }

    /// Subscribes to durable changes.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        self.shared.feed.subscribe()
    }

    /// Returns the change feed.
    #[must_use]
    pub fn change_feed(&self) -> &ChangeFeed {
        &self.shared.feed
    }

    /// Returns a copy of the store counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Buffers one write on behalf of `txn`.
    pub(crate) fn write(&self, txn: &Arc<TxnShared>, key: &ErasedKey, slot: Slot) -> CoreResult<()> {
        let mut state = self.shared.state.lock();
        txn.ensure_active()?;

        match &slot {
            Slot::Value(_) => self.shared.stats.record_write(),
            Slot::Tombstone => self.shared.stats.record_delete(),
        }
        let seq = state.log.append(txn, key.clone(), slot.clone());
        state.overlay.insert(key.id(), (key.clone(), slot));
        trace!(txn = %txn.id(), %seq, property = %key, "write buffered");
        Ok(())
    }

    /// Completes `txn` with `outcome` and drains the log.
    pub(crate) fn complete(&self, txn: &TxnShared, outcome: TransactionState) -> CoreResult<()> {
        let mut state = self.shared.state.lock();
        txn.complete(outcome)?;

        match outcome {
            TransactionState::Committed => self.shared.stats.record_transaction_commit(),
            TransactionState::RolledBack => self.shared.stats.record_transaction_rollback(),
            TransactionState::Active | TransactionState::Expired => {}
        }
        debug!(txn = %txn.id(), ?outcome, "transaction completed");

        self.drain_locked(&mut state);
        Ok(())
    }

    /// Drains the log and rebuilds the overlay. Returns the number of
    /// transactions expired by the lease.
    ///
    /// Events are emitted before the lock is released so that concurrent
    /// drains cannot reorder them.
    fn drain_locked(&self, state: &mut StoreState) -> usize {
        let mut report = DrainReport::default();
        for resolved in state.log.drain(self.shared.config.transaction_lease) {
            state.apply(resolved, &mut report);
        }
        state.overlay = state.log.overlay();

        for _ in 0..report.expired {
            self.shared.stats.record_transaction_expired();
        }
        self.shared.stats.record_drain(report.applied, report.discarded);
        trace!(
            applied = report.applied,
            discarded = report.discarded,
            pending = state.log.len(),
            outstanding = state.log.outstanding(),
            "drain finished"
        );

        self.shared.feed.emit_batch(report.events);
        report.expired
    }
}

impl Default for TransactionalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyContext for TransactionalStore {
    fn try_get_value(&self, key: &ErasedKey) -> Option<Value> {
        self.shared.stats.record_read();
        self.shared.state.lock().lookup(key)
    }

    fn properties(&self) -> Vec<ErasedKey> {
        self.shared.state.lock().visible().properties()
    }

    fn snapshot(&self) -> Snapshot {
        self.shared.state.lock().visible()
    }
}

impl std::fmt::Debug for TransactionalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("TransactionalStore")
            .field("durable", &state.durable.len())
            .field("pending_entries", &state.log.len())
            .field("outstanding", &state.log.outstanding())
            .field("applied_seq", &state.applied_seq)
            .finish_non_exhaustive()
    }
}
