//! The change log shared by all transactions of one store.
//!
//! Entries are appended in issue order. Resolution happens per transaction in
//! creation order: a transaction's entries leave the log only once every
//! transaction created before it has completed.

use crate::property::{ErasedKey, Value};
use crate::transaction::state::{TransactionState, TxnShared};
use crate::types::{PropertyId, SequenceNumber, TransactionId};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// A pending write: a value, or a deletion marker.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Value(Value),
    Tombstone,
}

impl Slot {
    pub(crate) fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Tombstone => None,
        }
    }
}

#[derive(Debug)]
struct LogEntry {
    txn: Arc<TxnShared>,
    key: ErasedKey,
    slot: Slot,
}

/// A transaction removed from the head of the log by a drain.
#[derive(Debug)]
pub(crate) struct Resolved {
    pub(crate) id: TransactionId,
    pub(crate) outcome: TransactionState,
    /// The transaction's writes in issue order.
    pub(crate) writes: Vec<(ErasedKey, Slot)>,
}

/// Overlay entries keyed by property id.
pub(crate) type Overlay = HashMap<PropertyId, (ErasedKey, Slot)>;

#[derive(Debug, Default)]
pub(crate) struct ChangeLog {
    /// Transactions not yet resolved, in creation order.
    outstanding: BTreeMap<TransactionId, Arc<TxnShared>>,
    /// Pending writes in issue order.
    entries: VecDeque<LogEntry>,
    next_seq: u64,
}

impl ChangeLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly created transaction. No entry is written.
    pub(crate) fn register(&mut self, txn: Arc<TxnShared>) {
        self.outstanding.insert(txn.id(), txn);
    }

    pub(crate) fn append(
        &mut self,
        txn: &Arc<TxnShared>,
        key: ErasedKey,
        slot: Slot,
    ) -> SequenceNumber {
        self.next_seq += 1;
        let seq = SequenceNumber::new(self.next_seq);
        self.entries.push_back(LogEntry {
            txn: Arc::clone(txn),
            key,
            slot,
        });
        seq
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Removes completed transactions from the head, oldest first, stopping
    /// at the first one still active.
    ///
    /// With a `lease`, an active head transaction older than the lease is
    /// expired and resolved instead of blocking.
    pub(crate) fn drain(&mut self, lease: Option<Duration>) -> Vec<Resolved> {
        let mut resolved = Vec::new();

        while let Some(head) = self.outstanding.first_entry() {
            let mut outcome = head.get().state();
            if outcome == TransactionState::Active {
                match lease {
                    Some(lease) if head.get().age() >= lease => {
                        outcome = head.get().expire();
                        warn!(
                            txn = %head.get().id(),
                            ?lease,
                            "transaction exceeded its lease at the head of the log; expiring"
                        );
                    }
                    _ => break,
                }
            }

            let txn = head.remove();
            let id = txn.id();
            let writes = self.take_entries(id);
            resolved.push(Resolved {
                id,
                outcome,
                writes,
            });
        }

        resolved
    }

    fn take_entries(&mut self, id: TransactionId) -> Vec<(ErasedKey, Slot)> {
        let mut taken = Vec::new();

        // Fast path: the resolved transaction usually owns the front entries.
        while self.entries.front().is_some_and(|e| e.txn.id() == id) {
            if let Some(entry) = self.entries.pop_front() {
                taken.push((entry.key, entry.slot));
            }
        }

        if self.entries.iter().any(|e| e.txn.id() == id) {
            let (mine, rest): (VecDeque<LogEntry>, VecDeque<LogEntry>) =
                std::mem::take(&mut self.entries)
                    .into_iter()
                    .partition(|e| e.txn.id() == id);
            self.entries = rest;
            taken.extend(mine.into_iter().map(|e| (e.key, e.slot)));
        }

        taken
    }

    /// Rebuilds the overlay from the remaining entries in issue order.
    ///
    /// Entries of rolled-back or expired transactions are skipped, so their
    /// writes disappear from reads as soon as they complete, even while they
    /// wait behind an earlier transaction.
    pub(crate) fn overlay(&self) -> Overlay {
        let mut overlay = Overlay::new();
        for entry in &self.entries {
            let state = entry.txn.state();
            if state.is_completed() && !state.is_committed() {
                continue;
            }
            overlay.insert(entry.key.id(), (entry.key.clone(), entry.slot.clone()));
        }
        overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyKey;

    fn txn(id: u64) -> Arc<TxnShared> {
        Arc::new(TxnShared::new(TransactionId::new(id)))
    }

    fn value_of(slot: &Slot) -> Option<i32> {
        slot.value().and_then(|v| v.get::<i32>())
    }

    #[test]
    fn drain_stops_at_first_active() {
        let key: PropertyKey<i32> = PropertyKey::new();
        let mut log = ChangeLog::new();
        let t1 = txn(1);
        let t2 = txn(2);
        log.register(Arc::clone(&t1));
        log.register(Arc::clone(&t2));

        log.append(&t2, key.erased().clone(), Slot::Value(Value::new(2i32)));
        t2.complete(TransactionState::Committed).unwrap();

        assert!(log.drain(None).is_empty());
        assert_eq!(log.len(), 1);
        assert_eq!(log.outstanding(), 2);

        t1.complete(TransactionState::Committed).unwrap();
        let resolved = log.drain(None);
        let ids: Vec<_> = resolved.iter().map(|r| r.id.as_u64()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(resolved[0].writes.is_empty());
        assert_eq!(value_of(&resolved[1].writes[0].1), Some(2));
        assert_eq!(log.len(), 0);
        assert_eq!(log.outstanding(), 0);
    }

    #[test]
    fn drain_extracts_interleaved_entries() {
        let a: PropertyKey<i32> = PropertyKey::new();
        let b: PropertyKey<i32> = PropertyKey::new();
        let mut log = ChangeLog::new();
        let t1 = txn(1);
        let t2 = txn(2);
        log.register(Arc::clone(&t1));
        log.register(Arc::clone(&t2));

        log.append(&t1, a.erased().clone(), Slot::Value(Value::new(1i32)));
        log.append(&t2, b.erased().clone(), Slot::Value(Value::new(2i32)));
        log.append(&t1, a.erased().clone(), Slot::Tombstone);

        t1.complete(TransactionState::Committed).unwrap();
        let resolved = log.drain(None);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].writes.len(), 2);
        assert!(matches!(resolved[0].writes[1].1, Slot::Tombstone));
        assert_eq!(log.len(), 1);
        assert_eq!(value_of(&log.overlay()[&b.id()].1), Some(2));
    }

    #[test]
    fn drain_keeps_remaining_entries_in_issue_order() {
        let key: PropertyKey<i32> = PropertyKey::new();
        let mut log = ChangeLog::new();
        let t1 = txn(1);
        let t2 = txn(2);
        log.register(Arc::clone(&t1));
        log.register(Arc::clone(&t2));

        log.append(&t2, key.erased().clone(), Slot::Value(Value::new(20i32)));
        log.append(&t1, key.erased().clone(), Slot::Value(Value::new(10i32)));
        log.append(&t2, key.erased().clone(), Slot::Value(Value::new(21i32)));
        log.append(&t1, key.erased().clone(), Slot::Value(Value::new(11i32)));

        t1.complete(TransactionState::Committed).unwrap();
        let resolved = log.drain(None);
        assert_eq!(resolved.len(), 1);
        let values: Vec<_> = resolved[0].writes.iter().map(|(_, s)| value_of(s)).collect();
        assert_eq!(values, vec![Some(10), Some(11)]);

        assert_eq!(log.len(), 2);
        assert_eq!(value_of(&log.overlay()[&key.id()].1), Some(21));

        t2.complete(TransactionState::Committed).unwrap();
        let resolved = log.drain(None);
        let values: Vec<_> = resolved[0].writes.iter().map(|(_, s)| value_of(s)).collect();
        assert_eq!(values, vec![Some(20), Some(21)]);
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn overlay_skips_rolled_back_entries() {
        let key: PropertyKey<i32> = PropertyKey::new();
        let mut log = ChangeLog::new();
        let t1 = txn(1);
        let t2 = txn(2);
        log.register(Arc::clone(&t1));
        log.register(Arc::clone(&t2));

        log.append(&t1, key.erased().clone(), Slot::Value(Value::new(1i32)));
        log.append(&t2, key.erased().clone(), Slot::Value(Value::new(2i32)));
        assert_eq!(value_of(&log.overlay()[&key.id()].1), Some(2));

        t2.complete(TransactionState::RolledBack).unwrap();
        assert_eq!(value_of(&log.overlay()[&key.id()].1), Some(1));
    }

    #[test]
    fn lease_expires_stalled_head() {
        let key: PropertyKey<i32> = PropertyKey::new();
        let mut log = ChangeLog::new();
        let t1 = txn(1);
        let t2 = txn(2);
        log.register(Arc::clone(&t1));
        log.register(Arc::clone(&t2));
        log.append(&t1, key.erased().clone(), Slot::Value(Value::new(1i32)));
        t2.complete(TransactionState::Committed).unwrap();

        let resolved = log.drain(Some(Duration::ZERO));
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].outcome, TransactionState::Expired);
        assert_eq!(t1.state(), TransactionState::Expired);
        assert_eq!(resolved[1].outcome, TransactionState::Committed);
    }
}
