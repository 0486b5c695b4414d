//! A sequential reference model of the transactional store.
//!
//! [`ModelStore`] restates the store's ordering rules with plain
//! collections: a log in issue order, transactions in creation order and a
//! head index. [`ModelCheck`] drives a real store and the model with the
//! same [`TxnOp`] sequence and compares what each exposes.

use crate::generators::TxnOp;
use propstore_core::{PropertyKey, Transaction, TransactionState, TransactionalStore};
use std::collections::BTreeMap;

/// Reference model over keys addressed by index.
#[derive(Debug, Clone, Default)]
pub struct ModelStore {
    durable: BTreeMap<usize, i64>,
    txns: Vec<TransactionState>,
    /// `(txn, key, value)`; `None` marks a deletion.
    log: Vec<(usize, usize, Option<i64>)>,
    head: usize,
}

impl ModelStore {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transaction and returns its index.
    pub fn begin(&mut self) -> usize {
        self.txns.push(TransactionState::Active);
        self.txns.len() - 1
    }

    /// Returns the number of transactions begun.
    pub fn transaction_count(&self) -> usize {
        self.txns.len()
    }

    /// Buffers a write. Returns false if `txn` is no longer active.
    pub fn set(&mut self, txn: usize, key: usize, value: i64) -> bool {
        self.write(txn, key, Some(value))
    }

    /// Buffers a deletion. Returns false if `txn` is no longer active.
    pub fn delete(&mut self, txn: usize, key: usize) -> bool {
        self.write(txn, key, None)
    }

    /// Commits `txn`. Returns false if it already completed.
    pub fn commit(&mut self, txn: usize) -> bool {
        self.complete(txn, TransactionState::Committed)
    }

    /// Rolls back `txn`. Returns false if it already completed.
    pub fn rollback(&mut self, txn: usize) -> bool {
        self.complete(txn, TransactionState::RolledBack)
    }

    /// The value a reader sees: the newest write of a transaction that has
    /// not been rolled back, else the committed value.
    pub fn visible(&self, key: usize) -> Option<i64> {
        self.log
            .iter()
            .rev()
            .find(|(txn, k, _)| *k == key && self.txns[*txn] != TransactionState::RolledBack)
            .map_or_else(|| self.durable.get(&key).copied(), |(_, _, value)| *value)
    }

    /// The committed value.
    pub fn durable(&self, key: usize) -> Option<i64> {
        self.durable.get(&key).copied()
    }

    /// Number of writes not yet drained.
    pub fn pending_entries(&self) -> usize {
        self.log.len()
    }

    /// Number of transactions not yet drained.
    pub fn outstanding(&self) -> usize {
        self.txns.len() - self.head
    }

    fn write(&mut self, txn: usize, key: usize, value: Option<i64>) -> bool {
        if self.txns[txn] != TransactionState::Active {
            return false;
        }
        self.log.push((txn, key, value));
        true
    }

    fn complete(&mut self, txn: usize, outcome: TransactionState) -> bool {
        if self.txns[txn] != TransactionState::Active {
            return false;
        }
        self.txns[txn] = outcome;
        self.drain();
        true
    }

    fn drain(&mut self) {
        while self.head < self.txns.len() && self.txns[self.head].is_completed() {
            let head = self.head;
            if self.txns[head] == TransactionState::Committed {
                for (_, key, value) in self.log.iter().filter(|(txn, _, _)| *txn == head) {
                    match value {
                        Some(value) => self.durable.insert(*key, *value),
                        None => self.durable.remove(key),
                    };
                }
            }
            self.log.retain(|(txn, _, _)| *txn != head);
            self.head += 1;
        }
    }
}

/// Runs a real store and a [`ModelStore`] side by side.
pub struct ModelCheck {
    keys: Vec<PropertyKey<i64>>,
    store: TransactionalStore,
    txns: Vec<Transaction>,
    model: ModelStore,
}

impl ModelCheck {
    /// Creates a check over `key_count` fresh keys.
    pub fn new(key_count: usize) -> Self {
        Self {
            keys: crate::fixtures::int_keys(key_count.max(1)),
            store: TransactionalStore::new(),
            txns: Vec::new(),
            model: ModelStore::new(),
        }
    }

    /// Returns the real store.
    pub fn store(&self) -> &TransactionalStore {
        &self.store
    }

    /// Returns the model.
    pub fn model(&self) -> &ModelStore {
        &self.model
    }

    /// Applies one operation to both sides and compares their outcome.
    pub fn apply(&mut self, op: &TxnOp) -> Result<(), String> {
        if *op == TxnOp::Begin {
            self.txns.push(self.store.create_transaction());
            self.model.begin();
            return Ok(());
        }
        if self.txns.is_empty() {
            return Ok(());
        }

        let count = self.txns.len();
        let (real, model) = match *op {
            TxnOp::Begin => return Ok(()),
            TxnOp::Set { txn, key, value } => {
                let (txn, key) = (txn % count, key % self.keys.len());
                (
                    self.txns[txn].set(&self.keys[key], value),
                    self.model.set(txn, key, value),
                )
            }
            TxnOp::Delete { txn, key } => {
                let (txn, key) = (txn % count, key % self.keys.len());
                (
                    self.txns[txn].delete(&self.keys[key]),
                    self.model.delete(txn, key),
                )
            }
            TxnOp::Commit { txn } => {
                let txn = txn % count;
                (self.txns[txn].commit(), self.model.commit(txn))
            }
            TxnOp::Rollback { txn } => {
                let txn = txn % count;
                (self.txns[txn].rollback(), self.model.rollback(txn))
            }
        };

        match (real, model) {
            (Ok(()), true) => Ok(()),
            (Err(err), false) if err.is_invalid_state() => Ok(()),
            (real, model) => Err(format!(
                "{op:?}: store returned {real:?}, model accepted = {model}"
            )),
        }
    }

    /// Compares every observable of the store against the model.
    pub fn verify(&self) -> Result<(), String> {
        let durable = self.store.durable_snapshot();
        for (index, key) in self.keys.iter().enumerate() {
            let visible = self.store.try_get(key);
            if visible != self.model.visible(index) {
                return Err(format!(
                    "visible k{index}: store {visible:?}, model {:?}",
                    self.model.visible(index)
                ));
            }
            let committed = durable.get(key);
            if committed != self.model.durable(index) {
                return Err(format!(
                    "durable k{index}: store {committed:?}, model {:?}",
                    self.model.durable(index)
                ));
            }
        }
        if self.store.pending_entries() != self.model.pending_entries() {
            return Err(format!(
                "pending entries: store {}, model {}",
                self.store.pending_entries(),
                self.model.pending_entries()
            ));
        }
        if self.store.outstanding_transactions() != self.model.outstanding() {
            return Err(format!(
                "outstanding: store {}, model {}",
                self.store.outstanding_transactions(),
                self.model.outstanding()
            ));
        }
        Ok(())
    }

    /// Applies `ops` in order, verifying after each step.
    pub fn run(key_count: usize, ops: &[TxnOp]) -> Result<Self, String> {
        let mut check = Self::new(key_count);
        for (step, op) in ops.iter().enumerate() {
            check
                .apply(op)
                .and_then(|()| check.verify())
                .map_err(|err| format!("step {step}: {err}"))?;
        }
        Ok(check)
    }

    /// Rolls back whatever is still active, leaving both sides drained.
    pub fn finish(&mut self) -> Result<(), String> {
        for index in 0..self.txns.len() {
            if !self.txns[index].is_completed() {
                self.apply(&TxnOp::Rollback { txn: index })?;
            }
        }
        self.verify()
    }
}

impl std::fmt::Debug for ModelCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCheck")
            .field("keys", &self.keys.len())
            .field("transactions", &self.txns.len())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{txn_ops_strategy, PropTestConfig};
    use proptest::prelude::*;

    #[test]
    fn model_drains_in_creation_order() {
        let mut model = ModelStore::new();
        let a = model.begin();
        let b = model.begin();
        model.set(a, 0, 1);
        model.set(b, 0, 2);

        assert!(model.commit(b));
        assert_eq!(model.durable(0), None);
        assert_eq!(model.visible(0), Some(2));

        assert!(model.commit(a));
        assert_eq!(model.durable(0), Some(2));
        assert_eq!(model.pending_entries(), 0);
        assert_eq!(model.outstanding(), 0);
    }

    #[test]
    fn model_hides_rolled_back_writes() {
        let mut model = ModelStore::new();
        let a = model.begin();
        let b = model.begin();
        model.set(a, 0, 1);
        model.set(b, 0, 2);

        assert!(model.rollback(b));
        assert_eq!(model.visible(0), Some(1));
        assert!(!model.commit(b));
        assert_eq!(model.pending_entries(), 2);
    }

    #[test]
    fn check_matches_store_on_fixed_sequence() {
        let ops = [
            TxnOp::Begin,
            TxnOp::Begin,
            TxnOp::Set { txn: 0, key: 0, value: 1 },
            TxnOp::Set { txn: 1, key: 0, value: 2 },
            TxnOp::Delete { txn: 1, key: 1 },
            TxnOp::Commit { txn: 1 },
            TxnOp::Commit { txn: 1 },
            TxnOp::Set { txn: 1, key: 1, value: 5 },
            TxnOp::Commit { txn: 0 },
        ];
        let check = ModelCheck::run(2, &ops).unwrap();
        assert_eq!(check.model().durable(0), Some(2));
        assert_eq!(check.store().outstanding_transactions(), 0);
    }

    proptest! {
        #![proptest_config(PropTestConfig::default().to_proptest_config())]

        #[test]
        fn store_agrees_with_model(ops in txn_ops_strategy(4, 60)) {
            let mut check = ModelCheck::run(4, &ops).map_err(TestCaseError::fail)?;
            check.finish().map_err(TestCaseError::fail)?;
            prop_assert_eq!(check.store().pending_entries(), 0);
            prop_assert_eq!(check.store().outstanding_transactions(), 0);
        }
    }
}
