//! A rolling "current transaction" over a store.

use crate::error::CoreResult;
use crate::property::{ErasedKey, PropertyContext, PropertyKey, Value};
use crate::transaction::handle::Transaction;
use crate::transaction::store::TransactionalStore;
use crate::types::TransactionId;
use parking_lot::Mutex;
use std::any::Any;

/// Keeps one current transaction and opens a new one whenever the previous
/// one has completed.
///
/// Callers just keep writing and call `commit` or `rollback` at the points
/// where a batch should end. Which writes share a transaction is decided by
/// the order of those calls across all threads using the sequencer.
///
/// # Example
///
/// ```rust
/// use propstore_core::{PropertyKey, TransactionSequencer, TransactionalStore};
///
/// let store = TransactionalStore::new();
/// let zoom = PropertyKey::with_default(1.0f32);
/// let edits = TransactionSequencer::new(store.clone());
///
/// edits.set(&zoom, 2.0).unwrap();
/// edits.rollback().unwrap(); // "Cancel"
/// edits.set(&zoom, 1.5).unwrap();
/// edits.commit().unwrap(); // "Apply"
///
/// assert_eq!(zoom.get(&store).unwrap(), 1.5);
/// ```
#[derive(Debug)]
pub struct TransactionSequencer {
    store: TransactionalStore,
    current: Mutex<Option<Transaction>>,
}

impl TransactionSequencer {
    /// Creates a sequencer. No transaction is opened until the first write.
    #[must_use]
    pub fn new(store: TransactionalStore) -> Self {
        Self {
            store,
            current: Mutex::new(None),
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &TransactionalStore {
        &self.store
    }

    /// Returns the id of the current transaction, if one is active.
    #[must_use]
    pub fn current_id(&self) -> Option<TransactionId> {
        self.current
            .lock()
            .as_ref()
            .filter(|txn| !txn.is_completed())
            .map(Transaction::id)
    }

    /// Writes a typed value into the current transaction.
    pub fn set<T: Any + Send + Sync>(&self, key: &PropertyKey<T>, value: T) -> CoreResult<()> {
        self.with_current(|txn| txn.set(key, value))
    }

    /// Writes a type-erased value into the current transaction.
    pub fn set_value(&self, key: &ErasedKey, value: Value) -> CoreResult<()> {
        self.with_current(|txn| txn.set_value(key, value))
    }

    /// Deletes a property in the current transaction.
    pub fn delete<K: AsRef<ErasedKey> + ?Sized>(&self, key: &K) -> CoreResult<()> {
        self.with_current(|txn| txn.delete(key))
    }

    /// Reads a typed value through the store.
    pub fn try_get<T: Any + Send + Sync + Clone>(&self, key: &PropertyKey<T>) -> Option<T> {
        self.store.try_get(key)
    }

    /// Commits the current transaction. A no-op when none is active.
    pub fn commit(&self) -> CoreResult<()> {
        match self.take_active() {
            Some(txn) => txn.commit(),
            None => Ok(()),
        }
    }

    /// Rolls back the current transaction. A no-op when none is active.
    pub fn rollback(&self) -> CoreResult<()> {
        match self.take_active() {
            Some(txn) => txn.rollback(),
            None => Ok(()),
        }
    }

    fn take_active(&self) -> Option<Transaction> {
        self.current.lock().take().filter(|txn| !txn.is_completed())
    }

    fn with_current<R>(&self, f: impl FnOnce(&Transaction) -> CoreResult<R>) -> CoreResult<R> {
        let mut current = self.current.lock();
        let txn = match current.take() {
            Some(txn) if !txn.is_completed() => txn,
            _ => self.store.create_transaction(),
        };
        f(current.insert(txn))
    }
}

impl PropertyContext for TransactionSequencer {
    fn try_get_value(&self, key: &ErasedKey) -> Option<Value> {
        self.store.try_get_value(key)
    }

    fn properties(&self) -> Vec<ErasedKey> {
        self.store.properties()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_share_one_transaction_until_commit() {
        let store = TransactionalStore::new();
        let a: PropertyKey<u8> = PropertyKey::new();
        let b: PropertyKey<u8> = PropertyKey::new();
        let seq = TransactionSequencer::new(store.clone());
        assert!(seq.current_id().is_none());

        seq.set(&a, 1).unwrap();
        let first = seq.current_id().unwrap();
        seq.set(&b, 2).unwrap();
        assert_eq!(seq.current_id(), Some(first));
        assert_eq!(store.outstanding_transactions(), 1);

        seq.commit().unwrap();
        assert!(seq.current_id().is_none());
        assert_eq!(store.durable_snapshot().len(), 2);

        seq.delete(&a).unwrap();
        assert!(seq.current_id().unwrap() > first);
    }

    #[test]
    fn rollback_discards_current_batch() {
        let store = TransactionalStore::new();
        let key = PropertyKey::with_default(String::from("light"));
        let seq = TransactionSequencer::new(store.clone());

        seq.set(&key, "dark".to_string()).unwrap();
        assert_eq!(key.get(&seq).unwrap(), "dark");
        seq.rollback().unwrap();

        assert_eq!(key.get(&seq).unwrap(), "light");
        assert_eq!(store.stats().transactions_rolled_back, 1);
    }

    #[test]
    fn completion_without_writes_is_noop() {
        let store = TransactionalStore::new();
        let seq = TransactionSequencer::new(store.clone());

        seq.commit().unwrap();
        seq.rollback().unwrap();
        assert_eq!(store.stats().transactions_started, 0);
    }

    #[test]
    fn type_mismatch_keeps_transaction_usable() {
        let store = TransactionalStore::new();
        let key: PropertyKey<i64> = PropertyKey::new();
        let seq = TransactionSequencer::new(store.clone());

        let err = seq.set_value(key.erased(), Value::new(1u8)).unwrap_err();
        assert!(err.is_type_mismatch());
        seq.set_value(key.erased(), Value::new(1i64)).unwrap();
        seq.commit().unwrap();

        assert_eq!(store.durable_snapshot().get(&key), Some(1));
    }

    #[test]
    fn dropping_sequencer_completes_current() {
        let store = TransactionalStore::new();
        let key: PropertyKey<u8> = PropertyKey::new();
        {
            let seq = TransactionSequencer::new(store.clone());
            seq.set(&key, 9).unwrap();
        }

        assert!(store.try_get(&key).is_none());
        assert_eq!(store.outstanding_transactions(), 0);
        assert_eq!(store.stats().transactions_rolled_back, 1);
    }
}
