//! Transaction handles.

use crate::config::DropPolicy;
use crate::error::CoreResult;
use crate::property::{ErasedKey, PropertyContext, PropertyKey, Value};
use crate::transaction::log::Slot;
use crate::transaction::state::{TransactionState, TxnShared};
use crate::transaction::store::TransactionalStore;
use crate::types::TransactionId;
use std::any::Any;
use std::sync::Arc;
use tracing::warn;

/// A batch of writes against one [`TransactionalStore`].
///
/// Every write goes straight into the store's change log and is visible to
/// all readers at once. `commit` or `rollback` decides, exactly once, whether
/// those writes reach the committed state.
///
/// Dropping an active transaction completes it according to the store's
/// [`DropPolicy`] (rollback by default).
///
/// Methods take `&self`; a transaction may be shared between threads behind
/// an `Arc` as long as the callers agree on who completes it.
pub struct Transaction {
    shared: Arc<TxnShared>,
    store: TransactionalStore,
}

impl Transaction {
    pub(crate) fn new(shared: Arc<TxnShared>, store: TransactionalStore) -> Self {
        Self { shared, store }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.shared.id()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.shared.state()
    }

    /// Returns true once committed, rolled back or expired.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state().is_completed()
    }

    /// Returns true if the transaction committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.state().is_committed()
    }

    /// Returns the store this transaction writes to.
    #[must_use]
    pub fn store(&self) -> &TransactionalStore {
        &self.store
    }

    /// Writes a typed value.
    pub fn set<T: Any + Send + Sync>(&self, key: &PropertyKey<T>, value: T) -> CoreResult<()> {
        self.store
            .write(&self.shared, key.erased(), Slot::Value(Value::new(value)))
    }

    /// Writes a type-erased value.
    ///
    /// Fails with `TypeMismatch` before anything is logged if the value's
    /// type differs from the key's declared type.
    pub fn set_value(&self, key: &ErasedKey, value: Value) -> CoreResult<()> {
        key.check(&value)?;
        self.store.write(&self.shared, key, Slot::Value(value))
    }

    /// Deletes a property.
    pub fn delete<K: AsRef<ErasedKey> + ?Sized>(&self, key: &K) -> CoreResult<()> {
        self.store.write(&self.shared, key.as_ref(), Slot::Tombstone)
    }

    /// Reads a typed value through the store.
    pub fn try_get<T: Any + Send + Sync + Clone>(&self, key: &PropertyKey<T>) -> Option<T> {
        key.try_get(self)
    }

    /// Commits the transaction.
    ///
    /// The writes reach the committed state once every earlier transaction
    /// has completed too.
    pub fn commit(&self) -> CoreResult<()> {
        self.store.complete(&self.shared, TransactionState::Committed)
    }

    /// Rolls back the transaction, discarding its writes.
    pub fn rollback(&self) -> CoreResult<()> {
        self.store.complete(&self.shared, TransactionState::RolledBack)
    }
}

impl PropertyContext for Transaction {
    fn try_get_value(&self, key: &ErasedKey) -> Option<Value> {
        self.store.try_get_value(key)
    }

    fn properties(&self) -> Vec<ErasedKey> {
        self.store.properties()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.is_completed() {
            return;
        }
        let policy = self.store.config().drop_policy;
        warn!(txn = %self.id(), ?policy, "transaction dropped while active");

        let outcome = match policy {
            DropPolicy::Rollback => TransactionState::RolledBack,
            DropPolicy::Commit => TransactionState::Committed,
        };
        // Another holder may have completed it in the meantime.
        if let Err(err) = self.store.complete(&self.shared, outcome) {
            warn!(txn = %self.id(), "completion on drop failed: {err}");
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    #[test]
    fn read_your_write_inside_transaction() {
        let store = TransactionalStore::new();
        let key: PropertyKey<u16> = PropertyKey::new();

        let txn = store.create_transaction();
        txn.set(&key, 7).unwrap();
        assert_eq!(txn.try_get(&key), Some(7));

        txn.delete(&key).unwrap();
        assert!(txn.try_get(&key).is_none());
    }

    #[test]
    fn cannot_commit_twice() {
        let store = TransactionalStore::new();
        let key: PropertyKey<u16> = PropertyKey::new();
        let txn = store.create_transaction();
        txn.set(&key, 1).unwrap();
        txn.commit().unwrap();

        assert!(txn.commit().unwrap_err().is_invalid_state());
        assert!(txn.rollback().unwrap_err().is_invalid_state());
        assert!(txn.is_committed());
        assert_eq!(store.durable_snapshot().get(&key), Some(1));
    }

    #[test]
    fn cannot_commit_after_rollback() {
        let store = TransactionalStore::new();
        let txn = store.create_transaction();
        txn.rollback().unwrap();

        assert!(txn.commit().unwrap_err().is_invalid_state());
        assert!(txn.rollback().unwrap_err().is_invalid_state());
        assert_eq!(txn.state(), TransactionState::RolledBack);
    }

    #[test]
    fn cannot_write_after_completion() {
        let store = TransactionalStore::new();
        let key: PropertyKey<u16> = PropertyKey::new();
        let txn = store.create_transaction();
        txn.commit().unwrap();

        assert!(txn.set(&key, 1).unwrap_err().is_invalid_state());
        assert!(txn.delete(&key).unwrap_err().is_invalid_state());
        assert!(txn
            .set_value(key.erased(), Value::new(1u16))
            .unwrap_err()
            .is_invalid_state());
        assert_eq!(store.pending_entries(), 0);
    }

    #[test]
    fn drop_rolls_back_by_default() {
        let store = TransactionalStore::new();
        let key: PropertyKey<u16> = PropertyKey::new();
        {
            let txn = store.create_transaction();
            txn.set(&key, 5).unwrap();
        }

        assert!(store.try_get(&key).is_none());
        assert_eq!(store.outstanding_transactions(), 0);
        assert_eq!(store.stats().transactions_rolled_back, 1);
    }

    #[test]
    fn drop_commits_when_configured() {
        let store =
            TransactionalStore::with_config(StoreConfig::new().drop_policy(DropPolicy::Commit));
        let key: PropertyKey<u16> = PropertyKey::new();
        {
            let txn = store.create_transaction();
            txn.set(&key, 5).unwrap();
        }

        assert_eq!(store.durable_snapshot().get(&key), Some(5));
    }

    #[test]
    fn drop_after_commit_is_silent() {
        let store = TransactionalStore::new();
        let txn = store.create_transaction();
        txn.commit().unwrap();
        drop(txn);

        let stats = store.stats();
        assert_eq!(stats.transactions_committed, 1);
        assert_eq!(stats.transactions_rolled_back, 0);
    }

    #[test]
    fn shared_between_threads() {
        let store = TransactionalStore::new();
        let key: PropertyKey<usize> = PropertyKey::new();
        let txn = Arc::new(store.create_transaction());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let txn = Arc::clone(&txn);
                let key = key.clone();
                std::thread::spawn(move || txn.set(&key, i).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        txn.commit().unwrap();
        assert!(store.durable_snapshot().get(&key).is_some());
        assert_eq!(store.pending_entries(), 0);
    }
}
