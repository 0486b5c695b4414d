//! Benchmark utilities.

use propstore_core::{PropertyKey, Store, TransactionalStore};
use rand::Rng;

/// Mint `count` integer keys.
pub fn int_keys(count: usize) -> Vec<PropertyKey<i64>> {
    (0..count).map(|_| PropertyKey::new()).collect()
}

/// Generate `count` random values.
pub fn random_values(count: usize) -> Vec<i64> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen()).collect()
}

/// Generate `count` random key indices below `key_count`.
pub fn random_indices(count: usize, key_count: usize) -> Vec<usize> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen_range(0..key_count)).collect()
}

/// A plain store with every key set.
pub fn populated_store(keys: &[PropertyKey<i64>]) -> Store {
    let store = Store::new();
    for (key, value) in keys.iter().zip(random_values(keys.len())) {
        store.set(key, value);
    }
    store
}

/// A transactional store with every key committed.
pub fn populated_transactional_store(keys: &[PropertyKey<i64>]) -> TransactionalStore {
    let store = TransactionalStore::new();
    let txn = store.create_transaction();
    for (key, value) in keys.iter().zip(random_values(keys.len())) {
        txn.set(key, value).expect("Failed to set fixture value");
    }
    txn.commit().expect("Failed to commit fixture");
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populated_transactional_store_is_committed() {
        let keys = int_keys(32);
        let store = populated_transactional_store(&keys);

        assert_eq!(store.durable_snapshot().len(), keys.len());
        assert_eq!(store.pending_entries(), 0);
        assert_eq!(store.stats().transactions_committed, 1);
    }
}
