//! Test fixtures and store helpers.
//!
//! Provides a fixed set of named keys and convenience functions for
//! setting up stores in a known state.

use propstore_core::{ErasedKey, PropertyKey, Store, StoreConfig, TransactionalStore};
use std::time::Duration;

/// A set of named keys covering the common value shapes.
#[derive(Debug, Clone)]
pub struct TestKeys {
    /// A string key without default.
    pub title: PropertyKey<String>,
    /// An integer key with default `0`.
    pub count: PropertyKey<i64>,
    /// A boolean key with default `false`.
    pub enabled: PropertyKey<bool>,
    /// A float key with default `1.0`.
    pub ratio: PropertyKey<f64>,
    /// A list key without default.
    pub tags: PropertyKey<Vec<String>>,
}

impl TestKeys {
    /// Mints a fresh set of keys. Two sets never share identities.
    pub fn new() -> Self {
        Self {
            title: PropertyKey::new().named("title"),
            count: PropertyKey::with_default(0).named("count"),
            enabled: PropertyKey::with_default(false).named("enabled"),
            ratio: PropertyKey::with_default(1.0).named("ratio"),
            tags: PropertyKey::new().named("tags"),
        }
    }

    /// The keys in declaration order: `count`, `title`, `enabled`, `ratio`,
    /// `tags`. Indices match the tags of
    /// [`tagged_value_strategy`](crate::generators::tagged_value_strategy).
    pub fn erased_keys(&self) -> Vec<ErasedKey> {
        vec![
            self.count.erased().clone(),
            self.title.erased().clone(),
            self.enabled.erased().clone(),
            self.ratio.erased().clone(),
            self.tags.erased().clone(),
        ]
    }
}

impl Default for TestKeys {
    fn default() -> Self {
        Self::new()
    }
}

/// Mints `count` independent integer keys named `k0`, `k1`, ...
pub fn int_keys(count: usize) -> Vec<PropertyKey<i64>> {
    (0..count)
        .map(|i| PropertyKey::new().named(format!("k{i}")))
        .collect()
}

/// Creates a plain store with `title` and `count` set.
pub fn populated_mutable_store(keys: &TestKeys) -> Store {
    let store = Store::new();
    store.set(&keys.title, "fixture".to_string());
    store.set(&keys.count, 42);
    store
}

/// Creates a transactional store whose durable state has `title` and
/// `count` set by one committed transaction.
pub fn populated_store(keys: &TestKeys) -> TransactionalStore {
    let store = TransactionalStore::new();
    let txn = store.create_transaction();
    txn.set(&keys.title, "fixture".to_string())
        .expect("Failed to set title");
    txn.set(&keys.count, 42).expect("Failed to set count");
    txn.commit().expect("Failed to commit fixture");
    store
}

/// Creates a transactional store that expires stalled transactions after
/// `lease`.
pub fn store_with_lease(lease: Duration) -> TransactionalStore {
    TransactionalStore::with_config(StoreConfig::new().transaction_lease(lease))
}

#[cfg(test)]
mod tests {
    use super::*;
    use propstore_core::PropertyContext;

    #[test]
    fn test_keys_are_distinct() {
        let a = TestKeys::new();
        let b = TestKeys::new();
        assert_ne!(a.title, b.title);
        assert_ne!(a.count.id(), a.enabled.id());
    }

    #[test]
    fn test_populated_store() {
        let keys = TestKeys::new();
        let store = populated_store(&keys);

        assert_eq!(store.durable_snapshot().len(), 2);
        assert_eq!(keys.count.get(&store).unwrap(), 42);
        assert!(!keys.enabled.get(&store).unwrap());
        assert!(keys.tags.get(&store).unwrap_err().is_not_found());
    }

    #[test]
    fn test_populated_mutable_store() {
        let keys = TestKeys::new();
        let store = populated_mutable_store(&keys);

        assert_eq!(store.len(), 2);
        assert_eq!(store.properties().len(), 2);
        assert_eq!(keys.title.get(&store).unwrap(), "fixture");
    }

    #[test]
    fn test_int_keys_named() {
        let keys = int_keys(3);
        assert_eq!(keys[2].erased().name(), Some("k2"));
    }
}
