//! Unsynchronized heterogeneous property map.

use crate::property::{ErasedKey, Snapshot, Value};
use crate::types::PropertyId;
use std::collections::HashMap;

/// Map from property identity to its key and value.
///
/// Holds no lock and performs no type check; the owning store does both.
#[derive(Debug, Clone, Default)]
pub(crate) struct PropertyMap {
    entries: HashMap<PropertyId, (ErasedKey, Value)>,
}

impl PropertyMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, key: &ErasedKey) -> Option<&Value> {
        self.entries.get(&key.id()).map(|(_, value)| value)
    }

    /// Inserts a value, returning the previous one.
    pub(crate) fn insert(&mut self, key: &ErasedKey, value: Value) -> Option<Value> {
        self.entries
            .insert(key.id(), (key.clone(), value))
            .map(|(_, previous)| previous)
    }

    /// Removes a value, returning it if present.
    pub(crate) fn remove(&mut self, key: &ErasedKey) -> Option<Value> {
        self.entries.remove(&key.id()).map(|(_, previous)| previous)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&ErasedKey, &Value)> {
        self.entries.values().map(|(key, value)| (key, value))
    }

    pub(crate) fn keys(&self) -> Vec<ErasedKey> {
        self.entries.values().map(|(key, _)| key.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        self.entries.values().cloned().collect()
    }
}
