//! Read-only property contexts and snapshots.

use crate::property::{ErasedKey, PropertyKey, Value};
use crate::types::PropertyId;
use std::any::Any;
use std::collections::BTreeMap;

/// Read access to a set of properties.
///
/// Implemented by every store flavour and by [`Snapshot`]. External
/// serializers only need this surface: enumerate the present keys and read
/// each value.
pub trait PropertyContext {
    /// Returns the value stored for `key`, if present.
    fn try_get_value(&self, key: &ErasedKey) -> Option<Value>;

    /// Returns the keys currently present.
    fn properties(&self) -> Vec<ErasedKey>;

    /// Copies the present `(key, value)` pairs.
    ///
    /// The default implementation reads keys and values separately; stores
    /// override it to copy under a single lock acquisition.
    fn snapshot(&self) -> Snapshot {
        self.properties()
            .into_iter()
            .filter_map(|key| self.try_get_value(&key).map(|value| (key, value)))
            .collect()
    }
}

/// An immutable copy of a context's properties, ordered by property id.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: BTreeMap<PropertyId, (ErasedKey, Value)>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot holds no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in property id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ErasedKey, &Value)> {
        self.entries.values().map(|(key, value)| (key, value))
    }

    /// Reads a typed value.
    #[must_use]
    pub fn get<T: Any + Send + Sync + Clone>(&self, key: &PropertyKey<T>) -> Option<T> {
        key.try_get(self)
    }

    /// Returns true if the snapshot holds `key`.
    #[must_use]
    pub fn contains(&self, key: &ErasedKey) -> bool {
        self.entries.contains_key(&key.id())
    }
}

impl FromIterator<(ErasedKey, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (ErasedKey, Value)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.id(), (key, value)))
                .collect(),
        }
    }
}

impl PropertyContext for Snapshot {
    fn try_get_value(&self, key: &ErasedKey) -> Option<Value> {
        self.entries.get(&key.id()).map(|(_, value)| value.clone())
    }

    fn properties(&self) -> Vec<ErasedKey> {
        self.entries.values().map(|(key, _)| key.clone()).collect()
    }

    fn snapshot(&self) -> Snapshot {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_ordered_by_id() {
        let a: PropertyKey<i32> = PropertyKey::new();
        let b: PropertyKey<i32> = PropertyKey::new();
        let snapshot: Snapshot = vec![
            (b.erased().clone(), Value::new(2i32)),
            (a.erased().clone(), Value::new(1i32)),
        ]
        .into_iter()
        .collect();

        let ids: Vec<_> = snapshot.iter().map(|(k, _)| k.id()).collect();
        assert_eq!(ids, vec![a.id(), b.id()]);
        assert_eq!(snapshot.get(&a), Some(1));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn snapshot_is_a_context() {
        let key = PropertyKey::with_default(7u8);
        let snapshot = Snapshot::new();
        assert!(snapshot.is_empty());
        assert_eq!(key.get(&snapshot).unwrap(), 7);
        assert!(!snapshot.contains(key.erased()));
    }
}
