//! Lock-protected mutable property store.

use crate::error::CoreResult;
use crate::property::{ErasedKey, PropertyContext, PropertyKey, Snapshot, Value};
use crate::store::map::PropertyMap;
use parking_lot::Mutex;
use std::any::Any;
use tracing::trace;

/// A synchronous heterogeneous property map.
///
/// Every operation serializes on one mutex and holds it only for the map
/// access itself. Values written through the typed API are correct by
/// construction; the erased API checks the runtime type and rejects
/// mismatches without touching the store.
///
/// Share a store between threads with `Arc<Store>`.
#[derive(Debug, Default)]
pub struct Store {
    map: Mutex<PropertyMap>,
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a typed value.
    pub fn try_get<T: Any + Send + Sync + Clone>(&self, key: &PropertyKey<T>) -> Option<T> {
        key.try_get(self)
    }

    /// Writes a typed value.
    pub fn set<T: Any + Send + Sync>(&self, key: &PropertyKey<T>, value: T) {
        self.map.lock().insert(key.erased(), Value::new(value));
    }

    /// Writes a type-erased value.
    ///
    /// Fails with [`CoreError::TypeMismatch`](crate::CoreError::TypeMismatch)
    /// if the value's type differs from the key's declared type.
    pub fn set_value(&self, key: &ErasedKey, value: Value) -> CoreResult<()> {
        if let Err(err) = key.check(&value) {
            trace!(property = %key, "rejected write: {err}");
            return Err(err);
        }
        self.map.lock().insert(key, value);
        Ok(())
    }

    /// Removes a property. Returns true if it was present.
    pub fn delete<K: AsRef<ErasedKey> + ?Sized>(&self, key: &K) -> bool {
        self.map.lock().remove(key.as_ref()).is_some()
    }

    /// Returns the number of present properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    /// Returns true if no property is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every property.
    pub fn clear(&self) {
        self.map.lock().clear();
    }
}

impl PropertyContext for Store {
    fn try_get_value(&self, key: &ErasedKey) -> Option<Value> {
        self.map.lock().get(key).cloned()
    }

    fn properties(&self) -> Vec<ErasedKey> {
        self.map.lock().keys()
    }

    fn snapshot(&self) -> Snapshot {
        self.map.lock().snapshot()
    }
}
