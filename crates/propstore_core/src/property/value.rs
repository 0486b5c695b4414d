//! Type-erased property values.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A shared, immutable, type-erased property value.
///
/// Cloning a `Value` is cheap; all clones point at the same allocation. The
/// concrete type is recorded at construction so that stores can check it
/// against a key's declared type without downcasting.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    value_type: TypeId,
    type_name: &'static str,
}

impl Value {
    /// Wraps a concrete value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            value_type: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns the concrete type of the wrapped value.
    #[must_use]
    pub fn value_type(&self) -> TypeId {
        self.value_type
    }

    /// Returns the name of the wrapped value's type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns true if the wrapped value is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.value_type == TypeId::of::<T>()
    }

    /// Borrows the wrapped value as a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Clones the wrapped value out as a `T`.
    #[must_use]
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Returns true if both values share one allocation.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}
