//! Identity-compared property keys.

use crate::error::{CoreError, CoreResult};
use crate::property::{PropertyContext, Value};
use crate::types::PropertyId;
use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Debug)]
struct KeyMeta {
    id: PropertyId,
    name: Option<String>,
    value_type: TypeId,
    type_name: &'static str,
    default: Option<Value>,
}

/// Type-erased view of a [`PropertyKey`].
///
/// Stores use this as their map key. Equality, ordering and hashing go
/// through the property id only, so clones of one key are equal and two
/// separately constructed keys never are.
#[derive(Clone)]
pub struct ErasedKey {
    meta: Arc<KeyMeta>,
}

impl ErasedKey {
    /// Returns the property id.
    #[must_use]
    pub fn id(&self) -> PropertyId {
        self.meta.id
    }

    /// Returns the diagnostic name, if one was given.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.meta.name.as_deref()
    }

    /// Returns the declared value type.
    #[must_use]
    pub fn value_type(&self) -> TypeId {
        self.meta.value_type
    }

    /// Returns the name of the declared value type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.meta.type_name
    }

    /// Returns true if the key declares a default.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.meta.default.is_some()
    }

    /// Returns the declared default.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.meta.default.as_ref()
    }

    /// Checks that `value` may be stored under this key.
    pub fn check(&self, value: &Value) -> CoreResult<()> {
        if value.value_type() == self.meta.value_type {
            Ok(())
        } else {
            Err(CoreError::type_mismatch(
                self.to_string(),
                self.meta.type_name,
                value.type_name(),
            ))
        }
    }
}

impl AsRef<ErasedKey> for ErasedKey {
    fn as_ref(&self) -> &ErasedKey {
        self
    }
}

impl PartialEq for ErasedKey {
    fn eq(&self, other: &Self) -> bool {
        self.meta.id == other.meta.id
    }
}

impl Eq for ErasedKey {}

impl Hash for ErasedKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta.id.hash(state);
    }
}

impl PartialOrd for ErasedKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ErasedKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.meta.id.cmp(&other.meta.id)
    }
}

impl fmt::Display for ErasedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.meta.name {
            Some(name) => write!(f, "{name} ({})", self.meta.id),
            None => write!(f, "{}", self.meta.id),
        }
    }
}

impl fmt::Debug for ErasedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedKey")
            .field("id", &self.meta.id)
            .field("name", &self.meta.name)
            .field("type", &self.meta.type_name)
            .field("has_default", &self.meta.default.is_some())
            .finish()
    }
}

/// A typed property key.
///
/// Keys are minted once (typically at startup) and held as identifiers.
/// The declared type `T` is fixed for the key's lifetime. Identity is by
/// instance: clones share it, fresh constructions never do.
///
/// # Example
///
/// ```rust
/// use propstore_core::{PropertyKey, Store};
///
/// let volume = PropertyKey::with_default(50u8).named("volume");
/// let store = Store::new();
///
/// assert_eq!(volume.get(&store).unwrap(), 50);
/// store.set(&volume, 80);
/// assert_eq!(volume.get(&store).unwrap(), 80);
/// ```
pub struct PropertyKey<T> {
    erased: ErasedKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> PropertyKey<T> {
    /// Creates a key without a default.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a key with a default value.
    #[must_use]
    pub fn with_default(default: T) -> Self {
        Self::build(Some(Value::new(default)))
    }

    fn build(default: Option<Value>) -> Self {
        Self {
            erased: ErasedKey {
                meta: Arc::new(KeyMeta {
                    id: PropertyId::allocate(),
                    name: None,
                    value_type: TypeId::of::<T>(),
                    type_name: std::any::type_name::<T>(),
                    default,
                }),
            },
            _marker: PhantomData,
        }
    }

    /// Attaches a diagnostic name. Identity is unchanged.
    #[must_use]
    pub fn named(self, name: impl Into<String>) -> Self {
        let meta = &self.erased.meta;
        Self {
            erased: ErasedKey {
                meta: Arc::new(KeyMeta {
                    id: meta.id,
                    name: Some(name.into()),
                    value_type: meta.value_type,
                    type_name: meta.type_name,
                    default: meta.default.clone(),
                }),
            },
            _marker: PhantomData,
        }
    }

    /// Returns the property id.
    #[must_use]
    pub fn id(&self) -> PropertyId {
        self.erased.id()
    }

    /// Returns the type-erased view of this key.
    #[must_use]
    pub fn erased(&self) -> &ErasedKey {
        &self.erased
    }

    /// Returns true if the key declares a default.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.erased.has_default()
    }

    /// Returns the declared default.
    #[must_use]
    pub fn default_value(&self) -> Option<&T> {
        self.erased.default_value().and_then(Value::downcast_ref::<T>)
    }

    /// Reads the stored value without falling back to the default.
    pub fn try_get<C>(&self, ctx: &C) -> Option<T>
    where
        C: PropertyContext + ?Sized,
        T: Clone,
    {
        ctx.try_get_value(&self.erased)
            .and_then(|value| value.get::<T>())
    }

    /// Reads the stored value, or the default if absent.
    ///
    /// Fails with [`CoreError::NotFound`] when the property is absent and the
    /// key declares no default.
    pub fn get<C>(&self, ctx: &C) -> CoreResult<T>
    where
        C: PropertyContext + ?Sized,
        T: Clone,
    {
        if let Some(value) = self.try_get(ctx) {
            return Ok(value);
        }
        self.default_value()
            .cloned()
            .ok_or_else(|| CoreError::not_found(self.erased.to_string()))
    }
}

impl<T: Any + Send + Sync> Default for PropertyKey<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PropertyKey<T> {
    fn clone(&self) -> Self {
        Self {
            erased: self.erased.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for PropertyKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.erased == other.erased
    }
}

impl<T> Eq for PropertyKey<T> {}

impl<T> Hash for PropertyKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.erased.hash(state);
    }
}

impl<T> fmt::Debug for PropertyKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyKey").field(&self.erased).finish()
    }
}

impl<T> fmt::Display for PropertyKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.erased, f)
    }
}

impl<T> AsRef<ErasedKey> for PropertyKey<T> {
    fn as_ref(&self) -> &ErasedKey {
        &self.erased
    }
}

/// Mints a new property key, optionally with a default.
#[must_use]
pub fn create_property<T: Any + Send + Sync>(default: Option<T>) -> PropertyKey<T> {
    match default {
        Some(value) => PropertyKey::with_default(value),
        None => PropertyKey::new(),
    }
}
