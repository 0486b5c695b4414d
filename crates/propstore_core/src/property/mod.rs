//! Property keys, values and read contexts.
//!
//! A [`PropertyKey<T>`] is an identity token: it fixes the value type `T`
//! and an optional default, and is compared by instance rather than by
//! structure. Values travel through the stores type-erased as [`Value`] and
//! are checked against the key's declared type at the store boundary.

mod context;
mod key;
mod value;

pub use context::{PropertyContext, Snapshot};
pub use key::{create_property, ErasedKey, PropertyKey};
pub use value::Value;
