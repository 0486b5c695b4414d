//! Plain (non-transactional) property storage.

mod map;
mod mutable;

pub(crate) use map::PropertyMap;
pub use mutable::Store;
