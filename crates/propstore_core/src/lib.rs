//! # propstore core
//!
//! A typed, concurrent property store with FIFO-ordered transactions.
//!
//! This crate provides:
//! - Identity-compared, typed property keys with optional defaults
//! - A lock-protected mutable store ([`Store`])
//! - A transactional store whose writes are visible immediately and reach
//!   the committed state in transaction creation order ([`TransactionalStore`])
//! - Transaction handles and a rolling sequencer
//! - A change feed of committed mutations and store statistics
//!
//! ## Example
//!
//! ```rust
//! use propstore_core::{create_property, TransactionalStore};
//!
//! let brightness = create_property(Some(70u8));
//! let store = TransactionalStore::new();
//!
//! let apply = store.create_transaction();
//! apply.set(&brightness, 40).unwrap();
//! apply.commit().unwrap();
//!
//! assert_eq!(brightness.get(&store).unwrap(), 40);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_feed;
mod config;
mod error;
mod property;
mod stats;
mod store;
mod transaction;
mod types;

pub use change_feed::{ChangeEvent, ChangeFeed, ChangeType};
pub use config::{DropPolicy, StoreConfig};
pub use error::{CoreError, CoreResult};
pub use property::{create_property, ErasedKey, PropertyContext, PropertyKey, Snapshot, Value};
pub use stats::{StatsSnapshot, StoreStats};
pub use store::Store;
pub use transaction::{Transaction, TransactionSequencer, TransactionState, TransactionalStore};
pub use types::{PropertyId, SequenceNumber, TransactionId};
