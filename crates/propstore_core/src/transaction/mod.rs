//! Transactions over a shared property store.
//!
//! Writes are logged per transaction and visible to every reader as soon as
//! they are issued. Completing a transaction drains the change log: completed
//! transactions are resolved oldest first, committed writes are merged into
//! the durable map, rolled-back writes are dropped, and draining stops at the
//! first transaction that is still active.

mod handle;
mod log;
mod sequencer;
mod state;
mod store;

pub use handle::Transaction;
pub use sequencer::TransactionSequencer;
pub use state::TransactionState;
pub use store::TransactionalStore;
