//! Transaction state.

use crate::error::{CoreError, CoreResult};
use crate::types::TransactionId;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and accepts writes.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
    /// Transaction held the head of the log past the configured lease and
    /// was rolled back by a drain.
    Expired,
}

impl TransactionState {
    /// Returns true once the transaction can no longer change.
    #[must_use]
    pub fn is_completed(self) -> bool {
        self != Self::Active
    }

    /// Returns true if the transaction's writes reach the durable map.
    #[must_use]
    pub fn is_committed(self) -> bool {
        self == Self::Committed
    }
}

/// Per-transaction state shared between the handle and its log entries.
///
/// The lock is always taken while the owning store's lock is held, never the
/// other way round.
#[derive(Debug)]
pub(crate) struct TxnShared {
    id: TransactionId,
    created_at: Instant,
    state: Mutex<TransactionState>,
}

impl TxnShared {
    pub(crate) fn new(id: TransactionId) -> Self {
        Self {
            id,
            created_at: Instant::now(),
            state: Mutex::new(TransactionState::Active),
        }
    }

    pub(crate) fn id(&self) -> TransactionId {
        self.id
    }

    pub(crate) fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    pub(crate) fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Fails unless the transaction is still active.
    pub(crate) fn ensure_active(&self) -> CoreResult<()> {
        check_active(self.id, *self.state.lock())
    }

    /// Moves an active transaction to `outcome`.
    pub(crate) fn complete(&self, outcome: TransactionState) -> CoreResult<()> {
        debug_assert!(outcome.is_completed());
        let mut state = self.state.lock();
        check_active(self.id, *state)?;
        *state = outcome;
        Ok(())
    }

    /// Expires the transaction if it is still active. Returns the state it
    /// ends up in.
    pub(crate) fn expire(&self) -> TransactionState {
        let mut state = self.state.lock();
        if *state == TransactionState::Active {
            *state = TransactionState::Expired;
        }
        *state
    }
}

fn check_active(id: TransactionId, state: TransactionState) -> CoreResult<()> {
    match state {
        TransactionState::Active => Ok(()),
        TransactionState::Committed => Err(CoreError::invalid_state(format!(
            "transaction {id} already committed"
        ))),
        TransactionState::RolledBack => Err(CoreError::invalid_state(format!(
            "transaction {id} already rolled back"
        ))),
        TransactionState::Expired => Err(CoreError::invalid_state(format!(
            "transaction {id} expired"
        ))),
    }
}
