//! Store configuration.

use std::time::Duration;

/// What happens to a transaction handle dropped while still active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPolicy {
    /// Discard the transaction's writes.
    Rollback,
    /// Apply the transaction's writes as if `commit` had been called.
    Commit,
}

/// Configuration for a [`TransactionalStore`](crate::TransactionalStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Completion applied to transactions dropped without commit or rollback.
    pub drop_policy: DropPolicy,

    /// Maximum age of an active transaction holding the head of the log.
    ///
    /// `None` keeps strict head-of-line blocking: an active transaction stalls
    /// every later durable effect until it completes.
    pub transaction_lease: Option<Duration>,

    /// Number of committed change events retained for polling.
    pub change_feed_history: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            drop_policy: DropPolicy::Rollback,
            transaction_lease: None,
            change_feed_history: 1024,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the drop policy.
    #[must_use]
    pub const fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Sets a lease after which a stalled head transaction is expired.
    #[must_use]
    pub const fn transaction_lease(mut self, lease: Duration) -> Self {
        self.transaction_lease = Some(lease);
        self
    }

    /// Sets the change feed history size.
    #[must_use]
    pub const fn change_feed_history(mut self, events: usize) -> Self {
        self.change_feed_history = events;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.drop_policy, DropPolicy::Rollback);
        assert!(config.transaction_lease.is_none());
        assert_eq!(config.change_feed_history, 1024);
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new()
            .drop_policy(DropPolicy::Commit)
            .transaction_lease(Duration::from_secs(5))
            .change_feed_history(16);

        assert_eq!(config.drop_policy, DropPolicy::Commit);
        assert_eq!(config.transaction_lease, Some(Duration::from_secs(5)));
        assert_eq!(config.change_feed_history, 16);
    }
}
