//! Property-based test generators using proptest.
//!
//! Operations address keys and transactions by index so that the same
//! sequence can drive both a real store and the reference model.

use propstore_core::Value;
use proptest::prelude::*;

/// One step against a transactional store.
///
/// `txn` indexes into the transactions begun so far, modulo their count.
/// Steps naming a transaction before any has begun are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnOp {
    /// Create a new transaction.
    Begin,
    /// Write `value` to key `key` in transaction `txn`.
    Set {
        /// Transaction index.
        txn: usize,
        /// Key index.
        key: usize,
        /// Value to write.
        value: i64,
    },
    /// Delete key `key` in transaction `txn`.
    Delete {
        /// Transaction index.
        txn: usize,
        /// Key index.
        key: usize,
    },
    /// Commit transaction `txn`.
    Commit {
        /// Transaction index.
        txn: usize,
    },
    /// Roll back transaction `txn`.
    Rollback {
        /// Transaction index.
        txn: usize,
    },
}

/// Strategy for property values. A narrow range makes overwrites likely.
pub fn value_strategy() -> impl Strategy<Value = i64> {
    -8i64..8
}

/// Strategy for a single operation over `key_count` keys.
pub fn txn_op_strategy(key_count: usize) -> impl Strategy<Value = TxnOp> {
    let key_count = key_count.max(1);
    prop_oneof![
        2 => Just(TxnOp::Begin),
        5 => (any::<usize>(), 0..key_count, value_strategy())
            .prop_map(|(txn, key, value)| TxnOp::Set { txn, key, value }),
        1 => (any::<usize>(), 0..key_count).prop_map(|(txn, key)| TxnOp::Delete { txn, key }),
        2 => any::<usize>().prop_map(|txn| TxnOp::Commit { txn }),
        1 => any::<usize>().prop_map(|txn| TxnOp::Rollback { txn }),
    ]
}

/// Strategy for an operation sequence of up to `max_len` steps.
pub fn txn_ops_strategy(key_count: usize, max_len: usize) -> impl Strategy<Value = Vec<TxnOp>> {
    prop::collection::vec(txn_op_strategy(key_count), 0..=max_len)
}

/// Strategy for erased values tagged with the index of the
/// [`TestKeys::erased_keys`](crate::fixtures::TestKeys::erased_keys) entry
/// whose declared type they match. Tag `5` (`u8`) matches no fixture key.
pub fn tagged_value_strategy() -> impl Strategy<Value = (usize, Value)> {
    prop_oneof![
        any::<i64>().prop_map(|v| (0usize, Value::new(v))),
        "[a-z]{0,8}".prop_map(|v| (1, Value::new(v))),
        any::<bool>().prop_map(|v| (2, Value::new(v))),
        any::<f64>().prop_map(|v| (3, Value::new(v))),
        prop::collection::vec("[a-z]{1,4}", 0..3).prop_map(|v| (4, Value::new(v))),
        any::<u8>().prop_map(|v| (5, Value::new(v))),
    ]
}

/// Strategy for diagnostic key names.
pub fn key_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_.]{0,23}").expect("Invalid regex")
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
