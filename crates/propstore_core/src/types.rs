//! Core type definitions for the property store.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a property key.
///
/// Minted from a process-wide counter when a key is constructed, so two
/// separately constructed keys never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(pub u64);

static NEXT_PROPERTY_ID: AtomicU64 = AtomicU64::new(1);

impl PropertyId {
    /// Creates a property ID from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates a fresh, never-before-used property ID.
    pub(crate) fn allocate() -> Self {
        Self(NEXT_PROPERTY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prop:{}", self.0)
    }
}

/// Unique identifier for a transaction.
///
/// Transaction IDs are monotonically increasing per store and never reused.
/// Their order is the order in which durable effects are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Sequence number for ordering.
///
/// Used both for the issue order of change log entries and for the order of
/// transactions applied to the durable map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    /// Creates a new sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next sequence number.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_ids_are_unique() {
        let a = PropertyId::allocate();
        let b = PropertyId::allocate();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn transaction_id_ordering() {
        let t1 = TransactionId::new(1);
        let t2 = TransactionId::new(2);
        assert!(t1 < t2);
    }

    #[test]
    fn sequence_number_next() {
        let s1 = SequenceNumber::new(5);
        assert_eq!(s1.next().as_u64(), 6);
    }

    #[test]
    fn display_forms() {
        assert_eq!(format!("{}", PropertyId::new(42)), "prop:42");
        assert_eq!(format!("{}", TransactionId::new(7)), "txn:7");
        assert_eq!(format!("{}", SequenceNumber::new(9)), "seq:9");
    }
}
