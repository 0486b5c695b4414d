//! Change feed for observing durable property changes.
//!
//! The feed emits one event for every mutation a drain applies to the
//! durable map of a [`TransactionalStore`](crate::TransactionalStore), in
//! application order. Tentative writes that are still pending in the change
//! log are never reported.
//!
//! # Usage
//!
//! ```rust
//! use propstore_core::{PropertyKey, TransactionalStore};
//!
//! let store = TransactionalStore::new();
//! let title: PropertyKey<String> = PropertyKey::new();
//! let receiver = store.subscribe();
//!
//! let txn = store.create_transaction();
//! txn.set(&title, "Settings".to_string()).unwrap();
//! txn.commit().unwrap();
//!
//! let event = receiver.recv().unwrap();
//! assert_eq!(event.key, *title.erased());
//! ```

use crate::property::{ErasedKey, Value};
use crate::types::SequenceNumber;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};

/// Type of change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// Property became present (no previous durable value).
    Insert,
    /// Property value replaced.
    Update,
    /// Property removed.
    Delete,
}

/// A single durable change.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Sequence number of the applied transaction.
    pub sequence: SequenceNumber,
    /// The property that changed.
    pub key: ErasedKey,
    /// Type of change.
    pub change_type: ChangeType,
    /// New value (for Insert/Update). None for Delete.
    pub value: Option<Value>,
}

impl ChangeEvent {
    /// Creates an insert event.
    pub fn insert(sequence: SequenceNumber, key: ErasedKey, value: Value) -> Self {
        Self {
            sequence,
            key,
            change_type: ChangeType::Insert,
            value: Some(value),
        }
    }

    /// Creates an update event.
    pub fn update(sequence: SequenceNumber, key: ErasedKey, value: Value) -> Self {
        Self {
            sequence,
            key,
            change_type: ChangeType::Update,
            value: Some(value),
        }
    }

    /// Creates a delete event.
    pub fn delete(sequence: SequenceNumber, key: ErasedKey) -> Self {
        Self {
            sequence,
            key,
            change_type: ChangeType::Delete,
            value: None,
        }
    }
}

/// Distributes durable changes to subscribers.
///
/// The change feed:
/// - Emits only drained, committed writes
/// - Preserves application order
/// - Supports multiple subscribers
/// - Is thread-safe
pub struct ChangeFeed {
    subscribers: RwLock<Vec<Sender<ChangeEvent>>>,
    history: RwLock<VecDeque<ChangeEvent>>,
    max_history: usize,
}

impl ChangeFeed {
    /// Creates a new change feed.
    pub fn new() -> Self {
        Self::with_max_history(1024)
    }

    /// Creates a change feed with a specific history limit.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(VecDeque::new()),
            max_history,
        }
    }

    /// Subscribes to the change feed.
    ///
    /// Returns a receiver that will receive all future change events.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits a single change event.
    pub fn emit(&self, event: ChangeEvent) {
        self.emit_batch(vec![event]);
    }

    /// Emits the events of one drain.
    ///
    /// History is trimmed once per batch and every subscriber receives the
    /// whole batch before the next one starts. A subscriber whose receiver
    /// was dropped is removed.
    pub fn emit_batch(&self, events: Vec<ChangeEvent>) {
        if events.is_empty() {
            return;
        }

        self.subscribers
            .write()
            .retain(|tx| events.iter().all(|event| tx.send(event.clone()).is_ok()));

        let mut history = self.history.write();
        history.extend(events);
        let excess = history.len().saturating_sub(self.max_history);
        history.drain(..excess);
    }

    /// Returns events with sequence > `cursor`, up to `limit`.
    pub fn poll(&self, cursor: SequenceNumber, limit: usize) -> Vec<ChangeEvent> {
        let history = self.history.read();
        let start = history.partition_point(|e| e.sequence <= cursor);
        history.range(start..).take(limit).cloned().collect()
    }

    /// Returns the latest sequence number in history.
    pub fn latest_sequence(&self) -> SequenceNumber {
        self.history
            .read()
            .back()
            .map(|e| e.sequence)
            .unwrap_or(SequenceNumber::new(0))
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of events in history.
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("subscribers", &self.subscriber_count())
            .field("history_len", &self.history_len())
            .field("max_history", &self.max_history)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyKey;
    use std::time::Duration;

    fn event(seq: u64) -> ChangeEvent {
        let key: PropertyKey<u64> = PropertyKey::new();
        ChangeEvent::insert(SequenceNumber::new(seq), key.erased().clone(), Value::new(seq))
    }

    #[test]
    fn emit_and_receive() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe();

        feed.emit(event(1));

        let received = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(received.sequence, SequenceNumber::new(1));
        assert_eq!(received.change_type, ChangeType::Insert);
        assert_eq!(received.value.unwrap().get::<u64>(), Some(1));
    }

    #[test]
    fn multiple_subscribers() {
        let feed = ChangeFeed::new();
        let rx1 = feed.subscribe();
        let rx2 = feed.subscribe();

        feed.emit(event(1));

        assert_eq!(rx1.recv().unwrap().sequence, SequenceNumber::new(1));
        assert_eq!(rx2.recv().unwrap().sequence, SequenceNumber::new(1));
    }

    #[test]
    fn subscriber_cleanup() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        drop(rx);
        feed.emit(event(1));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn poll_from_cursor() {
        let feed = ChangeFeed::new();
        for i in 1..=5 {
            feed.emit(event(i));
        }

        let events = feed.poll(SequenceNumber::new(2), 10);
        let seqs: Vec<_> = events.iter().map(|e| e.sequence.as_u64()).collect();
        assert_eq!(seqs, vec![3, 4, 5]);
        assert_eq!(feed.poll(SequenceNumber::new(0), 2).len(), 2);
    }

    #[test]
    fn history_truncation() {
        let feed = ChangeFeed::with_max_history(3);
        for i in 1..=10 {
            feed.emit(event(i));
        }

        assert_eq!(feed.history_len(), 3);
        assert_eq!(feed.poll(SequenceNumber::new(0), 100)[0].sequence.as_u64(), 8);
        assert_eq!(feed.latest_sequence(), SequenceNumber::new(10));
    }

    #[test]
    fn batch_reaches_subscribers_in_order() {
        let feed = ChangeFeed::with_max_history(4);
        let rx = feed.subscribe();
        let gone = feed.subscribe();
        drop(gone);

        feed.emit_batch((1..=6).map(event).collect());
        feed.emit_batch(Vec::new());

        let seqs: Vec<_> = rx.try_iter().map(|e| e.sequence.as_u64()).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(feed.subscriber_count(), 1);
        assert_eq!(feed.history_len(), 4);
        assert_eq!(feed.poll(SequenceNumber::new(0), 10)[0].sequence.as_u64(), 3);
        assert_eq!(feed.latest_sequence(), SequenceNumber::new(6));
    }

    #[test]
    fn delete_event_has_no_value() {
        let key: PropertyKey<u8> = PropertyKey::new();
        let event = ChangeEvent::delete(SequenceNumber::new(4), key.erased().clone());
        assert_eq!(event.change_type, ChangeType::Delete);
        assert!(event.value.is_none());
    }
}
