//! Cross-module integration test helpers.
//!
//! Provides assertions shared by scenarios that combine keys, stores,
//! transactions, the sequencer and the change feed.

use propstore_core::{ChangeEvent, PropertyContext, Snapshot, TransactionalStore, Value};
use std::sync::mpsc::Receiver;

/// Asserts that the change log is empty and that reads see exactly the
/// committed state.
pub fn assert_fully_drained(store: &TransactionalStore) {
    assert_eq!(store.pending_entries(), 0, "change log not empty");
    assert_eq!(
        store.outstanding_transactions(),
        0,
        "transactions still outstanding"
    );

    let visible = store.snapshot();
    let durable = store.durable_snapshot();
    assert_eq!(visible.len(), durable.len(), "overlay not empty");
    for key in durable.properties() {
        assert!(visible.contains(&key), "{key} committed but not visible");
    }
}

/// Returns true if both snapshots hold the same keys bound to the same
/// value allocations.
pub fn same_snapshot(a: &Snapshot, b: &Snapshot) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && Value::ptr_eq(va, vb))
}

/// Collects every event currently queued on `rx`.
pub fn drain_events(rx: &Receiver<ChangeEvent>) -> Vec<ChangeEvent> {
    rx.try_iter().collect()
}
