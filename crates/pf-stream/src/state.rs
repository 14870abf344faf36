//! Externally observable stream state.
//!
//! The connection manager owns the only [`StatePublisher`]. Every update
//! builds a complete new [`StreamState`] and swaps it in, so a
//! [`StateObserver`] always sees a whole snapshot, never a batch in the middle
//! of being replaced. Records are shared behind an `Arc`, so taking a snapshot
//! is cheap.

use std::sync::Arc;

use pf_core::{error::FeedError, types::Record};
use tokio::sync::watch;

/// Latest output of the stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamState {
    /// Most recent batch, in feed order.
    pub records: Arc<[Record]>,
    pub connected: bool,
    /// Description of the last transport error, cleared on a successful open.
    pub last_error: Option<String>,
}

/// Write side, held by the connection manager.
#[derive(Debug)]
pub(crate) struct StatePublisher {
    tx: watch::Sender<StreamState>,
}

impl StatePublisher {
    pub(crate) fn new() -> (Self, StateObserver) {
        let (tx, rx) = watch::channel(StreamState::default());
        (Self { tx }, StateObserver { rx })
    }

    pub(crate) fn observer(&self) -> StateObserver {
        StateObserver { rx: self.tx.subscribe() }
    }

    /// Swap in the state produced by `f`; observers are notified only when it
    /// differs from the current one.
    fn update(&self, f: impl FnOnce(&StreamState) -> StreamState) {
        self.tx.send_if_modified(|current| {
            let next = f(current);
            let changed = next.connected != current.connected
                || next.last_error != current.last_error
                || !Arc::ptr_eq(&next.records, &current.records);
            if changed {
                *current = next;
            }
            changed
        });
    }

    /// Socket opened: connected, error cleared.
    pub(crate) fn mark_open(&self) {
        self.update(|s| StreamState { connected: true, last_error: None, ..s.clone() });
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.update(|s| StreamState { connected, ..s.clone() });
    }

    pub(crate) fn set_error(&self, error: String) {
        self.update(|s| StreamState { last_error: Some(error), ..s.clone() });
    }

    /// Replace the batch wholesale. Receiving data implies connectivity.
    pub(crate) fn replace_records(&self, records: Vec<Record>) {
        let records: Arc<[Record]> = records.into();
        self.update(move |s| StreamState { records, connected: true, last_error: s.last_error.clone() });
    }
}

/// Read-only view of the stream state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StateObserver {
    rx: watch::Receiver<StreamState>,
}

impl StateObserver {
    /// The current snapshot.
    pub fn snapshot(&self) -> StreamState {
        self.rx.borrow().clone()
    }

    pub fn records(&self) -> Arc<[Record]> {
        self.rx.borrow().records.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.rx.borrow().connected
    }

    pub fn last_error(&self) -> Option<String> {
        self.rx.borrow().last_error.clone()
    }

    /// Whether a snapshot newer than the last one seen through
    /// [`StateObserver::next`] / [`StateObserver::changed`] is available.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next update. Fails with [`FeedError::Closed`] once the
    /// publishing manager is gone.
    pub async fn changed(&mut self) -> Result<(), FeedError> {
        self.rx.changed().await.map_err(|_| FeedError::Closed)
    }

    /// Wait for the next update and return it.
    pub async fn next(&mut self) -> Result<StreamState, FeedError> {
        self.changed().await?;
        Ok(self.rx.borrow_and_update().clone())
    }
}
