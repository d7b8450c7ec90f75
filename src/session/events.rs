//! Change notifications for observers of registry and session state.

use tokio::sync::broadcast;

use crate::gateway::CollectionId;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Published after every state mutation. Observers re-read snapshots and
/// recompute their projection; the payload only says what moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    /// The collection list was replaced or an entry changed
    CollectionsChanged,
    /// A delete or rename targeting this collection started or finished
    CollectionBusy(CollectionId),
    /// Active session state, target or history changed
    SessionChanged,
    /// Local state was dropped after logout
    SignedOut,
}

/// Fan-out publisher shared by the registry and the session controller.
#[derive(Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<StateChange>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.tx.subscribe()
    }

    pub fn publish(&self, change: StateChange) {
        // No subscribers is fine.
        let _ = self.tx.send(change);
    }
}
