//! Local cache of the user's collection list.
//!
//! The remote store is the authority. The registry mirrors it, replacing the
//! whole list on every successful refresh, and applies the result of each
//! explicit CRUD call once the server has confirmed it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::gateway::{
    Collection, CollectionId, Credential, GatewayError, GatewayResult, RemoteGateway,
    DEFAULT_COLLECTION_NAME,
};
use crate::session::events::{ChangeBus, StateChange};

#[derive(Default)]
struct RegistryInner {
    collections: Vec<Collection>,
    /// Outstanding delete/rename calls per collection
    busy: HashMap<CollectionId, usize>,
    /// Ids deleted during this session. Server ids are never reused, so a
    /// list response that still carries one of these is simply behind.
    tombstones: HashSet<CollectionId>,
    refreshes_in_flight: usize,
    /// Sequence of the last issued and last applied refresh
    refresh_issued: u64,
    refresh_applied: u64,
    loaded: bool,
}

/// Immutable copy of registry state for projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub collections: Vec<Collection>,
    pub busy: HashSet<CollectionId>,
    pub loading: bool,
    /// At least one refresh has succeeded
    pub loaded: bool,
}

impl RegistrySnapshot {
    pub fn search(&self, term: &str) -> Vec<Collection> {
        filter_collections(&self.collections, term)
    }

    pub fn is_busy(&self, id: &CollectionId) -> bool {
        self.busy.contains(id)
    }

    pub fn get(&self, id: &CollectionId) -> Option<&Collection> {
        self.collections.iter().find(|c| &c.id == id)
    }
}

/// Case-insensitive substring match on the collection name, keeping list
/// order. An empty term matches everything.
pub fn filter_collections(collections: &[Collection], term: &str) -> Vec<Collection> {
    let needle = term.to_lowercase();
    collections
        .iter()
        .filter(|c| needle.is_empty() || c.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Marks a collection busy for as long as it lives.
struct BusyGuard<'a> {
    registry: &'a CollectionRegistry,
    id: CollectionId,
}

impl<'a> BusyGuard<'a> {
    fn acquire(registry: &'a CollectionRegistry, id: &CollectionId) -> Self {
        *registry.inner.lock().busy.entry(id.clone()).or_insert(0) += 1;
        registry.bus.publish(StateChange::CollectionBusy(id.clone()));
        Self {
            registry,
            id: id.clone(),
        }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        {
            let mut inner = self.registry.inner.lock();
            if let Some(count) = inner.busy.get_mut(&self.id) {
                *count -= 1;
                if *count == 0 {
                    inner.busy.remove(&self.id);
                }
            }
        }
        self.registry
            .bus
            .publish(StateChange::CollectionBusy(self.id.clone()));
    }
}

pub struct CollectionRegistry {
    gateway: Arc<dyn RemoteGateway>,
    credential: Credential,
    bus: ChangeBus,
    inner: Mutex<RegistryInner>,
}

impl CollectionRegistry {
    pub fn new(gateway: Arc<dyn RemoteGateway>, credential: Credential, bus: ChangeBus) -> Self {
        Self {
            gateway,
            credential,
            bus,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Replace the local list with the server's.
    ///
    /// On failure the previous list is kept untouched. When refreshes overlap,
    /// a response older than one already applied is ignored.
    pub async fn refresh(&self) -> GatewayResult<()> {
        let seq = {
            let mut inner = self.inner.lock();
            inner.refresh_issued += 1;
            inner.refreshes_in_flight += 1;
            inner.refresh_issued
        };
        self.bus.publish(StateChange::CollectionsChanged);
        tracing::debug!(seq, "Refreshing collections");

        let result = self.gateway.list_collections(&self.credential).await;

        {
            let mut inner = self.inner.lock();
            inner.refreshes_in_flight -= 1;
            match &result {
                Ok(collections) if seq > inner.refresh_applied => {
                    let fresh: Vec<Collection> = collections
                        .iter()
                        .filter(|c| !inner.tombstones.contains(&c.id))
                        .cloned()
                        .collect();
                    tracing::info!(seq, count = fresh.len(), "Collections refreshed");
                    inner.collections = fresh;
                    inner.refresh_applied = seq;
                    inner.loaded = true;
                }
                Ok(_) => {
                    tracing::debug!(
                        seq,
                        applied = inner.refresh_applied,
                        "Discarding out-of-date collection list"
                    );
                }
                Err(e) => {
                    tracing::warn!(seq, error = %e, "Failed to refresh collections");
                }
            }
        }
        self.bus.publish(StateChange::CollectionsChanged);

        result.map(|_| ())
    }

    /// Create a collection and reload the list so the server-assigned id and
    /// name are what the user sees.
    pub async fn create(&self, name: &str) -> GatewayResult<()> {
        let name = match name.trim() {
            "" => DEFAULT_COLLECTION_NAME,
            trimmed => trimmed,
        };
        tracing::debug!(name, "Creating collection");
        self.gateway
            .create_collection(&self.credential, name)
            .await
            .inspect_err(|e| tracing::warn!(name, error = %e, "Failed to create collection"))?;
        self.refresh().await
    }

    /// Delete a collection. A collection that is already gone remotely counts
    /// as deleted.
    pub async fn delete(&self, id: &CollectionId) -> GatewayResult<()> {
        let _busy = BusyGuard::acquire(self, id);
        tracing::debug!(collection_id = %id, "Deleting collection");

        match self.gateway.delete_collection(&self.credential, id).await {
            Ok(()) => {}
            Err(GatewayError::NotFound(_)) => {
                tracing::info!(collection_id = %id, "Collection already gone remotely");
            }
            Err(e) => {
                tracing::warn!(collection_id = %id, error = %e, "Failed to delete collection");
                return Err(e);
            }
        }

        {
            let mut inner = self.inner.lock();
            inner.collections.retain(|c| &c.id != id);
            inner.tombstones.insert(id.clone());
        }
        self.bus.publish(StateChange::CollectionsChanged);
        Ok(())
    }

    /// Rename a collection. On failure the local name is left as it was.
    pub async fn rename(&self, id: &CollectionId, name: &str) -> GatewayResult<()> {
        let _busy = BusyGuard::acquire(self, id);
        tracing::debug!(collection_id = %id, name, "Renaming collection");

        self.gateway
            .rename_collection(&self.credential, id, name)
            .await
            .inspect_err(|e| {
                tracing::warn!(collection_id = %id, error = %e, "Failed to rename collection")
            })?;

        {
            let mut inner = self.inner.lock();
            if let Some(collection) = inner.collections.iter_mut().find(|c| &c.id == id) {
                collection.name = name.to_string();
            }
        }
        self.bus.publish(StateChange::CollectionsChanged);
        Ok(())
    }

    /// Filter the local list. Never touches the remote store.
    pub fn search(&self, term: &str) -> Vec<Collection> {
        filter_collections(&self.inner.lock().collections, term)
    }

    pub fn collections(&self) -> Vec<Collection> {
        self.inner.lock().collections.clone()
    }

    pub fn get(&self, id: &CollectionId) -> Option<Collection> {
        self.inner
            .lock()
            .collections
            .iter()
            .find(|c| &c.id == id)
            .cloned()
    }

    pub fn contains(&self, id: &CollectionId) -> bool {
        self.inner.lock().collections.iter().any(|c| &c.id == id)
    }

    /// True while a delete or rename targeting `id` is outstanding
    pub fn is_busy(&self, id: &CollectionId) -> bool {
        self.inner.lock().busy.contains_key(id)
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().refreshes_in_flight > 0
    }

    /// Drop every local entry. Used when the user signs out.
    pub fn clear(&self) {
        {
            let mut inner = self.inner.lock();
            inner.collections.clear();
            inner.loaded = false;
            // Responses still in flight belong to the old session.
            inner.refresh_applied = inner.refresh_issued;
        }
        self.bus.publish(StateChange::CollectionsChanged);
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.inner.lock();
        RegistrySnapshot {
            collections: inner.collections.clone(),
            busy: inner.busy.keys().cloned().collect(),
            loading: inner.refreshes_in_flight > 0,
            loaded: inner.loaded,
        }
    }
}
