//! In-memory gateway for deterministic testing
//!
//! Implements [`RemoteGateway`] against a small in-memory store instead of a
//! real server. Every call is captured in issue order, failures can be queued
//! per call target, and calls can be *held* until the test releases them,
//! which is how tests reproduce responses arriving out of order.
//!
//! # Example
//! ```no_run
//! use chat_collections::gateway::{Collection, CollectionId, HoldKey, MockGateway};
//!
//! let gateway = MockGateway::new()
//!     .with_collections(vec![Collection::new("1", "Trip Planning")])
//!     .with_reply("It leaves at 5:00 PM.");
//!
//! // Block the next history fetch for collection "1" until released.
//! let hold = gateway.hold(HoldKey::FetchHistory(CollectionId::from("1")));
//! // ... drive the session ...
//! hold.release();
//! ```

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::gateway::error::GatewayError;
use crate::gateway::models::{
    AssistantModel, Collection, CollectionId, Credential, Message, User, DEFAULT_COLLECTION_NAME,
};
use crate::gateway::remote::{GatewayResult, RemoteGateway};

/// A call as it was issued against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    ListCollections,
    CreateCollection {
        name: String,
    },
    DeleteCollection {
        id: CollectionId,
    },
    RenameCollection {
        id: CollectionId,
        name: String,
    },
    FetchHistory {
        id: CollectionId,
    },
    SendMessage {
        id: CollectionId,
        text: String,
        model: Option<AssistantModel>,
    },
    GetCurrentUser,
    Logout,
}

/// Target used to hold or fail calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HoldKey {
    ListCollections,
    CreateCollection,
    DeleteCollection(CollectionId),
    RenameCollection(CollectionId),
    FetchHistory(CollectionId),
    SendMessage(CollectionId),
    GetCurrentUser,
    Logout,
}

impl GatewayCall {
    pub fn key(&self) -> HoldKey {
        match self {
            GatewayCall::ListCollections => HoldKey::ListCollections,
            GatewayCall::CreateCollection { .. } => HoldKey::CreateCollection,
            GatewayCall::DeleteCollection { id } => HoldKey::DeleteCollection(id.clone()),
            GatewayCall::RenameCollection { id, .. } => HoldKey::RenameCollection(id.clone()),
            GatewayCall::FetchHistory { id } => HoldKey::FetchHistory(id.clone()),
            GatewayCall::SendMessage { id, .. } => HoldKey::SendMessage(id.clone()),
            GatewayCall::GetCurrentUser => HoldKey::GetCurrentUser,
            GatewayCall::Logout => HoldKey::Logout,
        }
    }
}

/// Keeps one held call suspended until released or dropped.
#[must_use = "dropping a Hold releases the call immediately"]
pub struct Hold {
    _release: oneshot::Sender<()>,
}

impl Hold {
    /// Let the held call complete
    pub fn release(self) {}
}

struct MockState {
    user: Option<User>,
    collections: Vec<Collection>,
    histories: HashMap<CollectionId, Vec<Message>>,
    next_id: u64,
    replies: VecDeque<String>,
    calls: Vec<GatewayCall>,
    failures: HashMap<HoldKey, VecDeque<GatewayError>>,
    holds: HashMap<HoldKey, VecDeque<oneshot::Receiver<()>>>,
}

impl MockState {
    fn find(&self, id: &CollectionId) -> Option<usize> {
        self.collections.iter().position(|c| &c.id == id)
    }
}

/// Mock remote store for tests and the offline demo
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    /// Signed-in mock with no collections
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                user: Some(User {
                    id: Some("mock-user".to_string()),
                    name: Some("Mock User".to_string()),
                    email: None,
                }),
                collections: Vec::new(),
                histories: HashMap::new(),
                next_id: 1,
                replies: VecDeque::new(),
                calls: Vec::new(),
                failures: HashMap::new(),
                holds: HashMap::new(),
            }),
        }
    }

    /// Pre-seeded store used by `--demo`
    pub fn demo() -> Self {
        Self::new()
            .with_collections(vec![
                Collection::new("demo-1", "Trip Planning"),
                Collection::new("demo-2", "Recipes"),
            ])
            .with_history(
                "demo-2",
                vec![
                    Message::user("What goes into a basic vinaigrette?"),
                    Message::assistant("Three parts oil to one part vinegar, plus salt."),
                ],
            )
    }

    /// Seed the remote collection list
    pub fn with_collections(self, collections: Vec<Collection>) -> Self {
        {
            let mut state = self.state.lock();
            for collection in collections {
                state
                    .histories
                    .entry(collection.id.clone())
                    .or_default();
                state.collections.push(collection);
            }
        }
        self
    }

    /// Seed the stored transcript of a collection
    pub fn with_history(self, id: impl Into<CollectionId>, history: Vec<Message>) -> Self {
        self.state.lock().histories.insert(id.into(), history);
        self
    }

    /// Queue an assistant reply (consumed in order by sends)
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push_reply(reply);
        self
    }

    pub fn with_user(self, user: User) -> Self {
        self.state.lock().user = Some(user);
        self
    }

    /// Every call fails with `Unauthenticated` until a user is set
    pub fn signed_out(self) -> Self {
        self.state.lock().user = None;
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.state.lock().replies.push_back(reply.into());
    }

    /// Hold the next call matching `key` until the returned guard is released
    pub fn hold(&self, key: HoldKey) -> Hold {
        let (tx, rx) = oneshot::channel();
        self.state.lock().holds.entry(key).or_default().push_back(rx);
        Hold { _release: tx }
    }

    /// Fail the next call matching `key` with `error`
    pub fn fail_next(&self, key: HoldKey, error: GatewayError) {
        self.state
            .lock()
            .failures
            .entry(key)
            .or_default()
            .push_back(error);
    }

    /// Remove a collection as if another client had deleted it
    pub fn remove_remotely(&self, id: &CollectionId) {
        let mut state = self.state.lock();
        state.collections.retain(|c| &c.id != id);
        state.histories.remove(id);
    }

    /// Captured calls in issue order
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().calls.clone()
    }

    /// Number of captured calls matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&GatewayCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Remote view of the collection list
    pub fn remote_collections(&self) -> Vec<Collection> {
        self.state.lock().collections.clone()
    }

    /// Remote view of a transcript
    pub fn remote_history(&self, id: &CollectionId) -> Option<Vec<Message>> {
        self.state.lock().histories.get(id).cloned()
    }

    /// Record the call, wait on any hold, then apply queued failures and the
    /// authentication check.
    async fn begin(&self, call: GatewayCall) -> GatewayResult<()> {
        let key = call.key();
        let held = {
            let mut state = self.state.lock();
            state.calls.push(call);
            state.holds.get_mut(&key).and_then(|queue| queue.pop_front())
        };

        if let Some(rx) = held {
            // A dropped sender releases the call too.
            let _ = rx.await;
        }

        let mut state = self.state.lock();
        if let Some(error) = state.failures.get_mut(&key).and_then(|q| q.pop_front()) {
            return Err(error);
        }
        if state.user.is_none() {
            return Err(GatewayError::Unauthenticated);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteGateway for MockGateway {
    async fn list_collections(&self, _credential: &Credential) -> GatewayResult<Vec<Collection>> {
        self.begin(GatewayCall::ListCollections).await?;
        Ok(self.state.lock().collections.clone())
    }

    async fn create_collection(&self, _credential: &Credential, name: &str) -> GatewayResult<()> {
        self.begin(GatewayCall::CreateCollection {
            name: name.to_string(),
        })
        .await?;

        let mut state = self.state.lock();
        let id = CollectionId::from_string(format!("mock-{}", state.next_id));
        state.next_id += 1;
        let name = if name.trim().is_empty() {
            DEFAULT_COLLECTION_NAME.to_string()
        } else {
            name.to_string()
        };
        state.histories.insert(id.clone(), Vec::new());
        state.collections.push(Collection { id, name });
        Ok(())
    }

    async fn delete_collection(
        &self,
        _credential: &Credential,
        id: &CollectionId,
    ) -> GatewayResult<()> {
        self.begin(GatewayCall::DeleteCollection { id: id.clone() })
            .await?;

        let mut state = self.state.lock();
        let index = state
            .find(id)
            .ok_or_else(|| GatewayError::NotFound(format!("Collection {} not found", id)))?;
        state.collections.remove(index);
        state.histories.remove(id);
        Ok(())
    }

    async fn rename_collection(
        &self,
        _credential: &Credential,
        id: &CollectionId,
        name: &str,
    ) -> GatewayResult<()> {
        self.begin(GatewayCall::RenameCollection {
            id: id.clone(),
            name: name.to_string(),
        })
        .await?;

        if name.trim().is_empty() {
            return Err(GatewayError::Invalid("Name cannot be empty".to_string()));
        }
        let mut state = self.state.lock();
        let index = state
            .find(id)
            .ok_or_else(|| GatewayError::NotFound(format!("Collection {} not found", id)))?;
        state.collections[index].name = name.to_string();
        Ok(())
    }

    async fn fetch_history(
        &self,
        _credential: &Credential,
        id: &CollectionId,
    ) -> GatewayResult<Vec<Message>> {
        self.begin(GatewayCall::FetchHistory { id: id.clone() })
            .await?;

        self.state
            .lock()
            .histories
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("Collection {} not found", id)))
    }

    async fn send_message(
        &self,
        _credential: &Credential,
        id: &CollectionId,
        text: &str,
        model: Option<AssistantModel>,
    ) -> GatewayResult<String> {
        self.begin(GatewayCall::SendMessage {
            id: id.clone(),
            text: text.to_string(),
            model,
        })
        .await?;

        if text.trim().is_empty() {
            return Err(GatewayError::Invalid("Message cannot be empty".to_string()));
        }
        let mut state = self.state.lock();
        let reply = state
            .replies
            .pop_front()
            .unwrap_or_else(|| format!("Echo: {}", text));
        let history = state
            .histories
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(format!("Collection {} not found", id)))?;
        history.push(Message::user(text));
        history.push(Message::assistant(reply.clone()));
        Ok(reply)
    }

    async fn get_current_user(&self, _credential: &Credential) -> GatewayResult<User> {
        self.begin(GatewayCall::GetCurrentUser).await?;
        self.state
            .lock()
            .user
            .clone()
            .ok_or(GatewayError::Unauthenticated)
    }

    async fn logout(&self, _credential: &Credential) -> GatewayResult<()> {
        self.begin(GatewayCall::Logout).await?;
        self.state.lock().user = None;
        Ok(())
    }
}
