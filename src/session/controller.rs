//! The active conversation: which collection is open, its transcript, and
//! the send/receive protocol.
//!
//! Every history fetch and chat send is tagged with the session generation
//! at issue time. The generation moves whenever the open collection changes
//! (open, back, delete), and a response is applied only if its tag still
//! matches. That is the only "cancellation" there is; requests themselves
//! always run to completion.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::gateway::{
    AssistantModel, CollectionId, Credential, GatewayError, GatewayResult, Message,
    RemoteGateway,
};
use crate::session::events::{ChangeBus, StateChange};
use crate::session::registry::CollectionRegistry;
use crate::util::text::auto_title;

/// Lifecycle of the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No collection open
    #[default]
    Idle,
    /// History fetch in flight
    Loading,
    /// History loaded, nothing in flight
    Ready,
    /// A chat send is in flight
    Sending,
}

impl SessionState {
    /// A fetch or send is outstanding
    pub fn is_pending(self) -> bool {
        matches!(self, SessionState::Loading | SessionState::Sending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::Sending => "sending",
        }
    }
}

/// Result of [`ActiveSessionController::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// History loaded and shown
    Opened,
    /// Back to no open collection
    Closed,
    /// The user moved on before the fetch resolved; response discarded
    Stale,
}

/// Result of [`ActiveSessionController::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty text, nothing open, or a fetch/send already outstanding
    Ignored,
    /// Assistant reply appended
    Replied,
    /// The session changed before the reply arrived; response discarded
    Stale,
}

/// Identifies the session incarnation a request was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestTag {
    generation: u64,
    collection_id: CollectionId,
}

#[derive(Default)]
struct SessionInner {
    collection_id: Option<CollectionId>,
    history: Vec<Message>,
    state: SessionState,
    generation: u64,
    model: Option<AssistantModel>,
}

impl SessionInner {
    fn reset(&mut self) {
        self.collection_id = None;
        self.history.clear();
        self.state = SessionState::Idle;
    }

    fn matches(&self, tag: &RequestTag) -> bool {
        self.generation == tag.generation && self.collection_id.as_ref() == Some(&tag.collection_id)
    }
}

/// Immutable copy of session state for projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub collection_id: Option<CollectionId>,
    pub history: Vec<Message>,
    pub state: SessionState,
    pub model: Option<AssistantModel>,
}

/// Transcript entry shown in place of an assistant reply when a send fails.
pub fn error_entry(error: &GatewayError) -> Message {
    let text = match error {
        GatewayError::Unauthenticated => {
            "Error: your session has expired. Please log in again.".to_string()
        }
        GatewayError::Invalid(detail) => {
            format!("Error: the message was rejected ({}).", detail)
        }
        GatewayError::Transient(detail) => format!(
            "Error: could not reach the assistant ({}). Please try again.",
            detail
        ),
        GatewayError::NotFound(detail) => {
            format!("Error: this collection no longer exists ({}).", detail)
        }
    };
    Message::assistant(text)
}

pub struct ActiveSessionController {
    gateway: Arc<dyn RemoteGateway>,
    credential: Credential,
    registry: Arc<CollectionRegistry>,
    bus: ChangeBus,
    inner: Mutex<SessionInner>,
}

impl ActiveSessionController {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        credential: Credential,
        registry: Arc<CollectionRegistry>,
        bus: ChangeBus,
    ) -> Self {
        Self {
            gateway,
            credential,
            registry,
            bus,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    /// Open a collection, or go back to no collection with `None`.
    ///
    /// Opening replaces the transcript with the freshly fetched one. If
    /// another `open` (or a delete of this collection) happens before the
    /// fetch resolves, the response is discarded.
    pub async fn open(&self, target: Option<CollectionId>) -> GatewayResult<OpenOutcome> {
        let Some(id) = target else {
            self.close();
            return Ok(OpenOutcome::Closed);
        };

        let tag = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.collection_id = Some(id.clone());
            inner.history.clear();
            inner.state = SessionState::Loading;
            RequestTag {
                generation: inner.generation,
                collection_id: id.clone(),
            }
        };
        self.bus.publish(StateChange::SessionChanged);
        tracing::info!(collection_id = %id, generation = tag.generation, "Opening collection");

        match self.gateway.fetch_history(&self.credential, &id).await {
            Ok(history) => {
                let count = history.len();
                let applied = self.apply_if_current(&tag, |inner| {
                    inner.history = history;
                    inner.state = SessionState::Ready;
                });
                if applied {
                    tracing::info!(collection_id = %id, messages = count, "Collection history loaded");
                    Ok(OpenOutcome::Opened)
                } else {
                    tracing::warn!(collection_id = %id, "Discarding stale history response");
                    Ok(OpenOutcome::Stale)
                }
            }
            Err(error) => {
                let applied = self.apply_if_current(&tag, SessionInner::reset);
                if !applied && !matches!(error, GatewayError::Unauthenticated) {
                    tracing::warn!(collection_id = %id, error = %error, "Discarding stale history failure");
                    return Ok(OpenOutcome::Stale);
                }
                tracing::warn!(collection_id = %id, error = %error, "Failed to load collection history");
                if applied && error.is_not_found() {
                    self.reconcile_registry().await;
                }
                Err(error)
            }
        }
    }

    /// Back navigation: drop the open collection from any state.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.reset();
        }
        self.bus.publish(StateChange::SessionChanged);
        tracing::debug!("Session closed");
    }

    /// Send a message in the open collection.
    ///
    /// A no-op unless the session is `Ready` and `text` has non-whitespace
    /// content. The user message is appended before any request is issued.
    /// The first message of an empty transcript also renames the collection,
    /// concurrently with the chat call.
    pub async fn send(&self, text: &str) -> GatewayResult<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let (tag, first_message, model) = {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Ready {
                tracing::debug!(state = inner.state.as_str(), "Ignoring send while not ready");
                return Ok(SendOutcome::Ignored);
            }
            let Some(collection_id) = inner.collection_id.clone() else {
                return Ok(SendOutcome::Ignored);
            };
            let first_message = inner.history.is_empty();
            inner.history.push(Message::user(text));
            inner.state = SessionState::Sending;
            (
                RequestTag {
                    generation: inner.generation,
                    collection_id,
                },
                first_message,
                inner.model,
            )
        };
        self.bus.publish(StateChange::SessionChanged);
        tracing::debug!(collection_id = %tag.collection_id, first_message, "Sending message");

        let chat = self.deliver(&tag, text, model);
        if !first_message {
            return chat.await;
        }

        let title = auto_title(text);
        let rename = async {
            if let Err(e) = self.registry.rename(&tag.collection_id, &title).await {
                tracing::warn!(
                    collection_id = %tag.collection_id,
                    error = %e,
                    "Failed to name collection from first message"
                );
            }
        };
        let (outcome, ()) = futures::join!(chat, rename);
        outcome
    }

    async fn deliver(
        &self,
        tag: &RequestTag,
        text: &str,
        model: Option<AssistantModel>,
    ) -> GatewayResult<SendOutcome> {
        let result = self
            .gateway
            .send_message(&self.credential, &tag.collection_id, text, model)
            .await;

        match result {
            Ok(reply) => {
                let applied = self.apply_if_current(tag, |inner| {
                    inner.history.push(Message::assistant(reply));
                    inner.state = SessionState::Ready;
                });
                if applied {
                    Ok(SendOutcome::Replied)
                } else {
                    tracing::warn!(collection_id = %tag.collection_id, "Discarding stale chat reply");
                    Ok(SendOutcome::Stale)
                }
            }
            Err(error) if error.is_not_found() => {
                if !self.apply_if_current(tag, SessionInner::reset) {
                    return Ok(SendOutcome::Stale);
                }
                tracing::warn!(collection_id = %tag.collection_id, "Collection vanished during send");
                self.reconcile_registry().await;
                Err(error)
            }
            Err(error) => {
                let entry = error_entry(&error);
                let applied = self.apply_if_current(tag, |inner| {
                    inner.history.push(entry);
                    inner.state = SessionState::Ready;
                });
                tracing::warn!(
                    collection_id = %tag.collection_id,
                    error = %error,
                    applied,
                    "Chat send failed"
                );
                if applied || matches!(error, GatewayError::Unauthenticated) {
                    Err(error)
                } else {
                    Ok(SendOutcome::Stale)
                }
            }
        }
    }

    /// Clear the session if `id` is the open collection. Returns whether it was.
    pub fn retire(&self, id: &CollectionId) -> bool {
        let retired = {
            let mut inner = self.inner.lock();
            if inner.collection_id.as_ref() == Some(id) {
                inner.generation += 1;
                inner.reset();
                true
            } else {
                false
            }
        };
        if retired {
            tracing::info!(collection_id = %id, "Active collection removed; session closed");
            self.bus.publish(StateChange::SessionChanged);
        }
        retired
    }

    /// Model attached to subsequent sends
    pub fn set_model(&self, model: Option<AssistantModel>) {
        self.inner.lock().model = model;
        self.bus.publish(StateChange::SessionChanged);
    }

    pub fn model(&self) -> Option<AssistantModel> {
        self.inner.lock().model
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn collection_id(&self) -> Option<CollectionId> {
        self.inner.lock().collection_id.clone()
    }

    pub fn history(&self) -> Vec<Message> {
        self.inner.lock().history.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            collection_id: inner.collection_id.clone(),
            history: inner.history.clone(),
            state: inner.state,
            model: inner.model,
        }
    }

    fn apply_if_current(&self, tag: &RequestTag, apply: impl FnOnce(&mut SessionInner)) -> bool {
        {
            let mut inner = self.inner.lock();
            if !inner.matches(tag) {
                return false;
            }
            apply(&mut inner);
        }
        self.bus.publish(StateChange::SessionChanged);
        true
    }

    /// The open collection disappeared remotely; bring the list back in line.
    async fn reconcile_registry(&self) {
        if let Err(e) = self.registry.refresh().await {
            tracing::warn!(error = %e, "Failed to refresh collections after a vanished collection");
        }
    }
}
