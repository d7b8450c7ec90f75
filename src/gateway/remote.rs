use async_trait::async_trait;

use crate::gateway::error::GatewayError;
use crate::gateway::models::{AssistantModel, Collection, CollectionId, Credential, Message, User};

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Typed boundary to the remote collection and chat service.
///
/// Implementations only build requests and decode responses. They hold no
/// state across calls, cache nothing and never retry.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// List every collection owned by the authenticated user
    async fn list_collections(&self, credential: &Credential) -> GatewayResult<Vec<Collection>>;

    /// Create a collection. The server assigns the id.
    async fn create_collection(&self, credential: &Credential, name: &str) -> GatewayResult<()>;

    async fn delete_collection(&self, credential: &Credential, id: &CollectionId)
        -> GatewayResult<()>;

    async fn rename_collection(
        &self,
        credential: &Credential,
        id: &CollectionId,
        name: &str,
    ) -> GatewayResult<()>;

    /// Fetch the full transcript of one collection
    async fn fetch_history(
        &self,
        credential: &Credential,
        id: &CollectionId,
    ) -> GatewayResult<Vec<Message>>;

    /// Send a user message and return the assistant's reply text
    async fn send_message(
        &self,
        credential: &Credential,
        id: &CollectionId,
        text: &str,
        model: Option<AssistantModel>,
    ) -> GatewayResult<String>;

    async fn get_current_user(&self, credential: &Credential) -> GatewayResult<User>;

    /// Invalidate the session on the server
    async fn logout(&self, credential: &Credential) -> GatewayResult<()>;
}
