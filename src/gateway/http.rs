//! HTTP implementation of [`RemoteGateway`].

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::gateway::error::GatewayError;
use crate::gateway::models::{AssistantModel, Collection, CollectionId, Credential, Message, User};
use crate::gateway::remote::{GatewayResult, RemoteGateway};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5050";
pub const DEFAULT_COOKIE_NAME: &str = "session";

const STATUS_SUCCESS: &str = "success";

#[derive(Debug, Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct RenameCollectionRequest<'a> {
    #[serde(rename = "collectionId")]
    collection_id: &'a str,
    #[serde(rename = "newName")]
    new_name: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'static str>,
}

/// Every response carries a `status` string next to its payload fields.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Deserialize)]
struct Empty {}

#[derive(Debug, Deserialize)]
struct CollectionsBody {
    #[serde(default)]
    collections: Vec<Collection>,
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    #[serde(rename = "chatHistory", default)]
    chat_history: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    response: String,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    #[serde(default)]
    user: Option<User>,
}

/// Talks to the collection service over JSON/HTTP.
#[derive(Clone)]
pub struct HttpGateway {
    base_url: String,
    cookie_name: String,
    client: Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/api/collections/{id}[/{action}]` with the id percent-encoded as a
    /// single path segment.
    fn collection_url(&self, id: &CollectionId, action: Option<&str>) -> GatewayResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GatewayError::Invalid(format!("Bad base URL '{}': {}", self.base_url, e)))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                GatewayError::Invalid(format!("Base URL '{}' cannot have a path", self.base_url))
            })?;
            segments.pop_if_empty().extend(["api", "collections", id.as_str()]);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        if credential.is_empty() {
            return request;
        }
        request.header(COOKIE, format!("{}={}", self.cookie_name, credential.token()))
    }

    /// Send the request and decode the envelope without judging its status.
    async fn fetch_envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        credential: &Credential,
    ) -> GatewayResult<Envelope<T>> {
        let response = self.authorize(request, credential).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::debug!(status = %status, "Gateway request failed");
            return Err(GatewayError::from_status(status, &text));
        }

        let text = if text.trim().is_empty() { "{}" } else { &text };
        Ok(serde_json::from_str(text)?)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        credential: &Credential,
    ) -> GatewayResult<T> {
        let envelope: Envelope<T> = self.fetch_envelope(request, credential).await?;

        match envelope.status.as_deref() {
            None | Some(STATUS_SUCCESS) => Ok(envelope.body),
            Some(other) => Err(GatewayError::Transient(
                envelope
                    .message
                    .unwrap_or_else(|| format!("Unexpected response status '{}'", other)),
            )),
        }
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn list_collections(&self, credential: &Credential) -> GatewayResult<Vec<Collection>> {
        let request = self.client.get(self.url("/api/collections"));
        let body: CollectionsBody = self.execute(request, credential).await?;
        Ok(body.collections)
    }

    async fn create_collection(&self, credential: &Credential, name: &str) -> GatewayResult<()> {
        let request = self
            .client
            .post(self.url("/api/collections"))
            .json(&CreateCollectionRequest { name });
        let _: Empty = self.execute(request, credential).await?;
        Ok(())
    }

    async fn delete_collection(
        &self,
        credential: &Credential,
        id: &CollectionId,
    ) -> GatewayResult<()> {
        let request = self.client.delete(self.collection_url(id, None)?);
        let _: Empty = self.execute(request, credential).await?;
        Ok(())
    }

    async fn rename_collection(
        &self,
        credential: &Credential,
        id: &CollectionId,
        name: &str,
    ) -> GatewayResult<()> {
        let request = self
            .client
            .post(self.url("/api/rename_collection"))
            .json(&RenameCollectionRequest {
                collection_id: id.as_str(),
                new_name: name,
            });
        let _: Empty = self.execute(request, credential).await?;
        Ok(())
    }

    async fn fetch_history(
        &self,
        credential: &Credential,
        id: &CollectionId,
    ) -> GatewayResult<Vec<Message>> {
        let request = self
            .client
            .get(self.collection_url(id, Some("history"))?);
        let body: HistoryBody = self.execute(request, credential).await?;
        Ok(body.chat_history)
    }

    async fn send_message(
        &self,
        credential: &Credential,
        id: &CollectionId,
        text: &str,
        model: Option<AssistantModel>,
    ) -> GatewayResult<String> {
        let request = self
            .client
            .post(self.collection_url(id, Some("chat"))?)
            .json(&ChatRequest {
                message: text,
                model: model.map(|m| m.as_str()),
            });
        let body: ChatBody = self.execute(request, credential).await?;
        Ok(body.response)
    }

    async fn get_current_user(&self, credential: &Credential) -> GatewayResult<User> {
        let request = self.client.get(self.url("/api/user"));
        // Anything short of a successful body naming a user means signed out.
        let envelope: Envelope<UserBody> = self.fetch_envelope(request, credential).await?;
        match (envelope.status.as_deref(), envelope.body.user) {
            (None | Some(STATUS_SUCCESS), Some(user)) => Ok(user),
            (status, _) => {
                tracing::debug!(status = ?status, message = ?envelope.message, "User check rejected");
                Err(GatewayError::Unauthenticated)
            }
        }
    }

    async fn logout(&self, credential: &Credential) -> GatewayResult<()> {
        let request = self.client.post(self.url("/api/logout"));
        let _: Empty = self.execute(request, credential).await?;
        Ok(())
    }
}
