//! HTTP gateway tests against a local axum server
//!
//! The server imitates the collection service's JSON routes closely enough
//! to check request shapes, the session cookie and status mapping.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use chat_collections::gateway::{
    AssistantModel, CollectionId, Credential, GatewayError, HttpGateway, Message, RemoteGateway,
};
use chat_collections::session::{SessionError, SessionManager};

const GOOD_TOKEN: &str = "good-token";
/// Accepted as a cookie, but the service answers 200 with an error body
const STALE_TOKEN: &str = "stale-token";
/// Accepted as a cookie, but the service answers success with no user
const ANONYMOUS_TOKEN: &str = "anonymous-token";

/// Requests the server saw, as (route, body)
#[derive(Clone, Default)]
struct Recorded(Arc<Mutex<Vec<(String, Value)>>>);

impl Recorded {
    fn push(&self, route: impl Into<String>, body: Value) {
        self.0.lock().push((route.into(), body));
    }

    fn all(&self) -> Vec<(String, Value)> {
        self.0.lock().clone()
    }
}

fn has_session(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(';').any(|c| c.trim() == format!("session={}", token)))
}

fn signed_in(headers: &HeaderMap) -> bool {
    has_session(headers, GOOD_TOKEN)
}

fn unauthorized() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"status": "error", "message": "Not authenticated"})),
    )
        .into_response()
}

async fn current_user(headers: HeaderMap) -> axum::response::Response {
    if has_session(&headers, STALE_TOKEN) {
        return Json(json!({"status": "error", "message": "Not logged in"})).into_response();
    }
    if has_session(&headers, ANONYMOUS_TOKEN) {
        return Json(json!({"status": "success", "user": null})).into_response();
    }
    if !signed_in(&headers) {
        return unauthorized();
    }
    Json(json!({
        "status": "success",
        "user": {"id": "u1", "name": "Ada", "email": "ada@example.test"}
    }))
    .into_response()
}

async fn list_collections(headers: HeaderMap) -> axum::response::Response {
    if !signed_in(&headers) {
        return unauthorized();
    }
    Json(json!({
        "status": "success",
        "collections": [
            {"collectionId": "c1", "name": "Trip Planning"},
            {"collectionId": "c2", "name": "Groceries"}
        ]
    }))
    .into_response()
}

async fn create_collection(
    State(recorded): State<Recorded>,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorded.push("create", body);
    Json(json!({"status": "success", "collectionId": "c3"}))
}

async fn delete_collection(
    State(recorded): State<Recorded>,
    Path(id): Path<String>,
) -> axum::response::Response {
    recorded.push("delete", json!(id));
    if id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"status": "error", "message": "Collection not found"})),
        )
            .into_response();
    }
    Json(json!({"status": "success"})).into_response()
}

async fn rename_collection(
    State(recorded): State<Recorded>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let empty = body["newName"].as_str().map_or(true, str::is_empty);
    recorded.push("rename", body);
    if empty {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "message": "New name is required"})),
        )
            .into_response();
    }
    Json(json!({"status": "success"})).into_response()
}

async fn history(State(recorded): State<Recorded>, Path(id): Path<String>) -> Json<Value> {
    recorded.push("history", json!(id));
    if id == "legacy" {
        return Json(json!({
            "status": "success",
            "chatHistory": [
                {"sender": "user", "text": "Is it raining?"},
                {"sender": "bot", "text": "Not right now."}
            ]
        }));
    }
    Json(json!({
        "status": "success",
        "chatHistory": [
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hello"}
        ]
    }))
}

async fn chat(
    State(recorded): State<Recorded>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    recorded.push(format!("chat:{}", id), body.clone());
    match id.as_str() {
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream model crashed").into_response(),
        "soft" => Json(json!({"status": "error", "message": "Model unavailable"})).into_response(),
        _ => {
            let model = body["model"].as_str().unwrap_or("default");
            let message = body["message"].as_str().unwrap_or_default();
            Json(json!({"status": "success", "response": format!("[{}] {}", model, message)}))
                .into_response()
        }
    }
}

async fn logout(State(recorded): State<Recorded>) -> Json<Value> {
    recorded.push("logout", Value::Null);
    Json(json!({"status": "success"}))
}

/// Start the fake service on an ephemeral port.
async fn spawn_server() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/api/user", get(current_user))
        .route(
            "/api/collections",
            get(list_collections).post(create_collection),
        )
        .route("/api/collections/{id}", delete(delete_collection))
        .route("/api/rename_collection", post(rename_collection))
        .route("/api/collections/{id}/history", get(history))
        .route("/api/collections/{id}/chat", post(chat))
        .route("/api/logout", post(logout))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });

    (format!("http://{}/", addr), recorded)
}

fn good() -> Credential {
    Credential::new(GOOD_TOKEN)
}

#[tokio::test]
async fn test_user_and_collections_with_cookie() {
    let (url, _) = spawn_server().await;
    let gateway = HttpGateway::new(url);

    let user = gateway.get_current_user(&good()).await.unwrap();
    assert_eq!(user.display_name(), "Ada");

    let collections = gateway.list_collections(&good()).await.unwrap();
    let ids: Vec<_> = collections.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2"]);
    assert_eq!(collections[0].name, "Trip Planning");
}

#[tokio::test]
async fn test_missing_or_bad_credential_is_unauthenticated() {
    let (url, _) = spawn_server().await;
    let gateway = HttpGateway::new(url);

    assert_eq!(
        gateway.get_current_user(&Credential::new("")).await.unwrap_err(),
        GatewayError::Unauthenticated
    );
    assert_eq!(
        gateway
            .list_collections(&Credential::new("expired"))
            .await
            .unwrap_err(),
        GatewayError::Unauthenticated
    );
}

#[tokio::test]
async fn test_error_body_on_user_check_is_unauthenticated() {
    let (url, _) = spawn_server().await;
    let gateway = HttpGateway::new(url.clone());

    for token in [STALE_TOKEN, ANONYMOUS_TOKEN] {
        assert_eq!(
            gateway
                .get_current_user(&Credential::new(token))
                .await
                .unwrap_err(),
            GatewayError::Unauthenticated,
            "token {}",
            token
        );
    }

    let manager = SessionManager::new(Arc::new(gateway), Credential::new(STALE_TOKEN));
    assert!(matches!(
        manager.bootstrap().await,
        Err(SessionError::LoginRequired)
    ));
    assert!(manager.user().is_none());
}

#[tokio::test]
async fn test_ids_are_sent_as_one_path_segment() {
    let (url, recorded) = spawn_server().await;
    let gateway = HttpGateway::new(url);
    let odd = CollectionId::from("c1?x=1/y#z");

    let history = gateway.fetch_history(&good(), &odd).await.unwrap();
    assert_eq!(history, vec![Message::user("hi"), Message::assistant("hello")]);
    gateway.send_message(&good(), &odd, "hi", None).await.unwrap();
    gateway.delete_collection(&good(), &odd).await.unwrap();

    assert_eq!(
        recorded.all(),
        vec![
            ("history".to_string(), json!("c1?x=1/y#z")),
            ("chat:c1?x=1/y#z".to_string(), json!({"message": "hi"})),
            ("delete".to_string(), json!("c1?x=1/y#z")),
        ]
    );
}

#[tokio::test]
async fn test_custom_cookie_name_is_used() {
    let (url, _) = spawn_server().await;
    let gateway = HttpGateway::new(url).with_cookie_name("sid");

    // The fake service only knows the "session" cookie.
    assert_eq!(
        gateway.get_current_user(&good()).await.unwrap_err(),
        GatewayError::Unauthenticated
    );
}

#[tokio::test]
async fn test_mutation_request_shapes() {
    let (url, recorded) = spawn_server().await;
    let gateway = HttpGateway::new(url);

    gateway.create_collection(&good(), "Road trip").await.unwrap();
    gateway
        .rename_collection(&good(), &CollectionId::from("c1"), "Summer")
        .await
        .unwrap();
    gateway
        .delete_collection(&good(), &CollectionId::from("c2"))
        .await
        .unwrap();
    gateway.logout(&good()).await.unwrap();

    assert_eq!(
        recorded.all(),
        vec![
            ("create".to_string(), json!({"name": "Road trip"})),
            (
                "rename".to_string(),
                json!({"collectionId": "c1", "newName": "Summer"})
            ),
            ("delete".to_string(), json!("c2")),
            ("logout".to_string(), Value::Null),
        ]
    );
}

#[tokio::test]
async fn test_status_mapping() {
    let (url, _) = spawn_server().await;
    let gateway = HttpGateway::new(url);

    let err = gateway
        .delete_collection(&good(), &CollectionId::from("missing"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = gateway
        .rename_collection(&good(), &CollectionId::from("c1"), "")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Invalid(_)));

    let err = gateway
        .send_message(&good(), &CollectionId::from("broken"), "hi", None)
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    let err = gateway
        .send_message(&good(), &CollectionId::from("soft"), "hi", None)
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::Transient("Model unavailable".into()));
}

#[tokio::test]
async fn test_history_accepts_both_message_shapes() {
    let (url, _) = spawn_server().await;
    let gateway = HttpGateway::new(url);

    let current = gateway
        .fetch_history(&good(), &CollectionId::from("c1"))
        .await
        .unwrap();
    assert_eq!(current, vec![Message::user("hi"), Message::assistant("hello")]);

    let legacy = gateway
        .fetch_history(&good(), &CollectionId::from("legacy"))
        .await
        .unwrap();
    assert_eq!(
        legacy,
        vec![
            Message::user("Is it raining?"),
            Message::assistant("Not right now.")
        ]
    );
}

#[tokio::test]
async fn test_chat_carries_model_when_chosen() {
    let (url, recorded) = spawn_server().await;
    let gateway = HttpGateway::new(url);
    let id = CollectionId::from("c1");

    let reply = gateway.send_message(&good(), &id, "hi", None).await.unwrap();
    assert_eq!(reply, "[default] hi");

    let reply = gateway
        .send_message(&good(), &id, "hi", Some(AssistantModel::WizardLm))
        .await
        .unwrap();
    assert_eq!(reply, "[wizardlm] hi");

    let bodies: Vec<_> = recorded
        .all()
        .into_iter()
        .filter(|(route, _)| route.starts_with("chat:"))
        .map(|(_, body)| body)
        .collect();
    assert_eq!(
        bodies,
        vec![
            json!({"message": "hi"}),
            json!({"message": "hi", "model": "wizardlm"})
        ]
    );
}

#[tokio::test]
async fn test_manager_bootstrap_over_http() {
    let (url, _) = spawn_server().await;

    let manager = SessionManager::new(Arc::new(HttpGateway::new(url.clone())), good());
    let user = manager.bootstrap().await.unwrap();
    assert_eq!(user.display_name(), "Ada");
    assert_eq!(manager.registry().collections().len(), 2);

    let manager = SessionManager::new(Arc::new(HttpGateway::new(url)), Credential::new(""));
    assert!(matches!(
        manager.bootstrap().await,
        Err(SessionError::LoginRequired)
    ));
}
