//! Shared test utilities for chat-collections
//!
//! Fixtures for building a session core on top of the in-memory gateway,
//! plus helpers for waiting on calls that tests hold open.

use std::sync::Arc;
use std::time::Duration;

use chat_collections::gateway::{Collection, Credential, GatewayCall, MockGateway};
use chat_collections::SessionManager;

/// Collections most tests start from
pub fn sample_collections() -> Vec<Collection> {
    vec![
        Collection::new("1", "Trip Planning"),
        Collection::new("2", "Groceries"),
        Collection::new("3", "Road Trip Snacks"),
    ]
}

/// A bootstrapped manager on top of `gateway`
pub async fn signed_in(gateway: Arc<MockGateway>) -> Arc<SessionManager> {
    let manager = Arc::new(SessionManager::new(gateway, Credential::new("test-token")));
    manager
        .bootstrap()
        .await
        .expect("bootstrap against the mock should succeed");
    manager
}

/// Wait until `gateway` has captured at least `count` calls matching
/// `predicate`. Panics after a couple of seconds.
pub async fn wait_for_calls(
    gateway: &MockGateway,
    count: usize,
    predicate: impl Fn(&GatewayCall) -> bool,
) {
    let wait = async {
        while gateway.count_calls(&predicate) < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    if tokio::time::timeout(Duration::from_secs(2), wait).await.is_err() {
        panic!(
            "timed out waiting for {} matching calls; saw {:?}",
            count,
            gateway.calls()
        );
    }
}

pub fn is_fetch(id: &'static str) -> impl Fn(&GatewayCall) -> bool {
    move |call| matches!(call, GatewayCall::FetchHistory { id: c } if c.as_str() == id)
}

pub fn is_send(call: &GatewayCall) -> bool {
    matches!(call, GatewayCall::SendMessage { .. })
}

pub fn is_rename(call: &GatewayCall) -> bool {
    matches!(call, GatewayCall::RenameCollection { .. })
}
