//! Composition root of the session core.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::gateway::{CollectionId, Credential, GatewayError, RemoteGateway, User};
use crate::session::controller::ActiveSessionController;
use crate::session::events::{ChangeBus, StateChange};
use crate::session::projection::{ViewProjection, ViewState};
use crate::session::registry::CollectionRegistry;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The user must sign in again before anything else can happen.
    #[error("Login required")]
    LoginRequired,

    #[error(transparent)]
    Gateway(GatewayError),
}

impl From<GatewayError> for SessionError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthenticated => SessionError::LoginRequired,
            other => SessionError::Gateway(other),
        }
    }
}

/// Owns the gateway, credential, registry, controller and change bus for one
/// signed-in session, and wires the operations that span registry and
/// controller.
pub struct SessionManager {
    gateway: Arc<dyn RemoteGateway>,
    credential: Credential,
    bus: ChangeBus,
    registry: Arc<CollectionRegistry>,
    controller: Arc<ActiveSessionController>,
    user: Mutex<Option<User>>,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn RemoteGateway>, credential: Credential) -> Self {
        let bus = ChangeBus::new();
        let registry = Arc::new(CollectionRegistry::new(
            gateway.clone(),
            credential.clone(),
            bus.clone(),
        ));
        let controller = Arc::new(ActiveSessionController::new(
            gateway.clone(),
            credential.clone(),
            registry.clone(),
            bus.clone(),
        ));
        Self {
            gateway,
            credential,
            bus,
            registry,
            controller,
            user: Mutex::new(None),
        }
    }

    /// Check who is signed in. Nothing else may run until this succeeds.
    pub async fn sign_in(&self) -> Result<User, SessionError> {
        let user = self
            .gateway
            .get_current_user(&self.credential)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "User check failed"))?;
        tracing::info!(user = user.display_name(), "Signed in");
        *self.user.lock() = Some(user.clone());
        Ok(user)
    }

    /// Gate access on the current user, then load the collection list.
    pub async fn bootstrap(&self) -> Result<User, SessionError> {
        let user = self.sign_in().await?;
        self.registry.refresh().await?;
        Ok(user)
    }

    /// Delete a collection and close the session if it was the open one.
    pub async fn delete_collection(&self, id: &CollectionId) -> Result<(), SessionError> {
        self.registry.delete(id).await?;
        self.controller.retire(id);
        Ok(())
    }

    /// End the session remotely and drop all local state.
    ///
    /// Local state is dropped even when the logout call fails; the caller
    /// must re-authenticate either way.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let result = self.gateway.logout(&self.credential).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Logout call failed; clearing local state anyway");
        }

        self.controller.close();
        self.registry.clear();
        *self.user.lock() = None;
        self.bus.publish(StateChange::SignedOut);
        tracing::info!("Signed out");

        match result {
            Ok(()) | Err(GatewayError::Unauthenticated) => Ok(()),
            Err(e) => Err(SessionError::Gateway(e)),
        }
    }

    pub fn user(&self) -> Option<User> {
        self.user.lock().clone()
    }

    pub fn registry(&self) -> &Arc<CollectionRegistry> {
        &self.registry
    }

    pub fn controller(&self) -> &Arc<ActiveSessionController> {
        &self.controller
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    /// Current view for the given projection
    pub fn view(&self, projection: &ViewProjection) -> ViewState {
        projection.project(&self.registry.snapshot(), &self.controller.snapshot())
    }
}
