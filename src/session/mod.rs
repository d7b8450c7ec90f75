//! Collection-scoped conversation session core
//!
//! [`CollectionRegistry`] mirrors the remote collection list,
//! [`ActiveSessionController`] owns the open conversation, and
//! [`ViewProjection`] derives what to render from both. Every mutation is
//! announced on the [`ChangeBus`].

pub mod controller;
pub mod events;
pub mod manager;
pub mod projection;
pub mod registry;

pub use controller::{
    error_entry, ActiveSessionController, OpenOutcome, SendOutcome, SessionSnapshot, SessionState,
};
pub use events::{ChangeBus, StateChange};
pub use manager::{SessionError, SessionManager};
pub use projection::{input_disabled, CollectionRow, EmptyState, ViewProjection, ViewState};
pub use registry::{filter_collections, CollectionRegistry, RegistrySnapshot};
