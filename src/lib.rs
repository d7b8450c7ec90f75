pub mod config;
pub mod gateway;
pub mod session;
pub mod shell;
pub mod util;

pub use config::Config;
pub use gateway::{
    AssistantModel, Collection, CollectionId, Credential, GatewayError, HttpGateway, Message,
    MockGateway, RemoteGateway, Role, User,
};
pub use session::{
    ActiveSessionController, ChangeBus, CollectionRegistry, SessionError, SessionManager,
    SessionState, StateChange, ViewProjection, ViewState,
};
pub use shell::{Shell, ShellExit};
