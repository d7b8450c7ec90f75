pub mod error;
pub mod http;
pub mod mock;
pub mod models;
pub mod remote;

pub use error::GatewayError;
pub use http::HttpGateway;
pub use mock::{GatewayCall, Hold, HoldKey, MockGateway};
pub use models::{
    AssistantModel, Collection, CollectionId, Credential, Message, Role, User,
    DEFAULT_COLLECTION_NAME,
};
pub use remote::{GatewayResult, RemoteGateway};
