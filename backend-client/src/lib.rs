//! HTTP access to the quotebook API.
//!
//! [`RequestExecutor`] is the single path every call takes: it attaches the
//! bearer token from a [`CredentialStore`], and when the server answers 401 it
//! asks the [`TokenRefresher`] for a new token and replays the request once.

mod auth;
mod body;
mod credentials;
mod endpoint;
pub mod endpoints;
mod error;
mod executor;
mod gateway;
mod refresh;

pub use auth::AuthClient;
pub use body::RequestBody;
pub use credentials::ACCESS_TOKEN_KEY;
pub use credentials::CredentialStore;
pub use credentials::CredentialStoreError;
pub use credentials::FileCredentialStore;
pub use credentials::InMemoryCredentialStore;
pub use credentials::KeyringCredentialStore;
pub use credentials::REFRESH_TOKEN_KEY;
pub use credentials::USER_ID_KEY;
pub use endpoint::Endpoint;
pub use error::ApiError;
pub use executor::ClientConfig;
pub use executor::DEFAULT_CONNECT_TIMEOUT;
pub use executor::DEFAULT_REQUEST_TIMEOUT;
pub use executor::RequestExecutor;
pub use gateway::EntityGateway;
pub use gateway::HttpGateway;
pub use gateway::RemoteEntity;
pub use refresh::TokenRefresher;
