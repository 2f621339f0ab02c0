use thiserror::Error;

/// Failure of one API call, as surfaced to collection controllers.
///
/// Causes are kept as rendered strings so the error can be cloned into the
/// observable collection state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    /// No usable credentials: not signed in, refresh failed, or the server
    /// rejected the refreshed token as well. The user must sign in again.
    #[error("not authorized; sign in again")]
    Unauthorized,
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decoding(String),
    #[error("failed to encode request body: {0}")]
    Encoding(String),
    #[error("credential storage failed: {0}")]
    Storage(String),
    #[error("network error: {message}")]
    Network { message: String, timed_out: bool },
    /// The operation was superseded (refresh, dispose). Never shown to users.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    pub(crate) fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn network(error: &reqwest::Error) -> Self {
        Self::Network {
            message: error.to_string(),
            timed_out: error.is_timeout(),
        }
    }

    pub(crate) fn decoding(error: impl std::fmt::Display) -> Self {
        Self::Decoding(error.to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
