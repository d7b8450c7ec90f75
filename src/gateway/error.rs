//! Error taxonomy for remote gateway calls.

use reqwest::StatusCode;

/// Failure of a single gateway call.
///
/// The gateway never retries; callers decide what to do with each variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// No session or an expired one. The caller must send the user to login.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The referenced collection no longer exists remotely.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input, e.g. an empty message.
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// Network or server failure. Safe to retry.
    #[error("Temporary failure: {0}")]
    Transient(String),
}

impl GatewayError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }

    /// Map a non-success HTTP status to the taxonomy.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = if body.trim().is_empty() {
            status.to_string()
        } else {
            format!("{} - {}", status, body.trim())
        };
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthenticated,
            StatusCode::NOT_FOUND => GatewayError::NotFound(detail),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                GatewayError::Invalid(detail)
            }
            _ => GatewayError::Transient(detail),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return GatewayError::from_status(status, "");
        }
        GatewayError::Transient(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Transient(format!("Failed to decode response: {}", err))
    }
}
