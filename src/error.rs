//! Error types for the near cache
//!
//! One error enum shared by the client handles and the remote store service.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for handles, remote clients and the store service.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Remote call failed or timed out. Retryable by caller policy.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A value could not be encoded or decoded for wire transfer
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid handle or server configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Key not found in a remote collection
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The handle was closed
    #[error("Handle is closed")]
    Closed,
}

impl CacheError {
    /// Returns true when retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CacheError::Transport(_))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CacheError::Serialization(err.to_string())
        } else {
            CacheError::Transport(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::Serialization(_) => StatusCode::BAD_REQUEST,
            CacheError::Transport(_) | CacheError::Closed => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the near cache.
pub type Result<T> = std::result::Result<T, CacheError>;
