//! Error types for the response cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the response cache.
///
/// `Clone` so a single coalesced fetch result can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The fetch primitive failed at the network level
    #[error("Network error: {0}")]
    Network(String),

    /// Reading from the backing store failed
    #[error("Cache read failed: {0}")]
    CacheRead(String),

    /// Writing to the backing store failed
    #[error("Cache write failed: {0}")]
    CacheWrite(String),

    /// No cache category registered under this key
    #[error("Unknown cache category: {0}")]
    UnknownCategory(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// True for failures of the fetch primitive itself.
    pub fn is_network(&self) -> bool {
        matches!(self, CacheError::Network(_))
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Internal(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Network(_) => StatusCode::BAD_GATEWAY,
            CacheError::UnknownCategory(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::CacheRead(_) | CacheError::CacheWrite(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the response cache.
pub type Result<T> = std::result::Result<T, CacheError>;
