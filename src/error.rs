//! Error types for the memoization layer and the cache server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Memo Error Enum ==
/// Unified error type for hashing, stores, wrappers and the cache server.
#[derive(Error, Debug)]
pub enum MemoError {
    /// Invalid decorator or server configuration (e.g. a negative TTL)
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Call arguments do not fit the declared signature
    #[error("Cannot bind arguments: {0}")]
    ArgumentBinding(String),

    /// A value could not be turned into bytes or back
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// No execution context could drive an async store from sync code
    #[error("Async bridge unavailable: {0}")]
    BridgeUnavailable(String),

    /// Attribute enumeration failed on the reflection fallback path
    #[error("Hashing failed: {0}")]
    Hashing(String),

    /// A store backend (e.g. the remote server) reported a failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// The wrapped function itself failed
    #[error("Wrapped function failed: {0}")]
    Function(#[from] anyhow::Error),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Conversions ==
impl From<reqwest::Error> for MemoError {
    fn from(e: reqwest::Error) -> Self {
        MemoError::Backend(format!("Remote store request failed: {}", e))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for MemoError {
    fn into_response(self) -> Response {
        let status = match &self {
            MemoError::NotFound(_) => StatusCode::NOT_FOUND,
            MemoError::InvalidRequest(_)
            | MemoError::Configuration(_)
            | MemoError::ArgumentBinding(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, MemoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = MemoError::NotFound("abc".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_request_maps_to_400() {
        let response = MemoError::InvalidRequest("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_backend_maps_to_500() {
        let response = MemoError::Backend("down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_function_error_wraps_anyhow() {
        let err: MemoError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, MemoError::Function(_)));
        assert!(err.to_string().contains("boom"));
    }
}
