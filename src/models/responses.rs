//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies. Namespaces and
//! keys are reported in the same hex form used in request paths.

use serde::{Deserialize, Serialize};

/// Response body for the SET operation (PUT /ns/:namespace/keys/:key)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetResponse {
    /// Hex-encoded namespace
    pub namespace: String,
    /// Hex-encoded key
    pub key: String,
    /// Effective TTL in milliseconds
    pub ttl_ms: u64,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, ttl_ms: u64) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            ttl_ms,
        }
    }
}

/// Response body for the CLEAR operation (DELETE /ns/:namespace)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Hex-encoded namespace
    pub namespace: String,
}

impl ClearResponse {
    /// Creates a new ClearResponse
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            message: format!("Namespace '{}' cleared", namespace),
            namespace,
        }
    }
}

/// Response body for the SIZE operation (GET /ns/:namespace/size)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeResponse {
    /// Hex-encoded namespace
    pub namespace: String,
    /// Number of live entries
    pub size: usize,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Number of namespaces holding entries
    pub namespaces: usize,
    /// Number of entries across all namespaces
    pub total_entries: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in RFC 3339 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
