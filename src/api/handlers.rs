//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Namespaces and keys
//! travel hex-encoded in the path; values travel as raw bodies.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use tracing::{debug, warn};

use crate::cache::{AsyncLocalTtlStore, AsyncStore, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::config::ServerConfig;
use crate::error::{MemoError, Result};
use crate::models::{
    ClearResponse, HealthResponse, SetQuery, SetResponse, SizeResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Namespaced TTL store backing every endpoint
    pub store: AsyncLocalTtlStore,
    /// TTL applied when a PUT carries no `ttl_ms`
    pub default_ttl: Duration,
}

impl AppState {
    /// Creates a new AppState around the given store.
    pub fn new(store: AsyncLocalTtlStore, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(AsyncLocalTtlStore::new(), config.default_ttl())
    }
}

fn decode_segment(what: &str, segment: &str) -> Result<Vec<u8>> {
    hex::decode(segment)
        .map_err(|e| MemoError::InvalidRequest(format!("{} is not valid hex: {}", what, e)))
}

/// Handler for PUT /ns/:namespace/keys/:key
///
/// Stores the request body under the key. `ttl_ms=0` deletes the key.
pub async fn set_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
    Query(query): Query<SetQuery>,
    body: Bytes,
) -> Result<Json<SetResponse>> {
    let ns = decode_segment("namespace", &namespace)?;
    let raw_key = decode_segment("key", &key)?;

    if raw_key.len() > MAX_KEY_LENGTH {
        warn!(len = raw_key.len(), "Rejected oversized key");
        return Err(MemoError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if body.len() > MAX_VALUE_SIZE {
        warn!(len = body.len(), "Rejected oversized value");
        return Err(MemoError::InvalidRequest(format!(
            "Value exceeds maximum size of {} bytes",
            MAX_VALUE_SIZE
        )));
    }

    let ttl = query.ttl_or(state.default_ttl);
    state.store.set(&ns, &raw_key, body.to_vec(), ttl).await?;
    debug!(%namespace, %key, ttl_ms = ttl.as_millis() as u64, "Stored entry");

    Ok(Json(SetResponse::new(
        namespace,
        key,
        u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
    )))
}

/// Handler for GET /ns/:namespace/keys/:key
///
/// Returns the stored bytes, or 404 on a miss.
pub async fn get_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Result<Vec<u8>> {
    let ns = decode_segment("namespace", &namespace)?;
    let raw_key = decode_segment("key", &key)?;

    state
        .store
        .get(&ns, &raw_key)
        .await?
        .ok_or_else(|| MemoError::NotFound(format!("{}/{}", namespace, key)))
}

/// Handler for DELETE /ns/:namespace
///
/// Removes every key in the namespace. Clearing an unknown namespace succeeds.
pub async fn clear_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Result<Json<ClearResponse>> {
    let ns = decode_segment("namespace", &namespace)?;
    state.store.clear(&ns).await?;

    Ok(Json(ClearResponse::new(namespace)))
}

/// Handler for GET /ns/:namespace/size
pub async fn size_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Result<Json<SizeResponse>> {
    let ns = decode_segment("namespace", &namespace)?;
    let size = state.store.get_size(&ns).await?;

    Ok(Json(SizeResponse { namespace, size }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        namespaces: state.store.namespace_count().await,
        total_entries: state.store.total_entries().await,
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
