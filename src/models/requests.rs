//! Request DTOs for the cache server API
//!
//! Values travel as raw request bodies; only the TTL rides in the query.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Query string of the SET operation (PUT /ns/:namespace/keys/:key)
///
/// # Fields
/// - `ttl_ms`: Optional TTL in milliseconds (uses the server default if not
///   specified). Zero deletes the key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetQuery {
    /// Optional TTL in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl SetQuery {
    /// Creates a query carrying `ttl`, saturating at `u64::MAX` milliseconds.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl_ms: Some(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    /// Resolves the effective TTL, falling back to `default`.
    pub fn ttl_or(&self, default: Duration) -> Duration {
        self.ttl_ms.map(Duration::from_millis).unwrap_or(default)
    }
}
