//! Configuration Module
//!
//! Handles loading the cache server and memoization defaults from
//! environment variables.

use std::env;
use std::time::Duration;

/// Default time to live for memoized results and server entries.
pub const DEFAULT_TTL_SECS: u64 = 60;

// == Server Config ==
/// Cache server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server port
    pub server_port: u16,
    /// TTL in seconds for PUT requests without `ttl_ms`
    pub default_ttl: u64,
}

impl ServerConfig {
    /// Creates a new ServerConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 60)
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            default_ttl: env::var("DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TTL_SECS),
        }
    }

    /// Default TTL as a Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            default_ttl: DEFAULT_TTL_SECS,
        }
    }
}

// == Memo Config ==
/// Process-wide memoization defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoConfig {
    /// TTL in seconds applied when a decorator sets none
    pub ttl_secs: f64,
    /// Backend name or server URL; None selects the in-process stores
    pub cache: Option<String>,
    /// Serializer name
    pub serializer: String,
}

impl MemoConfig {
    /// Creates a new MemoConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TTL_MEMO_TTL` - Default TTL in seconds, fractional allowed (default: 60)
    /// - `TTL_MEMO_CACHE` - `local`, `async_local` or a server URL (default: unset)
    /// - `TTL_MEMO_SERIALIZER` - `pickle`, `bincode` or `json` (default: pickle)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl_secs: env::var("TTL_MEMO_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ttl_secs),
            cache: env::var("TTL_MEMO_CACHE").ok().filter(|v| !v.is_empty()),
            serializer: env::var("TTL_MEMO_SERIALIZER")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.serializer),
        }
    }
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS as f64,
            cache: None,
            serializer: "pickle".to_string(),
        }
    }
}
