//! Cache Module
//!
//! Namespaced key-value stores whose entries expire after a per-entry TTL.
//! Local stores keep entries in process; remote stores talk to the cache
//! server over HTTP.

mod async_local;
mod backend;
mod entry;
mod local;
mod remote;
mod table;


use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

// Re-export public types
pub use async_local::AsyncLocalTtlStore;
pub use backend::CacheBackend;
pub use entry::CacheEntry;
pub use local::LocalTtlStore;
pub use remote::{AsyncHttpStore, HttpStore, DEFAULT_TIMEOUT};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

// == Store Traits ==
/// Namespaced TTL store for synchronous callers.
///
/// Setting a key replaces its value and restarts its expiry clock. A zero
/// TTL removes the key before `set` returns.
pub trait Store: fmt::Debug + Send + Sync {
    /// Returns the value, or None on a miss or after expiry.
    fn get(&self, namespace: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `(namespace, key)` for `ttl`.
    fn set(&self, namespace: &[u8], key: &[u8], value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Removes every key in the namespace; no-op if it does not exist.
    fn clear(&self, namespace: &[u8]) -> Result<()>;

    /// Number of live keys in the namespace.
    fn get_size(&self, namespace: &[u8]) -> Result<usize>;
}

/// Namespaced TTL store for asynchronous callers, same semantics as [`Store`].
#[async_trait]
pub trait AsyncStore: fmt::Debug + Send + Sync {
    async fn get(&self, namespace: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>>;

    async fn set(&self, namespace: &[u8], key: &[u8], value: Vec<u8>, ttl: Duration) -> Result<()>;

    async fn clear(&self, namespace: &[u8]) -> Result<()>;

    async fn get_size(&self, namespace: &[u8]) -> Result<usize>;
}
