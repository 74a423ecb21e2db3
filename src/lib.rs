//! TTL Memo - function memoization with per-entry expiry
//!
//! Caches function results under keys derived from a persistent structural
//! hash of the call arguments. Results live in namespaced stores that expire
//! each entry after its TTL: in process, or on a remote cache server.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod hash;
pub mod memo;
pub mod models;

pub use api::AppState;
pub use cache::{AsyncStore, CacheBackend, Store};
pub use config::{MemoConfig, ServerConfig};
pub use error::{MemoError, Result};
pub use hash::{persistent_hash, Args, BoundArguments, Signature, Value};
pub use memo::{ttl_cache, ttl_cache_with, AsyncTtlWrapper, CacheContext, CacheInfo, TtlWrapper};
