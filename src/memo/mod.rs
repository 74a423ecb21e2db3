//! Memoization Module
//!
//! Decorator configuration, the sync and async memoizing wrappers, and the
//! bridge that lets synchronous wrappers use asynchronous stores.

mod bridge;
mod context;
mod options;
mod serializer;
mod stats;
mod wrapper;

pub use context::CacheContext;
pub use options::{ttl_cache, ttl_cache_with, TtlCacheBuilder, TtlDecorator};
pub use serializer::{BincodeSerializer, BuiltinSerializer, JsonSerializer, Serializer};
pub use stats::{CacheInfo, WrapperStats};
pub use wrapper::{AsyncTtlWrapper, CacheParameters, Memoized, Method, TtlWrapper};
