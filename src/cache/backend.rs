//! Cache Backend Module
//!
//! Selects the store a wrapper talks to, either by value or by name.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::cache::{AsyncHttpStore, AsyncLocalTtlStore, AsyncStore, LocalTtlStore, Store};
use crate::error::{MemoError, Result};

// == Cache Backend ==
/// A synchronous or asynchronous store.
#[derive(Clone)]
pub enum CacheBackend {
    Sync(Arc<dyn Store>),
    Async(Arc<dyn AsyncStore>),
}

impl CacheBackend {
    /// A fresh in-process store for synchronous callers.
    pub fn local() -> Self {
        CacheBackend::Sync(Arc::new(LocalTtlStore::new()))
    }

    /// A fresh in-process store for asynchronous callers.
    pub fn async_local() -> Self {
        CacheBackend::Async(Arc::new(AsyncLocalTtlStore::new()))
    }

    /// Wraps a synchronous store.
    pub fn sync(store: impl Store + 'static) -> Self {
        CacheBackend::Sync(Arc::new(store))
    }

    /// Wraps an asynchronous store.
    pub fn from_async(store: impl AsyncStore + 'static) -> Self {
        CacheBackend::Async(Arc::new(store))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, CacheBackend::Async(_))
    }
}

impl fmt::Debug for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBackend::Sync(store) => f.debug_tuple("Sync").field(store).finish(),
            CacheBackend::Async(store) => f.debug_tuple("Async").field(store).finish(),
        }
    }
}

// == Parsing ==
/// Parses `"local"`, `"async_local"` or an `http(s)://` server URL.
///
/// Named local backends are fresh stores; share one by cloning the parsed
/// value. Server URLs produce an asynchronous client, which synchronous
/// wrappers drive through the bridge.
impl FromStr for CacheBackend {
    type Err = MemoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(CacheBackend::local()),
            "async_local" => Ok(CacheBackend::async_local()),
            url if url.starts_with("http://") || url.starts_with("https://") => {
                Ok(CacheBackend::from_async(AsyncHttpStore::new(url)?))
            }
            other => Err(MemoError::Configuration(format!(
                "Unknown cache '{}', expected 'local', 'async_local' or an http(s) URL",
                other
            ))),
        }
    }
}
