//! Decorator Options Module
//!
//! Builder for memoization settings and the decorator that applies them to
//! functions.

use std::future::Future;
use std::time::Duration;

use uuid::Uuid;

use crate::cache::CacheBackend;
use crate::error::{MemoError, Result};
use crate::hash::{BoundArguments, Signature};
use crate::memo::context::CacheContext;
use crate::memo::serializer::{BuiltinSerializer, Serializer};
use crate::memo::wrapper::{AsyncTtlWrapper, MemoCore, TtlWrapper};

/// Converts a TTL in seconds, rejecting negative and non-finite values.
pub(crate) fn ttl_from_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(MemoError::Configuration(format!(
            "ttl must be a non-negative number of seconds, got {}",
            secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| MemoError::Configuration(format!("ttl of {} seconds: {}", secs, e)))
}

#[derive(Debug, Clone, Copy)]
enum TtlSetting {
    Exact(Duration),
    Seconds(f64),
}

// == Entry Points ==
/// Starts a decorator configuration from the process-wide context.
pub fn ttl_cache() -> TtlCacheBuilder {
    ttl_cache_with(CacheContext::global())
}

/// Starts a decorator configuration from an explicit context.
pub fn ttl_cache_with(context: &CacheContext) -> TtlCacheBuilder {
    TtlCacheBuilder {
        ttl: TtlSetting::Exact(context.ttl()),
        typed: false,
        identifier: None,
        cache: context.cache(),
        sync_default: context.sync_backend(),
        async_default: context.async_backend(),
        serializer: context.serializer(),
    }
}

// == Builder ==
/// Memoization settings.
///
/// # Defaults
/// - `ttl`: the context's TTL (60 seconds)
/// - `typed`: false
/// - `identifier`: a fresh UUID per wrapped function
/// - `cache`: the context's local store for sync functions and its async
///   local store for async functions
/// - `serializer`: the context's serializer (binary)
#[derive(Debug, Clone)]
pub struct TtlCacheBuilder<S = BuiltinSerializer> {
    ttl: TtlSetting,
    typed: bool,
    identifier: Option<String>,
    cache: Option<CacheBackend>,
    sync_default: CacheBackend,
    async_default: CacheBackend,
    serializer: S,
}

impl<S: Serializer> TtlCacheBuilder<S> {
    /// Sets the time to live of every stored result.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = TtlSetting::Exact(ttl);
        self
    }

    /// Sets the time to live in seconds; validated by [`build`](Self::build).
    pub fn ttl_secs(mut self, secs: f64) -> Self {
        self.ttl = TtlSetting::Seconds(secs);
        self
    }

    /// Includes each argument's runtime type in the cache key.
    pub fn typed(mut self, typed: bool) -> Self {
        self.typed = typed;
        self
    }

    /// Shares one namespace between every wrapper using `identifier`.
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Uses `cache` for both sync and async functions.
    pub fn cache(mut self, cache: CacheBackend) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the serializer.
    pub fn serializer<T: Serializer>(self, serializer: T) -> TtlCacheBuilder<T> {
        TtlCacheBuilder {
            ttl: self.ttl,
            typed: self.typed,
            identifier: self.identifier,
            cache: self.cache,
            sync_default: self.sync_default,
            async_default: self.async_default,
            serializer,
        }
    }

    /// Validates the settings.
    ///
    /// Fails with [`MemoError::Configuration`] for a negative or non-finite TTL.
    pub fn build(self) -> Result<TtlDecorator<S>> {
        let ttl = match self.ttl {
            TtlSetting::Exact(ttl) => ttl,
            TtlSetting::Seconds(secs) => ttl_from_secs(secs)?,
        };
        Ok(TtlDecorator {
            ttl,
            typed: self.typed,
            identifier: self.identifier,
            cache: self.cache,
            sync_default: self.sync_default,
            async_default: self.async_default,
            serializer: self.serializer,
        })
    }
}

// == Decorator ==
/// Validated settings that wrap functions into memoized callables.
#[derive(Debug, Clone)]
pub struct TtlDecorator<S = BuiltinSerializer> {
    ttl: Duration,
    typed: bool,
    identifier: Option<String>,
    cache: Option<CacheBackend>,
    sync_default: CacheBackend,
    async_default: CacheBackend,
    serializer: S,
}

impl<S: Serializer> TtlDecorator<S> {
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Memoizes a synchronous function.
    ///
    /// # Arguments
    /// * `signature` - Parameters the call arguments are bound against
    /// * `func` - Receives the bound arguments with defaults applied
    pub fn wrap<R, F>(&self, signature: Signature, func: F) -> TtlWrapper<R, S>
    where
        F: Fn(&BoundArguments) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        let backend = self.cache.clone().unwrap_or_else(|| self.sync_default.clone());
        TtlWrapper::new(self.core(signature, backend), func)
    }

    /// Memoizes an asynchronous function.
    pub fn wrap_async<R, F, Fut>(&self, signature: Signature, func: F) -> AsyncTtlWrapper<R, S>
    where
        F: Fn(BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let backend = self.cache.clone().unwrap_or_else(|| self.async_default.clone());
        AsyncTtlWrapper::new(self.core(signature, backend), func)
    }

    fn core(&self, signature: Signature, backend: CacheBackend) -> MemoCore<S> {
        let identifier = self
            .identifier
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        MemoCore::new(
            signature,
            self.ttl,
            self.typed,
            identifier,
            backend,
            self.serializer.clone(),
        )
    }
}
