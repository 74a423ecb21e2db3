//! Memoizing Wrapper Module
//!
//! Call interception for memoized functions. Each call binds its arguments,
//! derives a key, and either answers from the store or runs the function
//! and stores the serialized result.

use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::CacheBackend;
use crate::error::Result;
use crate::hash::{Args, BoundArguments, CacheKey, KeyBuilder, Signature, Value};
use crate::memo::bridge;
use crate::memo::serializer::{BuiltinSerializer, Serializer};
use crate::memo::stats::{CacheInfo, WrapperStats};

type SyncFn<R> = dyn Fn(&BoundArguments) -> anyhow::Result<R> + Send + Sync;
type BoxedFuture<R> = Pin<Box<dyn Future<Output = anyhow::Result<R>> + Send>>;
type AsyncFn<R> = dyn Fn(BoundArguments) -> BoxedFuture<R> + Send + Sync;

// == Cache Parameters ==
/// Configuration a wrapper was built with.
#[derive(Debug, Clone)]
pub struct CacheParameters<S = BuiltinSerializer> {
    pub ttl: Duration,
    pub typed: bool,
    pub identifier: String,
    pub cache: CacheBackend,
    pub serializer: S,
}

// == Memoized Trait ==
/// Introspection shared by the sync and async wrappers.
pub trait Memoized {
    type Serializer: Serializer;

    /// Signature call arguments are bound against.
    fn signature(&self) -> &Signature;

    /// Hit and miss counters.
    fn stats(&self) -> &WrapperStats;

    /// The wrapper's immutable configuration.
    fn cache_parameters(&self) -> CacheParameters<Self::Serializer>;
}

// == Shared Core ==
/// Settings and counters shared by all clones of one wrapper.
#[derive(Debug)]
pub(crate) struct MemoCore<S> {
    signature: Signature,
    keys: KeyBuilder,
    identifier: String,
    ttl: Duration,
    backend: CacheBackend,
    serializer: S,
    stats: WrapperStats,
}

impl<S: Serializer> MemoCore<S> {
    pub(crate) fn new(
        signature: Signature,
        ttl: Duration,
        typed: bool,
        identifier: String,
        backend: CacheBackend,
        serializer: S,
    ) -> Self {
        Self {
            signature,
            keys: KeyBuilder::new(typed),
            identifier,
            ttl,
            backend,
            serializer,
            stats: WrapperStats::new(),
        }
    }

    fn namespace(&self) -> &[u8] {
        self.identifier.as_bytes()
    }

    fn parameters(&self) -> CacheParameters<S> {
        CacheParameters {
            ttl: self.ttl,
            typed: self.keys.typed(),
            identifier: self.identifier.clone(),
            cache: self.backend.clone(),
            serializer: self.serializer.clone(),
        }
    }

    /// Binds arguments and derives the key.
    fn key(&self, args: Args) -> Result<(BoundArguments, CacheKey)> {
        let bound = self.signature.bind(args)?;
        let key = self.keys.build(&bound)?;
        Ok((bound, key))
    }

    fn decode_hit<R: DeserializeOwned>(&self, bytes: &[u8], key: &CacheKey) -> Result<R> {
        let value = self.serializer.deserialize(bytes)?;
        self.stats.record_hit();
        debug!(function = self.signature.qualname(), ?key, "Cache hit");
        Ok(value)
    }

    fn record_miss(&self, key: &CacheKey) {
        self.stats.record_miss();
        debug!(function = self.signature.qualname(), ?key, "Cache miss");
    }

    // == Blocking Store Access ==
    fn get_blocking(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        match &self.backend {
            CacheBackend::Sync(store) => store.get(self.namespace(), key.as_bytes()),
            CacheBackend::Async(store) => {
                bridge::block_on(store.get(self.namespace(), key.as_bytes()))
            }
        }
    }

    fn set_blocking(&self, key: &CacheKey, value: Vec<u8>) -> Result<()> {
        match &self.backend {
            CacheBackend::Sync(store) => {
                store.set(self.namespace(), key.as_bytes(), value, self.ttl)
            }
            CacheBackend::Async(store) => bridge::block_on(store.set(
                self.namespace(),
                key.as_bytes(),
                value,
                self.ttl,
            )),
        }
    }

    fn clear_blocking(&self) -> Result<()> {
        match &self.backend {
            CacheBackend::Sync(store) => store.clear(self.namespace()),
            CacheBackend::Async(store) => bridge::block_on(store.clear(self.namespace())),
        }
    }

    fn size_blocking(&self) -> Result<usize> {
        match &self.backend {
            CacheBackend::Sync(store) => store.get_size(self.namespace()),
            CacheBackend::Async(store) => bridge::block_on(store.get_size(self.namespace())),
        }
    }

    // == Async Store Access ==
    // Sync stores are called inline and block the executor for their duration.
    async fn get_async(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        match &self.backend {
            CacheBackend::Sync(store) => store.get(self.namespace(), key.as_bytes()),
            CacheBackend::Async(store) => store.get(self.namespace(), key.as_bytes()).await,
        }
    }

    async fn set_async(&self, key: &CacheKey, value: Vec<u8>) -> Result<()> {
        match &self.backend {
            CacheBackend::Sync(store) => {
                store.set(self.namespace(), key.as_bytes(), value, self.ttl)
            }
            CacheBackend::Async(store) => {
                store
                    .set(self.namespace(), key.as_bytes(), value, self.ttl)
                    .await
            }
        }
    }

    async fn clear_async(&self) -> Result<()> {
        match &self.backend {
            CacheBackend::Sync(store) => store.clear(self.namespace()),
            CacheBackend::Async(store) => store.clear(self.namespace()).await,
        }
    }

    async fn size_async(&self) -> Result<usize> {
        match &self.backend {
            CacheBackend::Sync(store) => store.get_size(self.namespace()),
            CacheBackend::Async(store) => store.get_size(self.namespace()).await,
        }
    }
}

// == Sync Wrapper ==
/// A memoized synchronous function.
///
/// Clones share the same counters and namespace.
pub struct TtlWrapper<R, S = BuiltinSerializer> {
    core: Arc<MemoCore<S>>,
    func: Arc<SyncFn<R>>,
}

impl<R, S> Clone for TtlWrapper<R, S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            func: Arc::clone(&self.func),
        }
    }
}

impl<R, S: fmt::Debug> fmt::Debug for TtlWrapper<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlWrapper").field("core", &self.core).finish()
    }
}

impl<R, S: Serializer> TtlWrapper<R, S> {
    pub(crate) fn new<F>(core: MemoCore<S>, func: F) -> Self
    where
        F: Fn(&BoundArguments) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        Self {
            core: Arc::new(core),
            func: Arc::new(func),
        }
    }

    /// Reports hits, misses and the live size of this wrapper's namespace.
    pub fn cache_info(&self) -> Result<CacheInfo> {
        let size = self.core.size_blocking()?;
        Ok(self.core.stats.info(size))
    }

    /// Resets the counters and clears this wrapper's namespace.
    pub fn cache_clear(&self) -> Result<()> {
        self.core.stats.reset();
        self.core.clear_blocking()
    }

    pub fn cache_parameters(&self) -> CacheParameters<S> {
        self.core.parameters()
    }

    /// Returns a view that passes `receiver` as the first argument of every
    /// call, for functions declared with [`Signature::method`].
    pub fn bind_receiver(&self, receiver: impl Into<Value>) -> Method<Self> {
        Method::new(self.clone(), receiver.into())
    }
}

impl<R, S> TtlWrapper<R, S>
where
    R: Serialize + DeserializeOwned,
    S: Serializer,
{
    /// Calls the memoized function.
    pub fn call(&self, args: Args) -> Result<R> {
        let core = &self.core;
        let (bound, key) = core.key(args)?;

        if let Some(bytes) = core.get_blocking(&key)? {
            return core.decode_hit(&bytes, &key);
        }
        core.record_miss(&key);

        let value = (self.func)(&bound)?;
        let bytes = core.serializer.serialize(&value)?;
        core.set_blocking(&key, bytes)?;
        Ok(value)
    }
}

impl<R, S: Serializer> Memoized for TtlWrapper<R, S> {
    type Serializer = S;

    fn signature(&self) -> &Signature {
        &self.core.signature
    }

    fn stats(&self) -> &WrapperStats {
        &self.core.stats
    }

    fn cache_parameters(&self) -> CacheParameters<S> {
        self.core.parameters()
    }
}

// == Async Wrapper ==
/// A memoized asynchronous function.
pub struct AsyncTtlWrapper<R, S = BuiltinSerializer> {
    core: Arc<MemoCore<S>>,
    func: Arc<AsyncFn<R>>,
}

impl<R, S> Clone for AsyncTtlWrapper<R, S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            func: Arc::clone(&self.func),
        }
    }
}

impl<R, S: fmt::Debug> fmt::Debug for AsyncTtlWrapper<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTtlWrapper").field("core", &self.core).finish()
    }
}

impl<R, S: Serializer> AsyncTtlWrapper<R, S> {
    pub(crate) fn new<F, Fut>(core: MemoCore<S>, func: F) -> Self
    where
        F: Fn(BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let func: Arc<AsyncFn<R>> =
            Arc::new(move |bound: BoundArguments| Box::pin(func(bound)) as BoxedFuture<R>);
        Self {
            core: Arc::new(core),
            func,
        }
    }

    /// Reports hits, misses and the live size of this wrapper's namespace.
    pub async fn cache_info(&self) -> Result<CacheInfo> {
        let size = self.core.size_async().await?;
        Ok(self.core.stats.info(size))
    }

    /// Resets the counters and clears this wrapper's namespace.
    pub async fn cache_clear(&self) -> Result<()> {
        self.core.stats.reset();
        self.core.clear_async().await
    }

    pub fn cache_parameters(&self) -> CacheParameters<S> {
        self.core.parameters()
    }

    /// Returns a view that passes `receiver` as the first argument of every call.
    pub fn bind_receiver(&self, receiver: impl Into<Value>) -> Method<Self> {
        Method::new(self.clone(), receiver.into())
    }
}

impl<R, S> AsyncTtlWrapper<R, S>
where
    R: Serialize + DeserializeOwned,
    S: Serializer,
{
    /// Calls the memoized function.
    pub async fn call(&self, args: Args) -> Result<R> {
        let core = &self.core;
        let (bound, key) = core.key(args)?;

        if let Some(bytes) = core.get_async(&key).await? {
            return core.decode_hit(&bytes, &key);
        }
        core.record_miss(&key);

        let value = (self.func)(bound).await?;
        let bytes = core.serializer.serialize(&value)?;
        core.set_async(&key, bytes).await?;
        Ok(value)
    }
}

impl<R, S: Serializer> Memoized for AsyncTtlWrapper<R, S> {
    type Serializer = S;

    fn signature(&self) -> &Signature {
        &self.core.signature
    }

    fn stats(&self) -> &WrapperStats {
        &self.core.stats
    }

    fn cache_parameters(&self) -> CacheParameters<S> {
        self.core.parameters()
    }
}

// == Bound Method ==
/// A wrapper bound to a receiver.
///
/// Derefs to the wrapper, so `cache_info` and friends stay reachable.
#[derive(Debug, Clone)]
pub struct Method<W> {
    wrapper: W,
    receiver: Value,
}

impl<W> Method<W> {
    fn new(wrapper: W, receiver: Value) -> Self {
        Self { wrapper, receiver }
    }

    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    fn with_receiver(&self, args: Args) -> Args {
        args.with_receiver(self.receiver.clone())
    }
}

impl<W> Deref for Method<W> {
    type Target = W;

    fn deref(&self) -> &W {
        &self.wrapper
    }
}

impl<R, S> Method<TtlWrapper<R, S>>
where
    R: Serialize + DeserializeOwned,
    S: Serializer,
{
    /// Calls the memoized method with the bound receiver.
    pub fn call(&self, args: Args) -> Result<R> {
        self.wrapper.call(self.with_receiver(args))
    }
}

impl<R, S> Method<AsyncTtlWrapper<R, S>>
where
    R: Serialize + DeserializeOwned,
    S: Serializer,
{
    /// Calls the memoized method with the bound receiver.
    pub async fn call(&self, args: Args) -> Result<R> {
        self.wrapper.call(self.with_receiver(args)).await
    }
}
