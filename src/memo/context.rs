//! Cache Context Module
//!
//! Defaults shared by every decorator built from the same context: the TTL,
//! the serializer, an optional explicit backend, and the in-process stores
//! used when no backend is given.

use std::sync::OnceLock;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::CacheBackend;
use crate::config::{MemoConfig, DEFAULT_TTL_SECS};
use crate::error::Result;
use crate::memo::options::ttl_from_secs;
use crate::memo::serializer::BuiltinSerializer;

static GLOBAL: OnceLock<CacheContext> = OnceLock::new();

// == Cache Context ==
/// Memoization defaults.
///
/// Cloning shares the default stores, so wrappers built from clones read and
/// write the same entries.
#[derive(Debug, Clone)]
pub struct CacheContext {
    local: CacheBackend,
    async_local: CacheBackend,
    cache: Option<CacheBackend>,
    serializer: BuiltinSerializer,
    ttl: Duration,
}

impl Default for CacheContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheContext {
    /// Creates a context with fresh in-process stores, a 60 second TTL and
    /// the binary serializer.
    pub fn new() -> Self {
        Self {
            local: CacheBackend::local(),
            async_local: CacheBackend::async_local(),
            cache: None,
            serializer: BuiltinSerializer::default(),
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }

    /// Builds a context from loaded configuration.
    ///
    /// # Arguments
    /// * `config` - TTL, backend and serializer names
    ///
    /// Fails with [`MemoError::Configuration`](crate::error::MemoError::Configuration)
    /// for an invalid TTL or an unknown backend or serializer name.
    pub fn from_config(config: &MemoConfig) -> Result<Self> {
        let mut context = Self::new()
            .with_ttl(ttl_from_secs(config.ttl_secs)?)
            .with_serializer(config.serializer.parse()?);
        if let Some(cache) = &config.cache {
            context = context.with_cache(cache.parse()?);
        }
        Ok(context)
    }

    /// The process-wide context, loaded from the environment on first use.
    ///
    /// Invalid environment settings are logged and replaced by the defaults.
    pub fn global() -> &'static CacheContext {
        GLOBAL.get_or_init(|| {
            let config = MemoConfig::from_env();
            match Self::from_config(&config) {
                Ok(context) => {
                    info!(
                        ttl_secs = config.ttl_secs,
                        cache = config.cache.as_deref().unwrap_or("local"),
                        serializer = %config.serializer,
                        "Loaded memoization defaults"
                    );
                    context
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring invalid memoization settings");
                    Self::new()
                }
            }
        })
    }

    /// Uses `cache` for every wrapper instead of the in-process stores.
    pub fn with_cache(mut self, cache: CacheBackend) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_serializer(mut self, serializer: BuiltinSerializer) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The explicit backend, if one was configured.
    pub fn cache(&self) -> Option<CacheBackend> {
        self.cache.clone()
    }

    /// Store for synchronous functions when no backend is configured.
    pub fn sync_backend(&self) -> CacheBackend {
        self.local.clone()
    }

    /// Store for asynchronous functions when no backend is configured.
    pub fn async_backend(&self) -> CacheBackend {
        self.async_local.clone()
    }

    pub fn serializer(&self) -> BuiltinSerializer {
        self.serializer
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemoError;

    #[test]
    fn test_new_defaults() {
        let context = CacheContext::new();
        assert_eq!(context.ttl(), Duration::from_secs(60));
        assert!(context.cache().is_none());
        assert!(!context.sync_backend().is_async());
        assert!(context.async_backend().is_async());
        assert_eq!(context.serializer(), BuiltinSerializer::Bincode);
    }

    #[test]
    fn test_from_config() {
        let config = MemoConfig {
            ttl_secs: 1.5,
            cache: Some("async_local".to_string()),
            serializer: "json".to_string(),
        };
        let context = CacheContext::from_config(&config).unwrap();

        assert_eq!(context.ttl(), Duration::from_millis(1500));
        assert!(context.cache().map(|c| c.is_async()).unwrap_or(false));
        assert_eq!(context.serializer(), BuiltinSerializer::Json);
    }

    #[test]
    fn test_from_config_rejects_bad_values() {
        let negative = MemoConfig {
            ttl_secs: -3.0,
            ..MemoConfig::default()
        };
        assert!(matches!(
            CacheContext::from_config(&negative),
            Err(MemoError::Configuration(_))
        ));

        let unknown = MemoConfig {
            serializer: "xml".to_string(),
            ..MemoConfig::default()
        };
        assert!(CacheContext::from_config(&unknown).is_err());
    }

    #[test]
    fn test_clones_share_default_stores() {
        let context = CacheContext::new();
        let clone = context.clone();

        let (CacheBackend::Sync(a), CacheBackend::Sync(b)) =
            (context.sync_backend(), clone.sync_backend())
        else {
            panic!("expected sync stores");
        };
        a.set(b"ns", b"k", b"v".to_vec(), Duration::from_secs(5)).unwrap();
        assert_eq!(b.get(b"ns", b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_global_is_initialized_once() {
        let first = CacheContext::global() as *const CacheContext;
        let second = CacheContext::global() as *const CacheContext;
        assert_eq!(first, second);
    }
}
