//! Async Local TTL Store Module
//!
//! In-process store for asynchronous callers. Every entry owns one tokio
//! task that sleeps for the TTL and then removes it.

use std::sync::{mpsc, Arc, Weak};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::{Builder, Handle};
use tokio::sync::{oneshot, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::cache::table::NamespaceTable;
use crate::cache::AsyncStore;
use crate::error::Result;

type Table = RwLock<NamespaceTable<TaskHandle>>;

const DRIVER_NAME: &str = "ttl-memo-expiry";

// == Task Handle ==
/// Aborts the expiry task when dropped.
#[derive(Debug)]
struct TaskHandle(Option<AbortHandle>);

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

// == Expiry Driver ==
/// Background thread running the runtime that expiry tasks live on.
///
/// Stops once the last store clone holding it is dropped.
#[derive(Debug)]
struct ExpiryDriver {
    handle: Handle,
    _shutdown: oneshot::Sender<()>,
}

impl ExpiryDriver {
    fn start() -> Option<Self> {
        let (handle_tx, handle_rx) = mpsc::channel::<Handle>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let spawned = thread::Builder::new()
            .name(DRIVER_NAME.to_string())
            .spawn(move || {
                let runtime = match Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        warn!("Failed to build expiry runtime: {}", e);
                        return;
                    }
                };
                if handle_tx.send(runtime.handle().clone()).is_err() {
                    return;
                }
                // Resolves when the sender is dropped; pending tasks die with the runtime.
                let _ = runtime.block_on(shutdown_rx);
                debug!("Expiry driver stopped");
            });
        if let Err(e) = spawned {
            warn!("Failed to start expiry driver: {}", e);
            return None;
        }

        let handle = handle_rx.recv().ok()?;
        Some(Self {
            handle,
            _shutdown: shutdown_tx,
        })
    }
}

// == Async Local TTL Store ==
/// Namespaced store with per-entry expiry tasks.
///
/// A store built with [`new`](Self::new) runs its expiry tasks on a runtime
/// of its own, so entries are reclaimed no matter which runtime (if any) the
/// caller is on. [`with_runtime`](Self::with_runtime) uses the given runtime
/// instead, which must outlive the entries written to the store.
#[derive(Debug, Clone)]
pub struct AsyncLocalTtlStore {
    table: Arc<Table>,
    runtime: Option<Handle>,
    _driver: Option<Arc<ExpiryDriver>>,
}

impl Default for AsyncLocalTtlStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncLocalTtlStore {
    /// Creates an empty store with its own expiry driver.
    pub fn new() -> Self {
        let driver = ExpiryDriver::start().map(Arc::new);
        Self {
            table: Arc::new(RwLock::new(NamespaceTable::new())),
            runtime: driver.as_ref().map(|driver| driver.handle.clone()),
            _driver: driver,
        }
    }

    /// Creates an empty store whose expiry tasks run on `runtime`.
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            table: Arc::new(RwLock::new(NamespaceTable::new())),
            runtime: Some(runtime),
            _driver: None,
        }
    }

    /// Number of namespaces currently holding entries.
    pub async fn namespace_count(&self) -> usize {
        self.table.read().await.namespace_count()
    }

    /// Number of entries across all namespaces.
    pub async fn total_entries(&self) -> usize {
        self.table.read().await.total_entries()
    }

    // == Timer ==
    fn schedule(
        &self,
        namespace: Vec<u8>,
        key: Vec<u8>,
        generation: u64,
        ttl: Duration,
    ) -> TaskHandle {
        // Without a driver, fall back to the caller's runtime.
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            // The deadline check in get still hides the entry once it is due.
            warn!("No tokio runtime available for expiry task");
            return TaskHandle(None);
        };

        let table: Weak<Table> = Arc::downgrade(&self.table);
        let task = runtime.spawn(async move {
            tokio::time::sleep(ttl).await;
            let Some(table) = table.upgrade() else {
                return;
            };
            if table
                .write()
                .await
                .remove_if_generation(&namespace, &key, generation)
            {
                debug!(generation, "Expired cache entry");
            }
        });
        TaskHandle(Some(task.abort_handle()))
    }
}

// == Store Implementation ==
#[async_trait]
impl AsyncStore for AsyncLocalTtlStore {
    async fn get(&self, namespace: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.table.read().await.get(namespace, key))
    }

    async fn set(&self, namespace: &[u8], key: &[u8], value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut table = self.table.write().await;

        if ttl.is_zero() {
            table.remove(namespace, key);
            return Ok(());
        }

        let generation = table.next_generation();
        let timer = self.schedule(namespace.to_vec(), key.to_vec(), generation, ttl);
        table.insert(namespace, key, value, ttl, generation, timer);
        debug!(generation, ttl_ms = ttl.as_millis() as u64, "Scheduled expiry");
        Ok(())
    }

    async fn clear(&self, namespace: &[u8]) -> Result<()> {
        let removed = self.table.write().await.clear(namespace);
        debug!(removed, "Cleared namespace");
        Ok(())
    }

    async fn get_size(&self, namespace: &[u8]) -> Result<usize> {
        Ok(self.table.read().await.live_len(namespace))
    }
}
