//! Local TTL Store Module
//!
//! In-process store for synchronous callers. Every entry owns one timer
//! thread that removes it when its TTL elapses.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::cache::table::NamespaceTable;
use crate::cache::Store;
use crate::error::Result;

type Table = RwLock<NamespaceTable<TimerHandle>>;

// == Timer Handle ==
/// Cancels its timer thread when dropped by disconnecting the channel the
/// thread is waiting on.
#[derive(Debug)]
struct TimerHandle {
    _cancel: Option<Sender<()>>,
}

// == Local TTL Store ==
/// Thread-safe namespaced store with per-entry expiry.
///
/// Cloning is cheap and clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct LocalTtlStore {
    table: Arc<Table>,
}

impl LocalTtlStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of namespaces currently holding entries.
    pub fn namespace_count(&self) -> usize {
        self.table.read().namespace_count()
    }

    /// Number of entries across all namespaces, including ones whose timer
    /// has not fired yet.
    pub fn total_entries(&self) -> usize {
        self.table.read().total_entries()
    }

    // == Timer ==
    /// Starts the thread that expires `(namespace, key)` at `generation`.
    fn schedule(
        table: Weak<Table>,
        namespace: Vec<u8>,
        key: Vec<u8>,
        generation: u64,
        ttl: Duration,
    ) -> TimerHandle {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let spawned = thread::Builder::new()
            .name("ttl-memo-timer".to_string())
            .spawn(move || {
                // Any message or a disconnect means the entry was replaced or cleared.
                if cancelled.recv_timeout(ttl) != Err(RecvTimeoutError::Timeout) {
                    return;
                }
                let Some(table) = table.upgrade() else {
                    return;
                };
                if table.write().remove_if_generation(&namespace, &key, generation) {
                    debug!(generation, "Expired cache entry");
                }
            });

        match spawned {
            Ok(_) => TimerHandle {
                _cancel: Some(cancel),
            },
            Err(e) => {
                // The deadline check in get still hides the entry once it is due.
                warn!("Failed to start expiry timer: {}", e);
                TimerHandle { _cancel: None }
            }
        }
    }
}

// == Store Implementation ==
impl Store for LocalTtlStore {
    fn get(&self, namespace: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.table.read().get(namespace, key))
    }

    fn set(&self, namespace: &[u8], key: &[u8], value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut table = self.table.write();

        if ttl.is_zero() {
            table.remove(namespace, key);
            return Ok(());
        }

        let generation = table.next_generation();
        let timer = Self::schedule(
            Arc::downgrade(&self.table),
            namespace.to_vec(),
            key.to_vec(),
            generation,
            ttl,
        );
        table.insert(namespace, key, value, ttl, generation, timer);
        debug!(generation, ttl_ms = ttl.as_millis() as u64, "Scheduled expiry");
        Ok(())
    }

    fn clear(&self, namespace: &[u8]) -> Result<()> {
        let removed = self.table.write().clear(namespace);
        debug!(removed, "Cleared namespace");
        Ok(())
    }

    fn get_size(&self, namespace: &[u8]) -> Result<usize> {
        Ok(self.table.read().live_len(namespace))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const LONG: Duration = Duration::from_secs(60);

    #[test]
    fn test_set_and_get() {
        let store = LocalTtlStore::new();
        store.set(b"ns", b"k", b"v".to_vec(), LONG).unwrap();

        assert_eq!(store.get(b"ns", b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get(b"ns", b"missing").unwrap(), None);
        assert_eq!(store.get_size(b"ns").unwrap(), 1);
    }

    #[test]
    fn test_entry_expires() {
        let store = LocalTtlStore::new();
        store
            .set(b"ns", b"k", b"v".to_vec(), Duration::from_millis(100))
            .unwrap();
        assert_eq!(store.get(b"ns", b"k").unwrap(), Some(b"v".to_vec()));

        sleep(Duration::from_millis(250));

        assert_eq!(store.get(b"ns", b"k").unwrap(), None);
        assert_eq!(store.get_size(b"ns").unwrap(), 0);
        // The timer removed the entry and its namespace.
        assert_eq!(store.namespace_count(), 0);
    }

    #[test]
    fn test_reset_cancels_previous_expiry() {
        let store = LocalTtlStore::new();
        store
            .set(b"ns", b"k", b"v1".to_vec(), Duration::from_millis(200))
            .unwrap();
        sleep(Duration::from_millis(100));
        store
            .set(b"ns", b"k", b"v2".to_vec(), Duration::from_millis(200))
            .unwrap();
        sleep(Duration::from_millis(150));

        assert_eq!(store.get(b"ns", b"k").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn test_zero_ttl_removes_immediately() {
        let store = LocalTtlStore::new();
        store.set(b"ns", b"k", b"v".to_vec(), LONG).unwrap();
        store.set(b"ns", b"k", b"v".to_vec(), Duration::ZERO).unwrap();

        assert_eq!(store.get(b"ns", b"k").unwrap(), None);
        assert_eq!(store.total_entries(), 0);
    }

    #[test]
    fn test_namespace_isolation() {
        let store = LocalTtlStore::new();
        store.set(b"ns1", b"k", b"v1".to_vec(), LONG).unwrap();
        store.set(b"ns2", b"k", b"v2".to_vec(), LONG).unwrap();

        assert_eq!(store.get(b"ns1", b"k").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(store.get(b"ns2", b"k").unwrap(), Some(b"v2".to_vec()));

        store.clear(b"ns1").unwrap();

        assert_eq!(store.get(b"ns1", b"k").unwrap(), None);
        assert_eq!(store.get(b"ns2", b"k").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn test_clear_missing_namespace_is_noop() {
        let store = LocalTtlStore::new();
        store.clear(b"nothing").unwrap();
        assert_eq!(store.get_size(b"nothing").unwrap(), 0);
    }

    #[test]
    fn test_clear_then_set_survives_old_timer() {
        let store = LocalTtlStore::new();
        store
            .set(b"ns", b"k", b"old".to_vec(), Duration::from_millis(100))
            .unwrap();
        store.clear(b"ns").unwrap();
        store.set(b"ns", b"k", b"new".to_vec(), LONG).unwrap();

        sleep(Duration::from_millis(200));

        assert_eq!(store.get(b"ns", b"k").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn test_concurrent_writers() {
        let store = LocalTtlStore::new();
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    store.set(b"ns", &[i], vec![i], LONG).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get_size(b"ns").unwrap(), 8);
    }
}
