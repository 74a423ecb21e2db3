//! Sync/Async Bridge Module
//!
//! Drives an async store operation to completion from synchronous code. The
//! future runs on a dedicated worker thread with its own single-use runtime,
//! so a caller already inside a runtime never re-enters it.

use std::future::Future;
use std::thread;

use tracing::debug;

use crate::error::{MemoError, Result};

const WORKER_NAME: &str = "ttl-memo-bridge";

/// Runs `future` to completion on a short-lived worker thread.
///
/// Fails with [`MemoError::BridgeUnavailable`] if the worker cannot be
/// started, its runtime cannot be built, or it panics.
pub(crate) fn block_on<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send,
    T: Send,
{
    debug!("Bridging async store call onto worker thread");
    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn_scoped(scope, move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| {
                        MemoError::BridgeUnavailable(format!("cannot build runtime: {}", e))
                    })?;
                runtime.block_on(future)
            })
            .map_err(|e| {
                MemoError::BridgeUnavailable(format!("cannot start worker thread: {}", e))
            })?;

        worker
            .join()
            .map_err(|_| MemoError::BridgeUnavailable("worker thread panicked".to_string()))?
    })
}
