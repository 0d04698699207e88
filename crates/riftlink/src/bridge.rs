//! Blocking calls on top of the completion-based dispatcher.
//!
//! Every blocking call gets its own [`PendingCall`]: a one-slot channel
//! that the call's completion fills. Nothing is shared between two calls
//! except the registry that lets a disconnect release them all.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::RpcError;

/// Releases one waiting call with the given error.
type Canceller = Box<dyn FnOnce(RpcError) + Send>;

/// Completion handed to the dispatcher for a blocking call.
pub(crate) type Responder<T> = Box<dyn FnOnce(Result<T, RpcError>) + Send>;

/// Tracks every blocking call that is still waiting.
#[derive(Default)]
pub(crate) struct PendingRegistry {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, Canceller>>,
}

impl PendingRegistry {
    fn register(&self, cancel: Canceller) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live.lock().insert(id, cancel);
        id
    }

    fn remove(&self, id: u64) {
        self.live.lock().remove(&id);
    }

    /// Wakes every waiting call with `ConnectionClosed`.
    pub(crate) fn fail_all(&self, reason: &str) {
        let drained: Vec<Canceller> = self.live.lock().drain().map(|(_, c)| c).collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), reason, "releasing pending calls");
        }
        for cancel in drained {
            cancel(RpcError::ConnectionClosed(reason.to_string()));
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.live.lock().len()
    }
}

/// One outstanding blocking call. Deregisters itself when dropped, so a
/// timed-out call leaves nothing behind.
struct PendingCall<T> {
    id: u64,
    rx: Receiver<Result<T, RpcError>>,
    registry: Arc<PendingRegistry>,
}

impl<T> PendingCall<T> {
    fn wait(self, timeout: Duration) -> Result<T, RpcError> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                debug!(call = self.id, ?timeout, "blocking call timed out");
                Err(RpcError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(RpcError::ConnectionClosed("call was dropped".into()))
            }
        }
    }
}

impl<T> Drop for PendingCall<T> {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

/// Turns an asynchronous call into a blocking one with a deadline.
pub(crate) struct SyncBridge {
    registry: Arc<PendingRegistry>,
    timeout: Duration,
}

impl SyncBridge {
    pub(crate) fn new(registry: Arc<PendingRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Runs `issue` with a responder and blocks until the responder fires,
    /// the timeout elapses, or the registry is failed.
    ///
    /// If `issue` returns an error the call never started and that error
    /// is returned immediately.
    pub(crate) fn execute<T, F>(&self, issue: F) -> Result<T, RpcError>
    where
        T: Send + 'static,
        F: FnOnce(Responder<T>) -> Result<(), RpcError>,
    {
        let (tx, rx) = mpsc::sync_channel::<Result<T, RpcError>>(1);

        let cancel_tx = tx.clone();
        let id = self.registry.register(Box::new(move |err| {
            let _ = cancel_tx.try_send(Err(err));
        }));
        let call = PendingCall {
            id,
            rx,
            registry: Arc::clone(&self.registry),
        };

        issue(Box::new(move |result| deliver(&tx, id, result)))?;
        call.wait(self.timeout)
    }
}

fn deliver<T>(tx: &SyncSender<Result<T, RpcError>>, id: u64, result: Result<T, RpcError>) {
    match tx.try_send(result) {
        Ok(()) => {}
        Err(TrySendError::Disconnected(_)) => {
            warn!(call = id, "completion arrived after the caller gave up; discarded");
        }
        // Already released by a disconnect.
        Err(TrySendError::Full(_)) => {
            debug!(call = id, "completion arrived after the call was released");
        }
    }
}
