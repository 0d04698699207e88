//! Routes typed remote calls to the live transport.
//!
//! A remote call is described by three strings (endpoint, service,
//! operation) plus a list of arguments, and answered with an untyped
//! [`Value`]. This module puts a type on both ends:
//!
//! - an [`Operation`] names the service and operation at compile time and
//!   declares the Rust type the answer decodes into;
//! - the [`Dispatcher`] builds the request, hands it to the transport, and
//!   decodes the answer with `serde` before the caller's handler sees it.
//!
//! The dispatcher never waits. Blocking calls are layered on top of it by
//! the client (see `RpcClient::call`).

use std::sync::Arc;

use parking_lot::RwLock;
use riftlink_protocol::{CallRequest, ProtocolError, Value};
use riftlink_transport::{CallOutcome, Transport};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::RpcError;

/// A remote operation: which service to call and what it returns.
///
/// Implementations are zero-sized markers; see [`crate::operations`].
///
/// ## Associated consts and types
///
/// Nothing about an operation changes at runtime, so everything lives on
/// the type itself: `SERVICE` and `NAME` are associated *consts*, and
/// `Output` is an associated *type*. A call site picks the operation with
/// a turbofish, `dispatcher.call::<GetSummonerByName, _>(..)`, and the
/// handler receives a `Result<Option<PublicSummoner>, RpcError>` with no
/// further annotation.
///
/// ## Bounds on `Output`
///
/// - `DeserializeOwned` → the decoded value owns its data; the response
///   body is dropped right after decoding.
/// - `Send + 'static` → the value is produced on the transport's context
///   and moved to whichever thread is waiting for it.
pub trait Operation {
    /// Destination service, e.g. `"summonerService"`.
    const SERVICE: &'static str;
    /// Operation name on that service.
    const NAME: &'static str;
    /// Result type the response body decodes into.
    type Output: DeserializeOwned + Send + 'static;
}

/// Holds the transport once, and only while, the client is ready.
#[derive(Default)]
pub(crate) struct TransportSlot {
    handle: RwLock<Option<Arc<dyn Transport>>>,
}

impl TransportSlot {
    pub(crate) fn publish(&self, transport: Arc<dyn Transport>) {
        *self.handle.write() = Some(transport);
    }

    pub(crate) fn clear(&self) {
        self.handle.write().take();
    }

    pub(crate) fn get(&self) -> Option<Arc<dyn Transport>> {
        self.handle.read().clone()
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.handle.read().is_some()
    }
}

/// Stateless forwarder from operations to transport calls.
///
/// Holds no per-call state: every call gets its own completion and the
/// transport correlates results.
#[derive(Clone)]
pub struct Dispatcher {
    slot: Arc<TransportSlot>,
    endpoint: String,
}

impl Dispatcher {
    pub(crate) fn new(slot: Arc<TransportSlot>, endpoint: String) -> Self {
        Self { slot, endpoint }
    }

    /// Issues `O` with `args`. `handler` runs exactly once on the
    /// transport's context if this returns `Ok`.
    ///
    /// # Errors
    /// [`RpcError::NotConnected`] before the handshake completes or after
    /// a disconnect; nothing is sent in that case.
    pub fn call<O, F>(&self, args: Vec<Value>, handler: F) -> Result<(), RpcError>
    where
        O: Operation,
        F: FnOnce(Result<O::Output, RpcError>) + Send + 'static,
    {
        self.invoke(O::SERVICE, O::NAME, args, move |outcome| {
            handler(decode::<O::Output>(outcome))
        })
    }

    /// Issues a call by name and hands back the undecoded body.
    ///
    /// The escape hatch for services without an [`Operation`] marker.
    /// `handler` receives the raw [`CallOutcome`]; a fault stays a
    /// [`CallFailure::Fault`](riftlink_transport::CallFailure::Fault).
    ///
    /// # Errors
    /// [`RpcError::NotConnected`] when no session is ready.
    /// [`RpcError::ConnectionClosed`] or [`RpcError::Transport`] when the
    /// transport refuses the call; `handler` is dropped unrun.
    pub fn invoke<F>(
        &self,
        service: &str,
        operation: &str,
        args: Vec<Value>,
        handler: F,
    ) -> Result<(), RpcError>
    where
        F: FnOnce(CallOutcome) + Send + 'static,
    {
        let Some(transport) = self.slot.get() else {
            return Err(RpcError::NotConnected);
        };
        let request = CallRequest::remote(&self.endpoint, service, operation, args);
        debug!(call = %request, "dispatching");
        transport
            .call(request, Box::new(handler))
            .map_err(RpcError::from_refused)
    }
}

fn decode<T: DeserializeOwned>(outcome: CallOutcome) -> Result<T, RpcError> {
    let body = outcome?;
    serde_json::from_value(body).map_err(|e| RpcError::Protocol(ProtocolError::Decode(e)))
}
