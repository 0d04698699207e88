//! Unified error type for RPC calls and client control.

use std::time::Duration;

use riftlink_protocol::{Fault, ProtocolError};
use riftlink_transport::{CallFailure, TransportError};

/// Errors returned by [`RpcClient`](crate::RpcClient) operations.
///
/// Connection-attempt failures are not reported here: those arrive in the
/// connect callback as a [`ConnectResult`](crate::ConnectResult).
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// No authenticated session exists. Nothing was sent.
    #[error("client is not connected")]
    NotConnected,

    /// `connect` was called while a handshake or session is live.
    #[error("a connection attempt or session is already active")]
    AlreadyActive,

    /// The remote service rejected the call.
    #[error("remote fault: {0}")]
    Fault(Fault),

    /// A blocking call received no completion in time.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The connection went away before the call completed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The transport refused the call.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The result could not be decoded into the expected type.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<CallFailure> for RpcError {
    fn from(failure: CallFailure) -> Self {
        match failure {
            CallFailure::Fault(fault) => Self::Fault(fault),
            CallFailure::Closed(reason) => Self::ConnectionClosed(reason),
        }
    }
}

impl RpcError {
    /// Maps a refused call onto the closest client-level error, so callers
    /// see `NotConnected` whether the client or the transport noticed first.
    pub(crate) fn from_refused(err: TransportError) -> Self {
        match err {
            TransportError::NotConnected => Self::NotConnected,
            TransportError::ConnectionClosed(reason) => Self::ConnectionClosed(reason),
            other => Self::Transport(other),
        }
    }
}
