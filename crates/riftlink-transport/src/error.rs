use riftlink_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A call was issued before the connection finished negotiating.
    #[error("transport is not connected")]
    NotConnected,

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Opening the connection failed (bad URL, refused, proxy tunnel).
    #[error("connect failed: {0}")]
    Connect(String),

    /// Socket-level I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
