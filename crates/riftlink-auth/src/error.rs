//! Error types for the token stage.

/// Why a connection attempt failed before any remote authentication.
///
/// Most variants come from the login-queue exchange. The last three are
/// raised by the client core for failures that end an attempt at the
/// same point in the handshake: the gateway connection dropping before
/// authentication, an explicit disconnect, or the worker thread failing
/// to start.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("login queue request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The login queue answered with a non-success HTTP status.
    #[error("login queue returned HTTP {0}")]
    Status(u16),

    /// The login queue answered but did not issue a token.
    #[error("login queue rejected the login (status {status}): {reason}")]
    Rejected { status: String, reason: String },

    /// The gateway connection failed or closed before authentication.
    #[error("gateway connection failed: {0}")]
    Transport(String),

    /// The attempt was cancelled by an explicit disconnect.
    #[error("connection attempt aborted")]
    Aborted,

    /// The token worker thread could not be started.
    #[error("could not start token worker: {0}")]
    Worker(String),
}
