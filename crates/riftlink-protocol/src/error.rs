//! Error types for the protocol layer.
//!
//! Each Riftlink crate defines its own error enum. A `ProtocolError`
//! always means the bytes or values were wrong, never the network.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes or a `Value`).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed.
    ///
    /// Common causes: malformed frames, a result payload whose shape does
    /// not match the operation's declared output type.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame decoded fine but violates protocol rules, e.g. a reply
    /// for an invoke id that was never issued.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
