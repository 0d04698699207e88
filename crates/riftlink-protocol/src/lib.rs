//! Wire protocol for Riftlink.
//!
//! This crate defines what a Riftlink client and a game-platform gateway
//! exchange once a transport connection is open:
//!
//! - **Frames** ([`Frame`]) — the envelopes that travel on the wire:
//!   connect negotiation, remote invocations, results, faults, status.
//! - **Calls** ([`CallRequest`], [`Header`]) — what a caller asks the
//!   transport to invoke, and the per-call metadata attached to it.
//! - **Handshake payloads** ([`AuthenticationCredentials`],
//!   [`CommandMessage`]) — the bodies of the two remote login stages.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (Frame) → Client (operations, handshake)
//! ```
//!
//! The protocol layer knows nothing about sockets or sessions. It only
//! knows the shapes of messages and how to serialize them.

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{AuthenticationCredentials, CommandMessage};
pub use types::{
    CallRequest, Fault, Frame, Header, ObjectEncoding, StatusInfo,
    ENDPOINT_HEADER, FLEX_CLIENT_ID_HEADER, REQUEST_TIMEOUT_HEADER,
    SUCCESS_STATUS_CODES,
};

/// Opaque payload value carried in call arguments and results.
///
/// Domain data returned by remote operations is not modelled by this
/// crate; callers decode it into their own types with `serde`.
pub use serde_json::Value;
