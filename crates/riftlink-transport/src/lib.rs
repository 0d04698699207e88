//! Transport abstraction layer for Riftlink.
//!
//! Provides the [`Transport`] trait (a live, callback-driven connection to
//! the game gateway) and the [`Connector`] trait that creates one. The
//! client core only ever talks to these traits, so tests can swap in a
//! scripted fake and production can use [`WebSocketTransport`].
//!
//! # Threading contract
//!
//! Every method on [`Transport`] returns immediately. Results arrive later
//! on a context owned by the transport:
//!
//! - connection events are delivered to the registered [`EventSink`];
//! - each accepted call's [`Completion`] runs exactly once, with the
//!   result, a [`Fault`], or [`CallFailure::Closed`] if the connection
//!   went away first.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

mod error;
mod headers;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use headers::HeaderSet;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};

use std::fmt;
use std::sync::Arc;

use riftlink_protocol::{CallRequest, Fault, Header, ObjectEncoding, StatusInfo, Value};

/// Opaque identifier for a transport instance, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Events and completions
// ---------------------------------------------------------------------------

/// Connection-level notifications produced by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection is negotiated and calls may be issued.
    Connected,
    /// The connection is gone. Emitted at most once per transport.
    Disconnected,
    /// A status notification from the gateway or the transport itself.
    /// Connect failures arrive here with an `error` level.
    Status(StatusInfo),
}

/// Receives [`TransportEvent`]s. Called from the transport's own context.
pub type EventSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Why a call did not produce a result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CallFailure {
    /// The remote service rejected the call.
    #[error("remote fault: {0}")]
    Fault(Fault),

    /// The connection closed before the call completed.
    #[error("connection closed: {0}")]
    Closed(String),
}

/// Outcome handed to a [`Completion`].
pub type CallOutcome = Result<Value, CallFailure>;

/// One-shot completion handler for a single call.
pub type Completion = Box<dyn FnOnce(CallOutcome) + Send>;

// ---------------------------------------------------------------------------
// Transport and Connector
// ---------------------------------------------------------------------------

/// A live connection to the gateway.
///
/// ## Why a trait object
///
/// The client stores its transport as `Arc<dyn Transport>`. That only
/// works if the trait is *object-safe*: no generic methods, no `Self` in
/// return position, no associated types the caller would have to name.
/// Completions and event handlers are therefore boxed closures
/// ([`Completion`], [`EventSink`]) rather than generic parameters.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → the same transport is touched from the caller's
///   thread (issuing calls), the token worker, and the transport's own
///   reader (delivering results).
/// - `'static` → a transport never borrows from the client that created
///   it, so it can live inside spawned tasks and callbacks.
///
/// ## `&self` everywhere
///
/// Every method takes `&self`, even `connect` and `close`. Implementations
/// keep their mutable state behind locks or atomics (interior
/// mutability), which lets many holders of the same `Arc` call into it
/// without coordinating among themselves.
pub trait Transport: Send + Sync + 'static {
    /// Registers the handler for connection events, replacing any
    /// previous one. Must be called before [`connect`](Self::connect).
    fn set_event_sink(&self, sink: EventSink);

    /// Starts connecting to `url`. Success or failure is reported through
    /// the event sink; an `Err` here means the attempt could not even
    /// start.
    fn connect(&self, url: &str) -> Result<(), TransportError>;

    /// Adds a header sent with every subsequent call. A header with the
    /// same name replaces the existing one.
    fn add_header(&self, header: Header);

    /// Issues a call.
    ///
    /// On `Ok`, `on_complete` will run exactly once. On `Err`, it is
    /// dropped without running and nothing was sent.
    fn call(&self, request: CallRequest, on_complete: Completion) -> Result<(), TransportError>;

    /// Closes the connection. Idempotent.
    fn close(&self);

    /// The client id assigned by the gateway, once connected.
    fn client_id(&self) -> Option<String>;
}

/// Settings applied when a transport is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// `host:port` of an HTTP proxy to tunnel through, if any.
    pub proxy: Option<String>,
    /// Object encoding to negotiate with the gateway.
    pub object_encoding: ObjectEncoding,
    /// Application name sent in the connect frame.
    pub app: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            object_encoding: ObjectEncoding::Amf3,
            app: String::new(),
        }
    }
}

/// Creates transports. The client calls [`open`](Self::open) once per
/// connection attempt, after the token stage has succeeded.
///
/// A connector is the seam between the client and the network. The
/// production one, [`WebSocketConnector`], spawns each transport on a
/// Tokio runtime; tests implement it with a scripted fake that answers
/// calls synchronously. The returned transport is unconnected: the client
/// registers its event sink first and only then calls
/// [`Transport::connect`], so no event can be missed.
pub trait Connector: Send + Sync + 'static {
    /// Creates a fresh, unconnected transport.
    ///
    /// # Errors
    /// Returns a [`TransportError`] if the transport cannot be built at
    /// all, for example when the connector has no runtime to run on.
    fn open(&self, options: TransportOptions) -> Result<Arc<dyn Transport>, TransportError>;
}
