//! Core protocol types: frames, call requests, headers, faults.
//!
//! Every structure here derives `Serialize`/`Deserialize`. Field names on
//! the wire follow the gateway's conventions (camelCase for Flex objects
//! such as [`Fault`], snake_case for Riftlink's own framing).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Header names
// ---------------------------------------------------------------------------

/// Per-call timeout, in seconds, that the gateway should honour.
pub const REQUEST_TIMEOUT_HEADER: &str = "DSRequestTimeout";

/// Client identifier. Starts as a random UUID and is replaced by the
/// session token once the first login stage succeeds.
pub const FLEX_CLIENT_ID_HEADER: &str = "DSId";

/// Logical endpoint the gateway should route calls to.
pub const ENDPOINT_HEADER: &str = "DSEndpoint";

// ---------------------------------------------------------------------------
// ObjectEncoding
// ---------------------------------------------------------------------------

/// Object encoding the client asks the gateway to use.
///
/// The real game client speaks AMF3, so that is the default. The flag is
/// sent in the [`Frame::Connect`] negotiation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectEncoding {
    #[serde(rename = "AMF0")]
    Amf0,
    #[default]
    #[serde(rename = "AMF3")]
    Amf3,
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// A named value attached to every call issued on a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub must_understand: bool,
    pub value: Value,
}

impl Header {
    pub fn new(name: impl Into<String>, must_understand: bool, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            must_understand,
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Fault
// ---------------------------------------------------------------------------

/// A structured error returned by the remote service for one call.
///
/// A fault is about the call, not the connection: the connection stays
/// usable after a fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fault {
    pub fault_code: String,
    pub fault_string: String,
    #[serde(default)]
    pub fault_detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<Value>,
}

impl Fault {
    /// Builds a fault with an empty detail and no root cause.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fault_code: code.into(),
            fault_string: message.into(),
            fault_detail: String::new(),
            root_cause: None,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.fault_code, self.fault_string)?;
        if !self.fault_detail.is_empty() {
            write!(f, " ({})", self.fault_detail)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StatusInfo
// ---------------------------------------------------------------------------

/// Status codes that report a healthy connection. Any other code seen
/// before a session is authenticated ends the attempt.
pub const SUCCESS_STATUS_CODES: &[&str] = &["NetConnection.Connect.Success"];

/// A connection-level status notification (`NetConnection.*` codes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInfo {
    /// `"status"`, `"warning"` or `"error"`.
    pub level: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
}

impl StatusInfo {
    pub fn new(
        level: impl Into<String>,
        code: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            level: level.into(),
            code: code.into(),
            description: description.into(),
        }
    }

    /// Shorthand for an `error`-level notification.
    pub fn error(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new("error", code, description)
    }

    pub fn is_error(&self) -> bool {
        self.level == "error"
    }

    /// `true` for a non-error status whose code is in
    /// [`SUCCESS_STATUS_CODES`].
    pub fn is_success(&self) -> bool {
        !self.is_error() && SUCCESS_STATUS_CODES.contains(&self.code.as_str())
    }
}

impl fmt::Display for StatusInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.code)?;
        if !self.description.is_empty() {
            write!(f, ": {}", self.description)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CallRequest
// ---------------------------------------------------------------------------

/// A remote invocation as the caller describes it, before the transport
/// assigns an invoke id and attaches the connection's headers.
///
/// Remote-service calls carry an `endpoint` and a `destination` (the
/// service name). Connection-level commands such as `"auth"` carry
/// neither.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub endpoint: Option<String>,
    pub destination: Option<String>,
    pub operation: String,
    pub args: Vec<Value>,
}

impl CallRequest {
    /// A call to `destination.operation` routed through `endpoint`.
    pub fn remote(
        endpoint: impl Into<String>,
        destination: impl Into<String>,
        operation: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            destination: Some(destination.into()),
            operation: operation.into(),
            args,
        }
    }

    /// A connection-level command with no endpoint or destination.
    pub fn command(operation: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            endpoint: None,
            destination: None,
            operation: operation.into(),
            args,
        }
    }
}

impl fmt::Display for CallRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.destination {
            Some(destination) => write!(f, "{destination}.{}", self.operation),
            None => f.write_str(&self.operation),
        }
    }
}

// ---------------------------------------------------------------------------
// Frame — the top-level wire format
// ---------------------------------------------------------------------------

/// Every message on the wire is a `Frame`.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
///   `{ "type": "Result", "invoke_id": 3, "body": {...} }`
///
/// ```text
/// client                                gateway
///   │ ── Connect { object_encoding } ──▶  │
///   │ ◀──────── ConnectAck { client_id } ─ │
///   │ ── Invoke { invoke_id: 1, ... } ──▶  │
///   │ ◀──── Result { invoke_id: 1 } ────── │   (or Error { fault })
///   │ ◀──────────── Status { info } ────── │   (any time)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    /// Client → gateway: first frame after the socket opens.
    Connect {
        object_encoding: ObjectEncoding,
        app: String,
    },

    /// Gateway → client: the connection is established.
    ConnectAck { client_id: String },

    /// Gateway → client: connection-level notification.
    Status { info: StatusInfo },

    /// Client → gateway: invoke a remote operation or command.
    Invoke {
        invoke_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<String>,
        operation: String,
        #[serde(default)]
        headers: Vec<Header>,
        #[serde(default)]
        body: Vec<Value>,
    },

    /// Gateway → client: an invocation completed.
    Result {
        invoke_id: u64,
        #[serde(default)]
        body: Value,
    },

    /// Gateway → client: an invocation faulted.
    Error { invoke_id: u64, fault: Fault },

    /// Either direction: the sender is closing the connection.
    Close { reason: String },
}

impl Frame {
    /// Builds the `Invoke` frame for `request`.
    pub fn invoke(invoke_id: u64, request: CallRequest, headers: Vec<Header>) -> Self {
        Frame::Invoke {
            invoke_id,
            endpoint: request.endpoint,
            destination: request.destination,
            operation: request.operation,
            headers,
            body: request.args,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
