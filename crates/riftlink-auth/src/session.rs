//! Credential and token types.
//!
//! - **Credentials** — who is logging in. Supplied once, never mutated.
//! - **AuthToken** — what the login queue hands back. Short-lived: the
//!   client core keeps it only for the duration of one handshake.
//! - **Session** — what the gateway returns from the first remote login.
//!   Only its token is used, to build the second login stage.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Account name and password.
///
/// `Debug` is written by hand so the password never reaches a log line.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AuthToken
// ---------------------------------------------------------------------------

/// A login-queue token plus the queue's status and rate indicators.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    /// Queue status, e.g. `"LOGIN"`.
    pub status: String,
    /// Login rate reported by the queue.
    pub rate: u64,
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &"<redacted>")
            .field("status", &self.status)
            .field("rate", &self.rate)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Result of the first remote login call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Server-issued session token.
    pub token: String,
    /// Account data sent alongside the token. Opaque to Riftlink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_summary: Option<Value>,
}
