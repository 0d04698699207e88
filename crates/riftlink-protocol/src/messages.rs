//! Payloads of the two remote authentication stages.

use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Body of the first remote login call (`loginService.login`).
///
/// Mirrors the game client's credentials object field for field. The
/// three legacy fields are always sent as `null`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationCredentials {
    pub username: String,
    pub password: String,
    pub auth_token: String,
    pub client_version: String,
    pub ip_address: String,
    pub locale: String,
    pub domain: String,
    pub old_password: Option<String>,
    pub partner_credentials: Option<String>,
    pub security_answer: Option<String>,
}

// Hand-written so passwords never end up in logs.
impl fmt::Debug for AuthenticationCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auth_token", &"<redacted>")
            .field("client_version", &self.client_version)
            .field("ip_address", &self.ip_address)
            .field("locale", &self.locale)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// A Flex command message.
///
/// Only the login command is ever built by Riftlink: it authenticates the
/// Flex channel with `base64("<username>:<session token>")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMessage {
    pub operation: u32,
    pub body: String,
    pub client_id: Option<String>,
    pub correlation_id: Option<String>,
    pub destination: String,
    pub message_id: String,
}

impl CommandMessage {
    /// Flex `CommandMessage.LOGIN_OPERATION`.
    pub const LOGIN_OPERATION: u32 = 8;

    /// Builds the login command for the second handshake stage.
    ///
    /// Every call produces a fresh `message_id`.
    pub fn login(username: &str, session_token: &str, client_id: Option<String>) -> Self {
        let body = base64::engine::general_purpose::STANDARD
            .encode(format!("{username}:{session_token}"));
        Self {
            operation: Self::LOGIN_OPERATION,
            body,
            client_id,
            correlation_id: None,
            destination: String::new(),
            message_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}
