//! Outcome of a connection attempt.

use std::fmt;

use riftlink_auth::NetworkError;
use riftlink_protocol::Fault;

/// Which remote authentication stage rejected the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    /// The `loginService.login` call.
    Login,
    /// The Flex `auth` command.
    FlexAuth,
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => f.write_str("login"),
            Self::FlexAuth => f.write_str("flex auth"),
        }
    }
}

/// Delivered exactly once per connection attempt to the connect callback.
#[derive(Debug)]
pub enum ConnectResult {
    /// Both remote stages succeeded. Calls may now be issued.
    Success,
    /// The attempt ended before remote authentication: the token exchange
    /// failed, the gateway connection failed or dropped, or the attempt
    /// was aborted by `disconnect`.
    TokenFailure(NetworkError),
    /// A remote authentication stage returned a fault.
    RemoteAuthFailure { stage: AuthStage, fault: Fault },
}

impl ConnectResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ConnectResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("connected"),
            Self::TokenFailure(err) => write!(f, "could not obtain a session: {err}"),
            Self::RemoteAuthFailure { stage, fault } => {
                write!(f, "{stage} rejected by the server: {fault}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success() {
        assert!(ConnectResult::Success.is_success());
        assert!(!ConnectResult::TokenFailure(NetworkError::Aborted).is_success());
    }

    #[test]
    fn test_display_names_the_failing_stage() {
        let result = ConnectResult::RemoteAuthFailure {
            stage: AuthStage::FlexAuth,
            fault: Fault::new("Client.Authentication", "bad session"),
        };
        let printed = result.to_string();
        assert!(printed.starts_with("flex auth rejected"));
        assert!(printed.contains("bad session"));
    }

    #[test]
    fn test_display_token_failure_includes_cause() {
        let result = ConnectResult::TokenFailure(NetworkError::Status(503));
        assert_eq!(
            result.to_string(),
            "could not obtain a session: login queue returned HTTP 503"
        );
    }
}
