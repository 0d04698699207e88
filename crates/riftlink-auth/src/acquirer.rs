//! The token-acquisition hook.
//!
//! The client core doesn't know how tokens are obtained. It calls a
//! [`TokenAcquirer`] on a dedicated worker thread and moves on with
//! whatever comes back. Production uses
//! [`HttpTokenAcquirer`](crate::HttpTokenAcquirer); tests plug in a
//! closure.

use crate::{AuthToken, Credentials, NetworkError};

/// Exchanges credentials for a short-lived [`AuthToken`].
///
/// # Blocking
///
/// `acquire` is allowed to block for as long as the exchange takes. The
/// client never calls it on a thread the caller expects to stay
/// responsive.
///
/// # Example
///
/// ```rust
/// use riftlink_auth::{AuthToken, Credentials, NetworkError, TokenAcquirer};
///
/// /// Hands out a fixed token. Only useful against a local test gateway.
/// struct StaticToken(&'static str);
///
/// impl TokenAcquirer for StaticToken {
///     fn acquire(&self, _gateway_url: &str, _credentials: &Credentials)
///         -> Result<AuthToken, NetworkError>
///     {
///         Ok(AuthToken { token: self.0.into(), status: "LOGIN".into(), rate: 0 })
///     }
/// }
///
/// let token = StaticToken("T1")
///     .acquire("https://lq.example", &Credentials::new("user", "pass"))
///     .unwrap();
/// assert_eq!(token.token, "T1");
/// ```
pub trait TokenAcquirer: Send + Sync + 'static {
    /// Performs the exchange against `gateway_url`.
    ///
    /// # Errors
    /// Any [`NetworkError`]; the client reports it as a token-stage failure.
    fn acquire(
        &self,
        gateway_url: &str,
        credentials: &Credentials,
    ) -> Result<AuthToken, NetworkError>;
}

/// Closures work as acquirers, which keeps test setups short.
impl<F> TokenAcquirer for F
where
    F: Fn(&str, &Credentials) -> Result<AuthToken, NetworkError> + Send + Sync + 'static,
{
    fn acquire(
        &self,
        gateway_url: &str,
        credentials: &Credentials,
    ) -> Result<AuthToken, NetworkError> {
        self(gateway_url, credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_acquirer_receives_arguments() {
        let acquirer = |url: &str, creds: &Credentials| -> Result<AuthToken, NetworkError> {
            assert_eq!(url, "https://lq.example");
            Ok(AuthToken {
                token: format!("token-for-{}", creds.username),
                status: "LOGIN".into(),
                rate: 0,
            })
        };

        let token = acquirer
            .acquire("https://lq.example", &Credentials::new("ezreal", "pw"))
            .unwrap();

        assert_eq!(token.token, "token-for-ezreal");
    }
}
