//! Login-queue client over HTTPS.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::{AuthToken, Credentials, NetworkError, TokenAcquirer};

/// Queue status that means "no token for you".
const STATUS_FAILED: &str = "FAILED";

/// Settings for [`HttpTokenAcquirer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpAcquirerConfig {
    /// HTTP(S) proxy for the login-queue request, as `host:port` or a URL.
    pub proxy: Option<String>,
    /// Whole-request timeout.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpAcquirerConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Duration::from_secs(30),
            user_agent: concat!("riftlink/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// [`TokenAcquirer`] that POSTs credentials to the login queue.
///
/// The request body is a single form field,
/// `payload=user=<name>,password=<password>`, and the queue answers with
/// JSON carrying `status`, `rate`, `token`, and sometimes `reason`.
/// Queueing is not supported: a response without a token is a rejection.
///
/// The underlying `reqwest::blocking::Client` is built inside
/// [`acquire`](TokenAcquirer::acquire), on the worker thread, because a
/// blocking client must not be created or dropped on an async runtime
/// thread.
#[derive(Debug, Clone, Default)]
pub struct HttpTokenAcquirer {
    config: HttpAcquirerConfig,
}

impl HttpTokenAcquirer {
    pub fn new(config: HttpAcquirerConfig) -> Self {
        Self { config }
    }

    fn client(&self) -> Result<Client, NetworkError> {
        let mut builder = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent.clone());
        if let Some(proxy) = &self.config.proxy {
            let url = if proxy.contains("://") {
                proxy.clone()
            } else {
                format!("http://{proxy}")
            };
            builder = builder.proxy(reqwest::Proxy::all(url).map_err(NetworkError::Request)?);
        }
        builder.build().map_err(NetworkError::Request)
    }
}

impl TokenAcquirer for HttpTokenAcquirer {
    fn acquire(
        &self,
        gateway_url: &str,
        credentials: &Credentials,
    ) -> Result<AuthToken, NetworkError> {
        let client = self.client()?;
        tracing::debug!(gateway_url, username = %credentials.username, "requesting login token");

        let payload = format!(
            "user={},password={}",
            credentials.username, credentials.password
        );
        let response = client
            .post(gateway_url)
            .form(&[("payload", payload)])
            .send()
            .map_err(NetworkError::Request)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(gateway_url, status = status.as_u16(), "login queue refused request");
            return Err(NetworkError::Status(status.as_u16()));
        }

        let reply: QueueResponse = response.json().map_err(NetworkError::Request)?;
        let token = reply.into_token()?;
        tracing::info!(status = %token.status, rate = token.rate, "login token acquired");
        Ok(token)
    }
}

/// The fields of the login-queue reply Riftlink looks at.
#[derive(Debug, Deserialize)]
struct QueueResponse {
    status: String,
    #[serde(default)]
    rate: u64,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl QueueResponse {
    fn into_token(self) -> Result<AuthToken, NetworkError> {
        match self.token {
            Some(token) if self.status != STATUS_FAILED => Ok(AuthToken {
                token,
                status: self.status,
                rate: self.rate,
            }),
            _ => Err(NetworkError::Rejected {
                status: self.status,
                reason: self.reason.unwrap_or_else(|| "no token issued".into()),
            }),
        }
    }
}
