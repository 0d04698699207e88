//! Connection profile and client tuning.
//!
//! [`ConnectionProfile`] describes *who* connects and *where*; it derives
//! `Deserialize` so callers can load it from any serde format.
//! [`ClientConfig`] holds protocol constants that rarely change.

use std::time::Duration;

use riftlink_auth::{Credentials, HttpAcquirerConfig, HttpTokenAcquirer};
use serde::{Deserialize, Serialize};

/// Everything needed to log a particular account into a particular region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub credentials: Credentials,
    pub region: RegionEndpoints,
    pub client: ClientInfo,
    #[serde(default)]
    pub proxy: ProxySettings,
}

impl ConnectionProfile {
    /// An HTTP token acquirer routed through this profile's login-queue
    /// proxy, if one is set.
    pub fn token_acquirer(&self) -> HttpTokenAcquirer {
        HttpTokenAcquirer::new(HttpAcquirerConfig {
            proxy: self.proxy.login_queue.clone(),
            ..HttpAcquirerConfig::default()
        })
    }
}

/// Region-specific service locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEndpoints {
    /// Login-queue URL handed to the token acquirer.
    pub login_queue_url: String,
    /// Messaging gateway URL handed to the transport.
    pub rpc_url: String,
}

/// Client identification sent in the remote login call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_version: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_ip_address")]
    pub ip_address: String,
}

fn default_locale() -> String {
    "en_US".into()
}

fn default_domain() -> String {
    "lolclient.lol.riotgames.com".into()
}

fn default_ip_address() -> String {
    "127.0.0.1".into()
}

/// Optional HTTP proxies, as `host:port`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub login_queue: Option<String>,
    pub rpc: Option<String>,
}

/// Protocol settings shared by every connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Endpoint every remote call is routed through.
    pub endpoint: String,
    /// Sent to the server as the request-timeout header and used as the
    /// wait limit for blocking calls.
    pub request_timeout: Duration,
    /// Application name announced when the transport connects.
    pub app: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "my-rtmps".into(),
            request_timeout: Duration::from_secs(60),
            app: String::new(),
        }
    }
}

impl ClientConfig {
    /// The request timeout in whole seconds, rounded up so a sub-second
    /// timeout is never announced as zero.
    pub fn request_timeout_secs(&self) -> u64 {
        let timeout = self.request_timeout;
        timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0)
    }
}
