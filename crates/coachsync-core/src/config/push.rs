//! Push transport configuration.

use serde::{Deserialize, Serialize};

/// Credentials for the push gateway that encrypts and forwards payloads
/// to browser push services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Gateway endpoint accepting `{subscription, payload}` requests.
    #[serde(default)]
    pub gateway_url: Option<String>,
    /// Bearer token for the gateway.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Time-to-live forwarded to the push service, in seconds.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// HTTP timeout for one delivery, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl PushConfig {
    /// Whether credentials are present. Without them the notification
    /// pipeline is a no-op.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.gateway_url) && present(&self.api_key)
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            api_key: None,
            ttl_seconds: default_ttl(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_ttl() -> u64 {
    24 * 60 * 60
}

fn default_timeout() -> u64 {
    10
}
