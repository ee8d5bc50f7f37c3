//! Push transport abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Browser push subscription keys needed to address one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushTarget {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Client public key (base64url).
    pub p256dh: String,
    /// Client auth secret (base64url).
    pub auth: String,
}

/// A failed push delivery.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("push delivery failed ({kind}, status {status_code:?}): {message}")]
pub struct PushError {
    /// Retry classification.
    pub kind: FailureKind,
    /// Status code reported by the push service, if the request got that far.
    pub status_code: Option<u16>,
    /// Human-readable detail.
    pub message: String,
}

impl PushError {
    /// Build an error classified from its status code.
    pub fn from_status(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::from_status(status_code),
            status_code,
            message: message.into(),
        }
    }

    /// Whether the push service reported the subscription as gone.
    pub fn is_subscription_gone(&self) -> bool {
        matches!(self.status_code, Some(404) | Some(410))
    }
}

/// Delivers a JSON payload to one push subscription.
#[async_trait]
pub trait PushTransport: Send + Sync + std::fmt::Debug {
    /// Whether credentials are configured. An unconfigured transport turns
    /// the whole notification pipeline into a no-op.
    fn is_configured(&self) -> bool;

    /// Send `payload` to `target`.
    async fn send(&self, target: &PushTarget, payload: &serde_json::Value) -> Result<(), PushError>;
}
