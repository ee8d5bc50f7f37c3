//! Upstream system-of-record abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// One local mutation to apply upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamEvent {
    /// `"create"`, `"update"` or `"delete"`.
    pub event_type: String,
    /// Upstream table the entity lives in.
    pub entity_type: String,
    /// Local identifier of the entity.
    pub entity_id: String,
    /// Field values to write.
    pub payload: serde_json::Value,
}

/// A record read back from upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamRecord {
    /// Upstream record identifier.
    pub id: String,
    /// Field values.
    pub fields: serde_json::Value,
}

/// A failed upstream call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upstream call failed ({kind}, status {status_code:?}): {message}")]
pub struct UpstreamError {
    /// Retry classification.
    pub kind: FailureKind,
    /// HTTP status code, if any.
    pub status_code: Option<u16>,
    /// Human-readable detail.
    pub message: String,
}

impl UpstreamError {
    /// A transient failure that should be retried with backoff.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Retryable,
            status_code: None,
            message: message.into(),
        }
    }

    /// A failure that another identical attempt will not fix.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            status_code: None,
            message: message.into(),
        }
    }

    /// Build an error classified from an HTTP status code.
    pub fn from_status(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::from_status(status_code),
            status_code,
            message: message.into(),
        }
    }
}

/// Client for the upstream system of record.
///
/// `apply` must be idempotent from the upstream side: the dispatcher may
/// deliver the same event more than once.
#[async_trait]
pub trait UpstreamClient: Send + Sync + std::fmt::Debug {
    /// Whether credentials are configured.
    fn is_configured(&self) -> bool;

    /// Apply one event.
    async fn apply(&self, event: &UpstreamEvent) -> Result<(), UpstreamError>;

    /// List every record of `table`, optionally only those modified after
    /// `modified_since`.
    async fn list_records(
        &self,
        table: &str,
        modified_since: Option<DateTime<Utc>>,
    ) -> Result<Vec<UpstreamRecord>, UpstreamError>;
}
