//! Append-only log of per-device delivery attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One attempt to deliver one job to one subscription.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeliveryLogEntry {
    /// Log row identifier.
    pub id: i64,
    /// The job being delivered.
    pub job_id: Uuid,
    /// The device targeted.
    pub subscription_id: Uuid,
    /// Whether the push service accepted the message.
    pub success: bool,
    /// Status code reported by the transport, if any.
    pub status_code: Option<i32>,
    /// Failure detail.
    pub error_message: Option<String>,
    /// When the attempt was recorded.
    pub created_at: DateTime<Utc>,
}

/// Data required to append a delivery log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeliveryLog {
    /// The job being delivered.
    pub job_id: Uuid,
    /// The device targeted.
    pub subscription_id: Uuid,
    /// Whether the push service accepted the message.
    pub success: bool,
    /// Status code reported by the transport, if any.
    pub status_code: Option<i32>,
    /// Failure detail.
    pub error_message: Option<String>,
}

impl NewDeliveryLog {
    /// A successful attempt.
    pub fn success(job_id: Uuid, subscription_id: Uuid) -> Self {
        Self {
            job_id,
            subscription_id,
            success: true,
            status_code: None,
            error_message: None,
        }
    }

    /// A failed attempt.
    pub fn failure(
        job_id: Uuid,
        subscription_id: Uuid,
        status_code: Option<u16>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            subscription_id,
            success: false,
            status_code: status_code.map(i32::from),
            error_message: Some(error_message.into()),
        }
    }
}
