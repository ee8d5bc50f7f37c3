//! Push subscription entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use coachsync_core::traits::PushTarget;

use super::status::SubscriptionStatus;

/// A browser push endpoint registered by one of a user's devices.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PushSubscription {
    /// Unique subscription identifier.
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    /// Push service endpoint URL (unique).
    pub endpoint: String,
    /// Client public key.
    pub p256dh: String,
    /// Client auth secret.
    pub auth: String,
    /// Current health.
    pub status: SubscriptionStatus,
    /// Consecutive failed deliveries.
    pub failure_count: i32,
    /// Last successful delivery.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Last delivery error.
    pub last_error: Option<String>,
    /// When the device registered.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl PushSubscription {
    /// Addressing information for the push transport.
    pub fn target(&self) -> PushTarget {
        PushTarget {
            endpoint: self.endpoint.clone(),
            p256dh: self.p256dh.clone(),
            auth: self.auth.clone(),
        }
    }
}
