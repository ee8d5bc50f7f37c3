//! Push subscription status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health of a registered push endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "push_subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Last delivery succeeded (or none attempted yet).
    Active,
    /// Last delivery failed softly; still used.
    Error,
    /// The push service reported the endpoint gone; never used again.
    Expired,
}

impl SubscriptionStatus {
    /// Whether deliveries should still be attempted.
    pub fn is_deliverable(&self) -> bool {
        !matches!(self, Self::Expired)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Error => "error",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
