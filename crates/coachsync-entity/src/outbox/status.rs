//! Outbox entry status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of an outbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "outbox_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    /// Waiting for its next attempt.
    Pending,
    /// Claimed by a dispatcher.
    Processing,
    /// Applied upstream.
    Processed,
    /// Gave up; a snapshot lives in `sync_dead_letters`.
    DeadLetter,
}

impl OutboxStatus {
    /// Check if the entry is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::DeadLetter)
    }

    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::DeadLetter => "dead_letter",
        }
    }

    /// All statuses, in lifecycle order.
    pub fn all() -> [Self; 4] {
        [
            Self::Pending,
            Self::Processing,
            Self::Processed,
            Self::DeadLetter,
        ]
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
