//! Dead-letter snapshot of an outbox entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Immutable copy of an outbox entry taken when it was dead-lettered.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeadLetterEntry {
    /// Snapshot identifier.
    pub id: i64,
    /// The outbox entry this snapshot belongs to (unique).
    pub outbox_id: i64,
    /// Event type.
    pub event_type: String,
    /// Upstream table name.
    pub entity_type: String,
    /// Local identifier of the mutated entity.
    pub entity_id: String,
    /// Payload at the time of failure.
    pub payload: serde_json::Value,
    /// Final error.
    pub error_message: String,
    /// When the snapshot was written.
    pub inserted_at: DateTime<Utc>,
}
