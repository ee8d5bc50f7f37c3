//! Outbox entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use coachsync_core::traits::UpstreamEvent;

use super::status::OutboxStatus;

/// A local mutation waiting to be propagated to the upstream system of record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutboxEntry {
    /// Sequential identifier; ties in priority are broken by it.
    pub id: i64,
    /// `"create"`, `"update"` or `"delete"`.
    pub event_type: String,
    /// Upstream table name.
    pub entity_type: String,
    /// Local identifier of the mutated entity.
    pub entity_id: String,
    /// Field values to write upstream.
    pub payload: serde_json::Value,
    /// Current status.
    pub status: OutboxStatus,
    /// Lower values are dispatched first.
    pub priority: i32,
    /// Attempts made so far, including the one in flight.
    pub attempt_count: i32,
    /// Earliest time of the next attempt.
    pub next_attempt_at: DateTime<Utc>,
    /// Error of the most recent failed attempt.
    pub last_error: Option<String>,
    /// When the entry reached `processed`.
    pub processed_at: Option<DateTime<Utc>>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
    /// When the entry was last updated.
    pub updated_at: DateTime<Utc>,
}

impl OutboxEntry {
    /// The upstream call this entry stands for.
    pub fn to_upstream_event(&self) -> UpstreamEvent {
        UpstreamEvent {
            event_type: self.event_type.clone(),
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id.clone(),
            payload: self.payload.clone(),
        }
    }
}

/// Data required to append an outbox entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOutboxEntry {
    /// Event type.
    pub event_type: String,
    /// Upstream table name.
    pub entity_type: String,
    /// Local identifier of the mutated entity.
    pub entity_id: String,
    /// Field values.
    pub payload: serde_json::Value,
    /// Dispatch priority (lower first).
    pub priority: i32,
}
