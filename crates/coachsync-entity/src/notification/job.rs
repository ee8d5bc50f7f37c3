//! Notification job entity model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{NotificationJobStatus, NotificationMode};

/// A planned reminder for one user and one occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationJob {
    /// Unique job identifier.
    pub id: Uuid,
    /// Recipient.
    pub user_id: Uuid,
    /// Program the reminder belongs to.
    pub program_id: Option<Uuid>,
    /// Scheduled session the reminder belongs to.
    pub program_schedule_id: Option<Uuid>,
    /// Personal goal the reminder belongs to.
    pub personal_goal_id: Option<Uuid>,
    /// Local calendar date of the occurrence.
    pub reminder_date: NaiveDate,
    /// What the reminder is about.
    pub mode: NotificationMode,
    /// When the reminder should go out.
    pub fire_at: DateTime<Utc>,
    /// Localized push payload.
    pub payload: serde_json::Value,
    /// Stable identity of the occurrence across planning runs.
    pub dedupe_key: String,
    /// Current status.
    pub status: NotificationJobStatus,
    /// Delivery attempts so far, including the one in flight.
    pub attempt_count: i32,
    /// Earliest time of the next attempt.
    pub next_attempt_at: DateTime<Utc>,
    /// When the job reached a terminal delivery state.
    pub processed_at: Option<DateTime<Utc>>,
    /// Error of the most recent failed attempt.
    pub last_error: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A job the planner wants to exist.
///
/// `status` is either `Pending` or `SkippedQuietHours`; in the latter case
/// `processed_at` carries the planning time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCandidate {
    /// Recipient.
    pub user_id: Uuid,
    /// Program the reminder belongs to.
    pub program_id: Option<Uuid>,
    /// Scheduled session the reminder belongs to.
    pub program_schedule_id: Option<Uuid>,
    /// Personal goal the reminder belongs to.
    pub personal_goal_id: Option<Uuid>,
    /// Local calendar date of the occurrence.
    pub reminder_date: NaiveDate,
    /// What the reminder is about.
    pub mode: NotificationMode,
    /// When the reminder should go out.
    pub fire_at: DateTime<Utc>,
    /// Localized push payload.
    pub payload: serde_json::Value,
    /// Stable identity of the occurrence.
    pub dedupe_key: String,
    /// Initial status.
    pub status: NotificationJobStatus,
    /// Set when the candidate is born terminal.
    pub processed_at: Option<DateTime<Utc>>,
}

impl JobCandidate {
    /// First attempt time for a fresh row.
    pub fn next_attempt_at(&self) -> DateTime<Utc> {
        self.fire_at
    }
}
