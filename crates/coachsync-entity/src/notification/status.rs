//! Notification job status and mode enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a reminder job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationJobStatus {
    /// Waiting for `fire_at` / `next_attempt_at`.
    Pending,
    /// Claimed by a worker.
    Processing,
    /// Delivered to at least one device.
    Sent,
    /// Fell inside the user's quiet hours.
    SkippedQuietHours,
    /// Gave up after a permanent failure or exhausted retries.
    DeadLetter,
    /// Retired by the planner.
    Cancelled,
}

impl NotificationJobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Sent | Self::SkippedQuietHours | Self::DeadLetter | Self::Cancelled
        )
    }

    /// Statuses the planner may move to `cancelled`.
    pub fn cancellable() -> [Self; 3] {
        [Self::Pending, Self::Processing, Self::SkippedQuietHours]
    }

    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::SkippedQuietHours => "skipped_quiet_hours",
            Self::DeadLetter => "dead_letter",
            Self::Cancelled => "cancelled",
        }
    }

    /// All statuses.
    pub fn all() -> [Self; 6] {
        [
            Self::Pending,
            Self::Processing,
            Self::Sent,
            Self::SkippedQuietHours,
            Self::DeadLetter,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for NotificationJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a reminder job is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationMode {
    /// One scheduled training session.
    Session,
    /// All sessions of one day.
    DailySummary,
    /// A recurring personal goal.
    PersonalGoal,
}

impl NotificationMode {
    /// Return the mode as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::DailySummary => "daily_summary",
            Self::PersonalGoal => "personal_goal",
        }
    }
}

impl fmt::Display for NotificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sent_is_never_cancellable() {
        assert!(!NotificationJobStatus::cancellable().contains(&NotificationJobStatus::Sent));
        assert!(NotificationJobStatus::Sent.is_terminal());
        assert!(!NotificationJobStatus::Pending.is_terminal());
        assert!(!NotificationJobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&NotificationJobStatus::SkippedQuietHours).unwrap();
        assert_eq!(json, "\"skipped_quiet_hours\"");
        let json = serde_json::to_string(&NotificationMode::DailySummary).unwrap();
        assert_eq!(json, "\"daily_summary\"");
    }
}
