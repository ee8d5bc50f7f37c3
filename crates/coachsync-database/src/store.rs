//! Store traits the delivery engine is written against.
//!
//! Each trait is implemented by a sqlx repository in
//! [`crate::repositories`]. The planner, the notification worker and the
//! outbox dispatcher only ever see these traits, so they can run against
//! in-memory doubles in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use coachsync_core::result::AppResult;
use coachsync_core::traits::{PushTarget, UpstreamRecord};
use coachsync_entity::delivery::NewDeliveryLog;
use coachsync_entity::notification::{
    JobCandidate, NotificationJob, NotificationJobStatus, NotificationPreference,
    PreferenceUpdate,
};
use coachsync_entity::outbox::{OutboxEntry, OutboxStatus};
use coachsync_entity::schedule::{SchedulableSession, ScheduledPersonalGoal};
use coachsync_entity::subscription::PushSubscription;
use coachsync_entity::user::UpstreamUser;

/// Durable queue of local mutations bound for the upstream system of record.
#[async_trait]
pub trait OutboxStore: Send + Sync + std::fmt::Debug {
    /// Lock-and-skip up to `limit` due pending entries ordered by
    /// `(priority, id)`, flip them to `processing` and bump their attempt
    /// count. Returns post-increment rows.
    async fn claim_batch(&self, limit: i64) -> AppResult<Vec<OutboxEntry>>;

    /// The entry was applied upstream.
    async fn mark_processed(&self, id: i64) -> AppResult<()>;

    /// Put the entry back to `pending` after `delay_seconds`.
    async fn mark_retry(&self, id: i64, delay_seconds: i64, error: &str) -> AppResult<()>;

    /// Flip the entry to `dead_letter` and write its snapshot in the same
    /// transaction.
    async fn mark_dead_letter(&self, entry: &OutboxEntry, error: &str) -> AppResult<()>;

    /// Number of entries in `status`.
    async fn count_by_status(&self, status: OutboxStatus) -> AppResult<i64>;
}

/// Per-user notification settings.
#[async_trait]
pub trait PreferenceStore: Send + Sync + std::fmt::Debug {
    /// Resolved preferences, or `None` if the user does not exist.
    async fn get(&self, user_id: Uuid) -> AppResult<Option<NotificationPreference>>;

    /// Merge `update` onto the current values and persist.
    async fn upsert(
        &self,
        user_id: Uuid,
        update: &PreferenceUpdate,
    ) -> AppResult<NotificationPreference>;
}

/// Durable queue of reminder jobs.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug {
    /// Insert or update by dedupe key. Rows already `sent` are left
    /// untouched. Returns the number of rows written.
    async fn upsert_many(&self, candidates: &[JobCandidate]) -> AppResult<u64>;

    /// Cancel every pending, processing or quiet-hours-skipped job of a user.
    async fn cancel_all_for_user(&self, user_id: Uuid) -> AppResult<u64>;

    /// Same as [`JobStore::cancel_all_for_user`], restricted to dedupe keys
    /// not in `keep_keys`.
    async fn cancel_not_in_set(&self, user_id: Uuid, keep_keys: &[String]) -> AppResult<u64>;

    /// Lock-and-skip up to `limit` due pending jobs ordered by
    /// `(fire_at, id)`, flip them to `processing` and bump their attempt
    /// count. Returns post-increment rows in claim order.
    async fn claim_due(&self, limit: i64) -> AppResult<Vec<NotificationJob>>;

    /// Delivered to at least one device.
    async fn mark_sent(&self, id: Uuid) -> AppResult<()>;

    /// Suppressed by quiet hours at delivery time.
    async fn mark_skipped_quiet_hours(&self, id: Uuid) -> AppResult<()>;

    /// Given up for good.
    async fn mark_dead_letter(&self, id: Uuid, error: &str) -> AppResult<()>;

    /// Back to `pending`, due again after `delay_seconds`.
    async fn mark_retry(&self, id: Uuid, delay_seconds: i64, error: &str) -> AppResult<()>;

    /// Number of jobs in `status`.
    async fn count_by_status(&self, status: NotificationJobStatus) -> AppResult<i64>;
}

/// Push endpoints per user with delivery bookkeeping.
#[async_trait]
pub trait SubscriptionStore: Send + Sync + std::fmt::Debug {
    /// Register (or re-register) a device endpoint.
    async fn register(&self, user_id: Uuid, target: &PushTarget) -> AppResult<PushSubscription>;

    /// Subscriptions still worth delivering to (not expired).
    async fn list_active(&self, user_id: Uuid) -> AppResult<Vec<PushSubscription>>;

    /// A delivery succeeded.
    async fn mark_success(&self, id: Uuid) -> AppResult<()>;

    /// A delivery failed softly.
    async fn mark_error(&self, id: Uuid, error: &str) -> AppResult<()>;

    /// The push service reported the endpoint gone.
    async fn mark_expired(&self, id: Uuid, error: &str) -> AppResult<()>;
}

/// Append-only delivery audit trail.
#[async_trait]
pub trait DeliveryLogStore: Send + Sync + std::fmt::Debug {
    /// Append one attempt.
    async fn append(&self, entry: &NewDeliveryLog) -> AppResult<()>;
}

/// Read-only schedule views.
#[async_trait]
pub trait ScheduleSource: Send + Sync + std::fmt::Debug {
    /// Sessions of the user's programs dated on or after `from`.
    async fn list_schedulable_sessions_for_user(
        &self,
        user_id: Uuid,
        from: NaiveDate,
    ) -> AppResult<Vec<SchedulableSession>>;

    /// Active personal goals with a recurring weekday schedule.
    async fn list_scheduled_personal_goals_for_user(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<ScheduledPersonalGoal>>;
}

/// Read-only user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug {
    /// Stored language code of a user.
    async fn get_user_language_code(&self, user_id: Uuid) -> AppResult<Option<String>>;

    /// Users with an active or planned program, plus users with
    /// notifications explicitly enabled.
    async fn list_users_for_notification_planning(&self) -> AppResult<Vec<Uuid>>;
}

/// Local cache of upstream records.
#[async_trait]
pub trait MirrorStore: Send + Sync + std::fmt::Debug {
    /// Upsert raw records of one table. Returns the number written.
    async fn upsert_records(&self, table: &str, records: &[UpstreamRecord]) -> AppResult<u64>;

    /// Upsert users by upstream record id / email. Returns the number written.
    async fn upsert_users(&self, users: &[UpstreamUser]) -> AppResult<u64>;
}
