//! Worker loop configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Worker loop cadence and batch sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Sleep between ticks when both pipelines were idle, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Outbox entries claimed per tick.
    #[serde(default = "default_outbox_batch")]
    pub outbox_batch_size: i64,
    /// Notification jobs claimed per tick.
    #[serde(default = "default_notification_batch")]
    pub notification_batch_size: i64,
    /// Jobs of one batch delivered concurrently.
    #[serde(default = "default_concurrency")]
    pub delivery_concurrency: usize,
    /// Interval between full resyncs from the upstream system of record.
    #[serde(default = "default_full_resync")]
    pub full_resync_interval_seconds: u64,
    /// Interval between fallback polls of upstream user records.
    #[serde(default = "default_user_poll")]
    pub user_poll_interval_seconds: u64,
    /// Interval between reminder planning passes over all users.
    #[serde(default = "default_planning")]
    pub planning_interval_seconds: u64,
    /// Whether `run` applies pending migrations before starting.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl WorkerConfig {
    /// Idle sleep as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            outbox_batch_size: default_outbox_batch(),
            notification_batch_size: default_notification_batch(),
            delivery_concurrency: default_concurrency(),
            full_resync_interval_seconds: default_full_resync(),
            user_poll_interval_seconds: default_user_poll(),
            planning_interval_seconds: default_planning(),
            run_migrations: default_true(),
        }
    }
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_outbox_batch() -> i64 {
    25
}

fn default_notification_batch() -> i64 {
    50
}

fn default_concurrency() -> usize {
    8
}

fn default_full_resync() -> u64 {
    6 * 60 * 60
}

fn default_user_poll() -> u64 {
    5 * 60
}

fn default_planning() -> u64 {
    15 * 60
}

fn default_true() -> bool {
    true
}
