//! Reminder planning and delivery configuration.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Notification planner and worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Attempts before a job is dead-lettered.
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    /// Base of the quadratic backoff, in seconds.
    #[serde(default = "default_retry_base")]
    pub retry_base_seconds: i64,
    /// IANA zone used when a user's stored timezone is missing or invalid.
    /// An unknown name fails configuration loading.
    #[serde(default = "default_timezone")]
    pub default_timezone: Tz,
    /// Days of recurring personal-goal reminders planned ahead.
    #[serde(default = "default_goal_horizon")]
    pub goal_horizon_days: i64,
    /// Prefix for target URLs placed in push payloads.
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_seconds: default_retry_base(),
            default_timezone: default_timezone(),
            goal_horizon_days: default_goal_horizon(),
            app_base_url: default_app_base_url(),
        }
    }
}

fn default_max_retries() -> i32 {
    5
}

fn default_retry_base() -> i64 {
    60
}

fn default_timezone() -> Tz {
    chrono_tz::Europe::Brussels
}

fn default_goal_horizon() -> i64 {
    14
}

fn default_app_base_url() -> String {
    "/".to_string()
}
