//! Sync outbox configuration.

use serde::{Deserialize, Serialize};

/// Retry budget for propagating outbox entries upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Attempts before an entry is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    /// Base of the quadratic backoff, in seconds.
    #[serde(default = "default_retry_base")]
    pub retry_base_seconds: i64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_base_seconds: default_retry_base(),
        }
    }
}

fn default_max_attempts() -> i32 {
    8
}

fn default_retry_base() -> i64 {
    30
}
