//! Upstream system-of-record configuration.

use serde::{Deserialize, Serialize};

/// Airtable-style REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// API root, without the base id.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Base identifier appended to `base_url`.
    #[serde(default)]
    pub base_id: Option<String>,
    /// Personal access token.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Field holding the local entity id, used to merge upserts.
    #[serde(default = "default_merge_field")]
    pub merge_field: String,
    /// Table holding user records.
    #[serde(default = "default_users_table")]
    pub users_table: String,
    /// Tables mirrored on every full resync.
    #[serde(default = "default_resync_tables")]
    pub resync_tables: Vec<String>,
    /// HTTP timeout for one request, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl UpstreamConfig {
    /// Whether a base id and token are present.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.base_id) && present(&self.api_token)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            base_id: None,
            api_token: None,
            merge_field: default_merge_field(),
            users_table: default_users_table(),
            resync_tables: default_resync_tables(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.airtable.com/v0".to_string()
}

fn default_merge_field() -> String {
    "local_id".to_string()
}

fn default_users_table() -> String {
    "users".to_string()
}

fn default_resync_tables() -> Vec<String> {
    vec![
        "programs".to_string(),
        "program_schedules".to_string(),
        "personal_goals".to_string(),
    ]
}

fn default_timeout() -> u64 {
    15
}
