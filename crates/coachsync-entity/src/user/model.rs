//! User records mirrored from the upstream system of record.

use serde::{Deserialize, Serialize};

/// The user fields the engine cares about, as read from upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamUser {
    /// Upstream record identifier.
    pub record_id: String,
    /// Login email, used to match local users.
    pub email: String,
    /// Preferred language code (e.g. `"nl-BE"`).
    pub language_code: Option<String>,
}

impl UpstreamUser {
    /// Extract a user from raw upstream fields. Records without an email
    /// are ignored.
    pub fn from_fields(record_id: &str, fields: &serde_json::Value) -> Option<Self> {
        let text = |key: &str| {
            fields
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            record_id: record_id.to_string(),
            email: text("email")?.to_ascii_lowercase(),
            language_code: text("language_code").or_else(|| text("language")),
        })
    }
}
