//! Notification preference entity.
//!
//! Preferences are stored loosely (text columns, nullable everywhere) and
//! resolved into a fully populated [`NotificationPreference`] by a single
//! pure function, [`NotificationPreference::resolve`]. Every field falls back
//! to its default independently.

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use coachsync_core::time::{parse_local_time, resolve_time_zone};

/// Largest accepted lead time, in minutes.
pub const MAX_LEAD_MINUTES: i32 = 7 * 24 * 60;

/// Which reminders a user wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderMode {
    /// One reminder per session.
    #[default]
    Session,
    /// One reminder per day with sessions.
    DailySummary,
    /// Both of the above.
    Both,
}

impl ReminderMode {
    /// Parse a stored value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "session" => Some(Self::Session),
            "daily_summary" => Some(Self::DailySummary),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    /// Return the mode as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::DailySummary => "daily_summary",
            Self::Both => "both",
        }
    }

    /// Whether per-session reminders are wanted.
    pub fn includes_sessions(&self) -> bool {
        matches!(self, Self::Session | Self::Both)
    }

    /// Whether daily summaries are wanted.
    pub fn includes_daily_summary(&self) -> bool {
        matches!(self, Self::DailySummary | Self::Both)
    }
}

/// A `notification_preferences` row as stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct RawPreference {
    /// Master switch.
    pub enabled: Option<bool>,
    /// `session`, `daily_summary` or `both`.
    pub reminder_mode: Option<String>,
    /// Minutes before the preferred time.
    pub lead_minutes: Option<i32>,
    /// `"HH:MM"`.
    pub preferred_time_local: Option<String>,
    /// IANA zone name.
    pub timezone: Option<String>,
    /// `"HH:MM"`.
    pub quiet_hours_start: Option<String>,
    /// `"HH:MM"`.
    pub quiet_hours_end: Option<String>,
}

/// Fully resolved per-user notification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreference {
    /// The user these preferences belong to.
    pub user_id: Uuid,
    /// Master switch.
    pub enabled: bool,
    /// Which reminders to plan.
    pub reminder_mode: ReminderMode,
    /// Minutes before the preferred time a reminder fires.
    pub lead_minutes: i32,
    /// Local time reminders are anchored on.
    pub preferred_time_local: NaiveTime,
    /// User's timezone.
    pub timezone: Tz,
    /// Start of the quiet window (inclusive).
    pub quiet_hours_start: NaiveTime,
    /// End of the quiet window (exclusive).
    pub quiet_hours_end: NaiveTime,
}

impl NotificationPreference {
    /// Default lead time.
    pub const DEFAULT_LEAD_MINUTES: i32 = 60;

    /// Defaults for a user without a stored row.
    pub fn default_for_user(user_id: Uuid, default_timezone: Tz) -> Self {
        Self::resolve(user_id, None, default_timezone)
    }

    /// Resolve a stored row (or its absence) field by field.
    pub fn resolve(user_id: Uuid, raw: Option<&RawPreference>, default_timezone: Tz) -> Self {
        let raw = raw.cloned().unwrap_or_default();

        Self {
            user_id,
            enabled: raw.enabled.unwrap_or(true),
            reminder_mode: raw
                .reminder_mode
                .as_deref()
                .and_then(ReminderMode::parse)
                .unwrap_or_default(),
            lead_minutes: raw
                .lead_minutes
                .filter(|m| (0..=MAX_LEAD_MINUTES).contains(m))
                .unwrap_or(Self::DEFAULT_LEAD_MINUTES),
            preferred_time_local: time_or(raw.preferred_time_local.as_deref(), 19, 0),
            timezone: resolve_time_zone(raw.timezone.as_deref(), default_timezone),
            quiet_hours_start: time_or(raw.quiet_hours_start.as_deref(), 22, 0),
            quiet_hours_end: time_or(raw.quiet_hours_end.as_deref(), 7, 0),
        }
    }

    /// Apply a partial update.
    pub fn merge(&self, update: &PreferenceUpdate) -> Self {
        Self {
            user_id: self.user_id,
            enabled: update.enabled.unwrap_or(self.enabled),
            reminder_mode: update.reminder_mode.unwrap_or(self.reminder_mode),
            lead_minutes: update
                .lead_minutes
                .filter(|m| (0..=MAX_LEAD_MINUTES).contains(m))
                .unwrap_or(self.lead_minutes),
            preferred_time_local: update.preferred_time_local.unwrap_or(self.preferred_time_local),
            timezone: update.timezone.unwrap_or(self.timezone),
            quiet_hours_start: update.quiet_hours_start.unwrap_or(self.quiet_hours_start),
            quiet_hours_end: update.quiet_hours_end.unwrap_or(self.quiet_hours_end),
        }
    }

    /// Storage representation.
    pub fn to_raw(&self) -> RawPreference {
        RawPreference {
            enabled: Some(self.enabled),
            reminder_mode: Some(self.reminder_mode.as_str().to_string()),
            lead_minutes: Some(self.lead_minutes),
            preferred_time_local: Some(self.preferred_time_local.format("%H:%M").to_string()),
            timezone: Some(self.timezone.name().to_string()),
            quiet_hours_start: Some(self.quiet_hours_start.format("%H:%M").to_string()),
            quiet_hours_end: Some(self.quiet_hours_end.format("%H:%M").to_string()),
        }
    }
}

/// A partial settings update from the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceUpdate {
    /// Master switch.
    pub enabled: Option<bool>,
    /// Reminder mode.
    pub reminder_mode: Option<ReminderMode>,
    /// Lead minutes.
    pub lead_minutes: Option<i32>,
    /// Preferred local time.
    pub preferred_time_local: Option<NaiveTime>,
    /// Timezone.
    pub timezone: Option<Tz>,
    /// Quiet window start.
    pub quiet_hours_start: Option<NaiveTime>,
    /// Quiet window end.
    pub quiet_hours_end: Option<NaiveTime>,
}

fn time_or(value: Option<&str>, hour: u32, minute: u32) -> NaiveTime {
    value
        .and_then(parse_local_time)
        .or_else(|| NaiveTime::from_hms_opt(hour, minute, 0))
        .unwrap_or(NaiveTime::MIN)
}
