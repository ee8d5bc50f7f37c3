//! Notification preference repository implementation.

use async_trait::async_trait;
use chrono_tz::Tz;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use coachsync_core::error::{AppError, ErrorKind};
use coachsync_core::result::AppResult;
use coachsync_entity::notification::{NotificationPreference, PreferenceUpdate, RawPreference};

use crate::store::PreferenceStore;

#[derive(Debug, FromRow)]
struct PreferenceRow {
    user_id: Uuid,
    #[sqlx(flatten)]
    raw: RawPreference,
}

/// Repository for `notification_preferences`.
#[derive(Debug, Clone)]
pub struct PreferenceRepository {
    pool: PgPool,
    /// Zone used when a stored timezone is missing or invalid.
    default_timezone: Tz,
}

impl PreferenceRepository {
    /// Create a new preference repository.
    pub fn new(pool: PgPool, default_timezone: Tz) -> Self {
        Self {
            pool,
            default_timezone,
        }
    }
}

#[async_trait]
impl PreferenceStore for PreferenceRepository {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<NotificationPreference>> {
        // LEFT JOIN: an existing user without a row gets field defaults.
        let row = sqlx::query_as::<_, PreferenceRow>(
            "SELECT u.id AS user_id, p.enabled, p.reminder_mode, p.lead_minutes, \
                    p.preferred_time_local, p.timezone, p.quiet_hours_start, p.quiet_hours_end \
             FROM users u \
             LEFT JOIN notification_preferences p ON p.user_id = u.id \
             WHERE u.id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to get preferences", e))?;

        Ok(row.map(|row| {
            NotificationPreference::resolve(row.user_id, Some(&row.raw), self.default_timezone)
        }))
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        update: &PreferenceUpdate,
    ) -> AppResult<NotificationPreference> {
        let current = self
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;
        let merged = current.merge(update);
        let raw = merged.to_raw();

        sqlx::query(
            "INSERT INTO notification_preferences (user_id, enabled, reminder_mode, lead_minutes, \
                preferred_time_local, timezone, quiet_hours_start, quiet_hours_end, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW()) \
             ON CONFLICT (user_id) DO UPDATE SET \
                enabled = EXCLUDED.enabled, \
                reminder_mode = EXCLUDED.reminder_mode, \
                lead_minutes = EXCLUDED.lead_minutes, \
                preferred_time_local = EXCLUDED.preferred_time_local, \
                timezone = EXCLUDED.timezone, \
                quiet_hours_start = EXCLUDED.quiet_hours_start, \
                quiet_hours_end = EXCLUDED.quiet_hours_end, \
                updated_at = NOW()",
        )
        .bind(user_id)
        .bind(raw.enabled)
        .bind(&raw.reminder_mode)
        .bind(raw.lead_minutes)
        .bind(&raw.preferred_time_local)
        .bind(&raw.timezone)
        .bind(&raw.quiet_hours_start)
        .bind(&raw.quiet_hours_end)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save preferences", e))?;

        tracing::debug!(%user_id, enabled = merged.enabled, "Notification preferences saved");
        Ok(merged)
    }
}
