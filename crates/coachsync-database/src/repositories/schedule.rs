//! Read-only schedule queries used by the reminder planner.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use coachsync_core::error::{AppError, ErrorKind};
use coachsync_core::result::AppResult;
use coachsync_entity::schedule::{PersonalGoalRow, SchedulableSession, ScheduledPersonalGoal};

use crate::store::ScheduleSource;

/// Repository over `program_schedules` and `personal_goals`.
#[derive(Debug, Clone)]
pub struct ScheduleRepository {
    pool: PgPool,
}

impl ScheduleRepository {
    /// Create a new schedule repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleSource for ScheduleRepository {
    async fn list_schedulable_sessions_for_user(
        &self,
        user_id: Uuid,
        from: NaiveDate,
    ) -> AppResult<Vec<SchedulableSession>> {
        sqlx::query_as::<_, SchedulableSession>(
            "SELECT s.program_id, s.id AS schedule_id, s.session_date, s.planned_count, s.completed_count \
             FROM program_schedules s \
             JOIN programs p ON p.id = s.program_id \
             WHERE p.user_id = $1 \
               AND p.status IN ('active', 'planned') \
               AND s.session_date >= $2 \
               AND s.planned_count > 0 \
               AND s.completed_count < s.planned_count \
             ORDER BY s.session_date, s.id",
        )
        .bind(user_id)
        .bind(from)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list sessions", e))
    }

    async fn list_scheduled_personal_goals_for_user(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<ScheduledPersonalGoal>> {
        let rows = sqlx::query_as::<_, PersonalGoalRow>(
            "SELECT id, name, schedule_days FROM personal_goals \
             WHERE user_id = $1 AND is_active AND cardinality(schedule_days) > 0 \
             ORDER BY name, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list personal goals", e))?;

        Ok(rows.into_iter().map(ScheduledPersonalGoal::from).collect())
    }
}
