//! Notification job repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use coachsync_core::error::{AppError, ErrorKind};
use coachsync_core::result::AppResult;
use coachsync_entity::notification::{JobCandidate, NotificationJob, NotificationJobStatus};

use crate::store::JobStore;

/// Repository for the `notification_jobs` queue table.
#[derive(Debug, Clone)]
pub struct NotificationJobRepository {
    pool: PgPool,
}

impl NotificationJobRepository {
    /// Create a new notification job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a job by dedupe key.
    pub async fn find_by_dedupe_key(&self, dedupe_key: &str) -> AppResult<Option<NotificationJob>> {
        sqlx::query_as::<_, NotificationJob>("SELECT * FROM notification_jobs WHERE dedupe_key = $1")
            .bind(dedupe_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }
}

#[async_trait]
impl JobStore for NotificationJobRepository {
    async fn upsert_many(&self, candidates: &[JobCandidate]) -> AppResult<u64> {
        if candidates.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin job upsert", e)
        })?;

        let mut written = 0;
        for candidate in candidates {
            // Sent rows are history: the WHERE clause skips them entirely.
            // Identical rows are skipped too so re-planning is a no-op.
            let result = sqlx::query(
                "INSERT INTO notification_jobs (user_id, program_id, program_schedule_id, personal_goal_id, \
                    reminder_date, mode, fire_at, payload, dedupe_key, status, attempt_count, next_attempt_at, \
                    processed_at, last_error) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, $11, $12, NULL) \
                 ON CONFLICT (dedupe_key) DO UPDATE SET \
                    user_id = EXCLUDED.user_id, \
                    program_id = EXCLUDED.program_id, \
                    program_schedule_id = EXCLUDED.program_schedule_id, \
                    personal_goal_id = EXCLUDED.personal_goal_id, \
                    reminder_date = EXCLUDED.reminder_date, \
                    mode = EXCLUDED.mode, \
                    fire_at = EXCLUDED.fire_at, \
                    payload = EXCLUDED.payload, \
                    status = EXCLUDED.status, \
                    attempt_count = EXCLUDED.attempt_count, \
                    next_attempt_at = EXCLUDED.next_attempt_at, \
                    processed_at = CASE \
                        WHEN notification_jobs.status = EXCLUDED.status \
                             AND notification_jobs.processed_at IS NOT NULL \
                        THEN notification_jobs.processed_at \
                        ELSE EXCLUDED.processed_at END, \
                    last_error = NULL, \
                    updated_at = NOW() \
                 WHERE notification_jobs.status <> 'sent' \
                   AND (notification_jobs.user_id, notification_jobs.program_id, \
                        notification_jobs.program_schedule_id, notification_jobs.personal_goal_id, \
                        notification_jobs.reminder_date, notification_jobs.mode, notification_jobs.fire_at, \
                        notification_jobs.payload, notification_jobs.status, notification_jobs.attempt_count, \
                        notification_jobs.next_attempt_at, notification_jobs.last_error) \
                   IS DISTINCT FROM \
                       (EXCLUDED.user_id, EXCLUDED.program_id, EXCLUDED.program_schedule_id, \
                        EXCLUDED.personal_goal_id, EXCLUDED.reminder_date, EXCLUDED.mode, EXCLUDED.fire_at, \
                        EXCLUDED.payload, EXCLUDED.status, EXCLUDED.attempt_count, \
                        EXCLUDED.next_attempt_at, EXCLUDED.last_error)",
            )
            .bind(candidate.user_id)
            .bind(candidate.program_id)
            .bind(candidate.program_schedule_id)
            .bind(candidate.personal_goal_id)
            .bind(candidate.reminder_date)
            .bind(candidate.mode)
            .bind(candidate.fire_at)
            .bind(&candidate.payload)
            .bind(&candidate.dedupe_key)
            .bind(candidate.status)
            .bind(candidate.next_attempt_at())
            .bind(candidate.processed_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert job", e))?;

            written += result.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit job upsert", e)
        })?;

        Ok(written)
    }

    async fn cancel_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        self.cancel_not_in_set(user_id, &[]).await
    }

    async fn cancel_not_in_set(&self, user_id: Uuid, keep_keys: &[String]) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notification_jobs SET status = 'cancelled', updated_at = NOW() \
             WHERE user_id = $1 \
               AND status IN ('pending', 'processing', 'skipped_quiet_hours') \
               AND NOT (dedupe_key = ANY($2))",
        )
        .bind(user_id)
        .bind(keep_keys)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to cancel jobs", e))?;
        Ok(result.rows_affected())
    }

    async fn claim_due(&self, limit: i64) -> AppResult<Vec<NotificationJob>> {
        // One statement: the row locks taken by the subquery and the flip to
        // `processing` commit together. Rows locked by another claimer are
        // skipped rather than waited on.
        let mut jobs = sqlx::query_as::<_, NotificationJob>(
            "UPDATE notification_jobs AS j \
             SET status = 'processing', attempt_count = j.attempt_count + 1, updated_at = NOW() \
             FROM ( \
                SELECT id FROM notification_jobs \
                WHERE status = 'pending' AND next_attempt_at <= NOW() AND fire_at <= NOW() \
                ORDER BY fire_at, id \
                LIMIT $1 \
                FOR UPDATE SKIP LOCKED \
             ) AS due \
             WHERE j.id = due.id \
             RETURNING j.*",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim due jobs", e))?;

        jobs.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn mark_sent(&self, id: Uuid) -> AppResult<()> {
        // No status guard: a push that reached a device overrides a concurrent cancel.
        sqlx::query(
            "UPDATE notification_jobs SET status = 'sent', processed_at = NOW(), last_error = NULL, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark job sent", e))?;
        Ok(())
    }

    async fn mark_skipped_quiet_hours(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE notification_jobs SET status = 'skipped_quiet_hours', processed_at = NOW(), \
             last_error = NULL, updated_at = NOW() WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark job skipped", e))?;
        Ok(())
    }

    async fn mark_dead_letter(&self, id: Uuid, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE notification_jobs SET status = 'dead_letter', processed_at = NOW(), last_error = $2, \
             updated_at = NOW() WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to dead-letter job", e)
        })?;
        Ok(())
    }

    async fn mark_retry(&self, id: Uuid, delay_seconds: i64, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE notification_jobs SET status = 'pending', \
             next_attempt_at = NOW() + make_interval(secs => $2), last_error = $3, updated_at = NOW() \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(delay_seconds as f64)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to schedule retry", e))?;
        Ok(())
    }

    async fn count_by_status(&self, status: NotificationJobStatus) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notification_jobs WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))
    }
}
