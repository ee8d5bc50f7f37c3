//! Sync outbox repository implementation.

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};

use coachsync_core::error::{AppError, ErrorKind};
use coachsync_core::result::AppResult;
use coachsync_entity::outbox::{DeadLetterEntry, NewOutboxEntry, OutboxEntry, OutboxStatus};

use crate::store::OutboxStore;

/// Repository for `sync_outbox` and its `sync_dead_letters` snapshots.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: PgPool,
}

impl OutboxRepository {
    /// Create a new outbox repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry using any executor, typically the transaction that
    /// performs the local mutation the entry describes.
    pub async fn enqueue<'e, E>(executor: E, entry: &NewOutboxEntry) -> AppResult<OutboxEntry>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, OutboxEntry>(
            "INSERT INTO sync_outbox (event_type, entity_type, entity_id, payload, priority) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&entry.event_type)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.payload)
        .bind(entry.priority)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to enqueue outbox entry", e))
    }

    /// Find an entry by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<OutboxEntry>> {
        sqlx::query_as::<_, OutboxEntry>("SELECT * FROM sync_outbox WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find outbox entry", e))
    }

    /// Dead-letter snapshot of an entry, if it has one.
    pub async fn find_dead_letter(&self, outbox_id: i64) -> AppResult<Option<DeadLetterEntry>> {
        sqlx::query_as::<_, DeadLetterEntry>("SELECT * FROM sync_dead_letters WHERE outbox_id = $1")
            .bind(outbox_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find dead letter", e))
    }
}

#[async_trait]
impl OutboxStore for OutboxRepository {
    async fn claim_batch(&self, limit: i64) -> AppResult<Vec<OutboxEntry>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin outbox claim", e)
        })?;

        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM sync_outbox \
             WHERE status = 'pending' AND next_attempt_at <= NOW() \
             ORDER BY priority, id \
             LIMIT $1 \
             FOR UPDATE SKIP LOCKED",
        )
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to select outbox batch", e))?;

        if ids.is_empty() {
            tx.rollback().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to release outbox claim", e)
            })?;
            return Ok(Vec::new());
        }

        let mut entries = sqlx::query_as::<_, OutboxEntry>(
            "UPDATE sync_outbox SET status = 'processing', attempt_count = attempt_count + 1, \
             updated_at = NOW() WHERE id = ANY($1) RETURNING *",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim outbox batch", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit outbox claim", e)
        })?;

        entries.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn mark_processed(&self, id: i64) -> AppResult<()> {
        sqlx::query(
            "UPDATE sync_outbox SET status = 'processed', processed_at = NOW(), last_error = NULL, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark outbox entry processed", e)
        })?;
        Ok(())
    }

    async fn mark_retry(&self, id: i64, delay_seconds: i64, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE sync_outbox SET status = 'pending', \
             next_attempt_at = NOW() + make_interval(secs => $2), last_error = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(delay_seconds as f64)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to schedule outbox retry", e)
        })?;
        Ok(())
    }

    async fn mark_dead_letter(&self, entry: &OutboxEntry, error: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin dead-letter", e)
        })?;

        sqlx::query(
            "UPDATE sync_outbox SET status = 'dead_letter', last_error = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(entry.id)
        .bind(error)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to dead-letter outbox entry", e)
        })?;

        sqlx::query(
            "INSERT INTO sync_dead_letters (outbox_id, event_type, entity_type, entity_id, payload, error_message) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (outbox_id) DO NOTHING",
        )
        .bind(entry.id)
        .bind(&entry.event_type)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.payload)
        .bind(error)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to write dead-letter snapshot", e)
        })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit dead-letter", e)
        })?;
        Ok(())
    }

    async fn count_by_status(&self, status: OutboxStatus) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM sync_outbox WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count outbox entries", e)
            })
    }
}
