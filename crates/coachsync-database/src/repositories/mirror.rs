//! Local mirror of upstream records.

use async_trait::async_trait;
use sqlx::PgPool;

use coachsync_core::error::{AppError, ErrorKind};
use coachsync_core::result::AppResult;
use coachsync_core::traits::UpstreamRecord;
use coachsync_entity::user::UpstreamUser;

use crate::store::MirrorStore;

/// Repository for `upstream_records` and the upstream-owned `users` columns.
#[derive(Debug, Clone)]
pub struct MirrorRepository {
    pool: PgPool,
}

impl MirrorRepository {
    /// Create a new mirror repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Number of mirrored records of `table`.
    pub async fn count_records(&self, table: &str) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM upstream_records WHERE table_name = $1")
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count records", e))
    }
}

#[async_trait]
impl MirrorStore for MirrorRepository {
    async fn upsert_records(&self, table: &str, records: &[UpstreamRecord]) -> AppResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin mirror upsert", e)
        })?;

        let mut written = 0;
        for record in records {
            let result = sqlx::query(
                "INSERT INTO upstream_records (table_name, record_id, fields, synced_at) \
                 VALUES ($1, $2, $3, NOW()) \
                 ON CONFLICT (table_name, record_id) DO UPDATE SET \
                    fields = EXCLUDED.fields, synced_at = NOW() \
                 WHERE upstream_records.fields IS DISTINCT FROM EXCLUDED.fields",
            )
            .bind(table)
            .bind(&record.id)
            .bind(&record.fields)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mirror record", e))?;
            written += result.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit mirror upsert", e)
        })?;
        Ok(written)
    }

    async fn upsert_users(&self, users: &[UpstreamUser]) -> AppResult<u64> {
        if users.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin user upsert", e)
        })?;

        let mut written = 0;
        for user in users {
            // Email is the local identity; the upstream id is attached on
            // first sight and kept in step afterwards.
            let result = sqlx::query(
                "INSERT INTO users (upstream_record_id, email, language_code) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (email) DO UPDATE SET \
                    upstream_record_id = EXCLUDED.upstream_record_id, \
                    language_code = EXCLUDED.language_code, \
                    updated_at = NOW() \
                 WHERE (users.upstream_record_id, users.language_code) \
                   IS DISTINCT FROM (EXCLUDED.upstream_record_id, EXCLUDED.language_code)",
            )
            .bind(&user.record_id)
            .bind(&user.email)
            .bind(&user.language_code)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert user", e))?;
            written += result.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit user upsert", e)
        })?;
        Ok(written)
    }
}
