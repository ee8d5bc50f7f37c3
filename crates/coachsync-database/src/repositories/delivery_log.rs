//! Delivery log repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use coachsync_core::error::{AppError, ErrorKind};
use coachsync_core::result::AppResult;
use coachsync_entity::delivery::{DeliveryLogEntry, NewDeliveryLog};

use crate::store::DeliveryLogStore;

/// Repository for the append-only `notification_delivery_logs` table.
#[derive(Debug, Clone)]
pub struct DeliveryLogRepository {
    pool: PgPool,
}

impl DeliveryLogRepository {
    /// Create a new delivery log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every attempt recorded for a job, oldest first.
    pub async fn find_by_job(&self, job_id: Uuid) -> AppResult<Vec<DeliveryLogEntry>> {
        sqlx::query_as::<_, DeliveryLogEntry>(
            "SELECT * FROM notification_delivery_logs WHERE job_id = $1 ORDER BY id",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list delivery logs", e))
    }
}

#[async_trait]
impl DeliveryLogStore for DeliveryLogRepository {
    async fn append(&self, entry: &NewDeliveryLog) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notification_delivery_logs (job_id, subscription_id, success, status_code, error_message) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.job_id)
        .bind(entry.subscription_id)
        .bind(entry.success)
        .bind(entry.status_code)
        .bind(&entry.error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append delivery log", e))?;
        Ok(())
    }
}
