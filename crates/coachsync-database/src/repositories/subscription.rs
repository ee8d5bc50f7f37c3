//! Push subscription repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use coachsync_core::error::{AppError, ErrorKind};
use coachsync_core::result::AppResult;
use coachsync_core::traits::PushTarget;
use coachsync_entity::subscription::PushSubscription;

use crate::store::SubscriptionStore;

/// Repository for `push_subscriptions`.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    /// Create a new subscription repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a subscription by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<PushSubscription>> {
        sqlx::query_as::<_, PushSubscription>("SELECT * FROM push_subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find subscription", e))
    }
}

#[async_trait]
impl SubscriptionStore for SubscriptionRepository {
    async fn register(&self, user_id: Uuid, target: &PushTarget) -> AppResult<PushSubscription> {
        sqlx::query_as::<_, PushSubscription>(
            "INSERT INTO push_subscriptions (user_id, endpoint, p256dh, auth) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (endpoint) DO UPDATE SET \
                user_id = EXCLUDED.user_id, \
                p256dh = EXCLUDED.p256dh, \
                auth = EXCLUDED.auth, \
                status = 'active', \
                failure_count = 0, \
                last_error = NULL, \
                updated_at = NOW() \
             RETURNING *",
        )
        .bind(user_id)
        .bind(&target.endpoint)
        .bind(&target.p256dh)
        .bind(&target.auth)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to register subscription", e))
    }

    async fn list_active(&self, user_id: Uuid) -> AppResult<Vec<PushSubscription>> {
        sqlx::query_as::<_, PushSubscription>(
            "SELECT * FROM push_subscriptions \
             WHERE user_id = $1 AND status IN ('active', 'error') \
             ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list subscriptions", e))
    }

    async fn mark_success(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE push_subscriptions SET status = 'active', failure_count = 0, \
             last_success_at = NOW(), last_error = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record subscription success", e)
        })?;
        Ok(())
    }

    async fn mark_error(&self, id: Uuid, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE push_subscriptions SET status = 'error', failure_count = failure_count + 1, \
             last_error = $2, updated_at = NOW() WHERE id = $1 AND status <> 'expired'",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record subscription error", e)
        })?;
        Ok(())
    }

    async fn mark_expired(&self, id: Uuid, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE push_subscriptions SET status = 'expired', failure_count = failure_count + 1, \
             last_error = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to expire subscription", e))?;
        Ok(())
    }
}
