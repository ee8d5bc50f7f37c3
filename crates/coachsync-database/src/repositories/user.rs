//! User directory queries.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use coachsync_core::error::{AppError, ErrorKind};
use coachsync_core::result::AppResult;

use crate::store::UserDirectory;

/// Repository for read-only `users` lookups.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn get_user_language_code(&self, user_id: Uuid) -> AppResult<Option<String>> {
        let code: Option<Option<String>> =
            sqlx::query_scalar("SELECT language_code FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to get user language", e)
                })?;
        Ok(code.flatten())
    }

    async fn list_users_for_notification_planning(&self) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar(
            "SELECT user_id FROM programs WHERE status IN ('active', 'planned') \
             UNION \
             SELECT user_id FROM notification_preferences WHERE enabled = TRUE \
             ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list planning users", e))
    }
}
