//! Embedded migration runner.

use sqlx::PgPool;
use tracing::info;

use coachsync_core::error::{AppError, ErrorKind};

/// Apply every pending migration from `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Applying delivery engine migrations");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migrations: {e}"),
                e,
            )
        })?;

    info!("Migrations applied");
    Ok(())
}
