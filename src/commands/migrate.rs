//! Database migration command.

use coachsync_core::config::AppConfig;
use coachsync_core::error::AppError;
use coachsync_database::DatabasePool;

use crate::output;

/// Apply pending migrations regardless of `worker.run_migrations`.
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let db = DatabasePool::connect(&config.database).await?;
    coachsync_database::migration::run_migrations(db.pool()).await?;
    db.close().await;
    output::print_success("All migrations applied successfully.");
    Ok(())
}
