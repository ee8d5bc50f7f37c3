//! Queue depth report.

use std::collections::BTreeMap;

use coachsync_core::config::AppConfig;
use coachsync_core::error::AppError;
use coachsync_database::{JobStore, OutboxStore};
use coachsync_entity::notification::NotificationJobStatus;
use coachsync_entity::outbox::OutboxStatus;

use crate::output::{self, OutputFormat};

/// Print job and outbox counts for every status.
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let db = super::connect(config).await?;
    db.health_check().await?;
    let repos = super::Repositories::new(&db, config);

    let mut jobs = BTreeMap::new();
    for status in NotificationJobStatus::all() {
        jobs.insert(status.as_str(), repos.jobs.count_by_status(status).await?);
    }

    let mut outbox = BTreeMap::new();
    for status in OutboxStatus::all() {
        outbox.insert(status.as_str(), repos.outbox.count_by_status(status).await?);
    }
    db.close().await;

    match format {
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "notification_jobs": jobs,
            "sync_outbox": outbox,
        })),
        OutputFormat::Text => {
            output::print_header("Notification jobs");
            for (status, count) in &jobs {
                output::print_kv(status, &count.to_string());
            }
            output::print_header("Sync outbox");
            for (status, count) in &outbox {
                output::print_kv(status, &count.to_string());
            }
        }
    }
    Ok(())
}
