//! One-off reminder planning.

use clap::Args;
use serde_json::json;
use uuid::Uuid;

use coachsync_core::config::AppConfig;
use coachsync_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for the plan command
#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Plan only this user
    #[arg(long)]
    pub user: Option<Uuid>,
}

/// Run a planning pass and print what it changed.
pub async fn execute(args: &PlanArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let db = super::connect(config).await?;
    let repos = super::Repositories::new(&db, config);
    let planner = super::build_planner(&repos, config);

    let report = match args.user {
        Some(user_id) => {
            let outcome = planner.sync_jobs_for_user(user_id).await?;
            json!({
                "user_id": user_id,
                "planned": outcome.planned,
                "skipped_quiet_hours": outcome.skipped_quiet_hours,
                "written": outcome.written,
                "cancelled": outcome.cancelled,
            })
        }
        None => {
            let summary = planner.sync_jobs_for_all_users().await?;
            json!({
                "users": summary.users,
                "failed_users": summary.failed_users,
                "written": summary.written,
                "cancelled": summary.cancelled,
            })
        }
    };
    db.close().await;

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Text => {
            output::print_header("Planning pass");
            if let Some(fields) = report.as_object() {
                for (key, value) in fields {
                    output::print_kv(key, &value.to_string());
                }
            }
        }
    }
    Ok(())
}
