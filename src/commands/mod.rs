//! CLI command definitions and dispatch.

pub mod migrate;
pub mod plan;
pub mod run;
pub mod status;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use coachsync_core::config::AppConfig;
use coachsync_core::error::AppError;
use coachsync_database::DatabasePool;
use coachsync_database::repositories::{
    DeliveryLogRepository, MirrorRepository, NotificationJobRepository, OutboxRepository,
    PreferenceRepository, ScheduleRepository, SubscriptionRepository, UserRepository,
};
use coachsync_worker::transport::{AirtableClient, PushGatewayClient};
use coachsync_worker::{NotificationPlanner, NotificationWorker, OutboxDispatcher, UpstreamMirror};

use crate::output::OutputFormat;

/// CoachSync background delivery engine
#[derive(Debug, Parser)]
#[command(name = "coachsync", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding `default.toml` and the per-environment overlay
    #[arg(short, long = "config", default_value = "config")]
    pub config_dir: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the worker loop until SIGINT/SIGTERM
    Run,
    /// Apply pending database migrations
    Migrate,
    /// Reconcile reminder jobs once, for one user or every eligible user
    Plan(plan::PlanArgs),
    /// Show queue depth per status
    Status,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Run => run::execute(config).await,
            Commands::Migrate => migrate::execute(&config).await,
            Commands::Plan(args) => plan::execute(args, &config, self.format).await,
            Commands::Status => status::execute(&config, self.format).await,
        }
    }
}

/// Every repository the engine uses, sharing one pool.
#[derive(Debug, Clone)]
pub struct Repositories {
    pub jobs: Arc<NotificationJobRepository>,
    pub outbox: Arc<OutboxRepository>,
    pub preferences: Arc<PreferenceRepository>,
    pub subscriptions: Arc<SubscriptionRepository>,
    pub delivery_logs: Arc<DeliveryLogRepository>,
    pub schedules: Arc<ScheduleRepository>,
    pub users: Arc<UserRepository>,
    pub mirror: Arc<MirrorRepository>,
}

impl Repositories {
    /// Build all repositories over `db`.
    pub fn new(db: &DatabasePool, config: &AppConfig) -> Self {
        let pool = db.pool().clone();

        Self {
            jobs: Arc::new(NotificationJobRepository::new(pool.clone())),
            outbox: Arc::new(OutboxRepository::new(pool.clone())),
            preferences: Arc::new(PreferenceRepository::new(
                pool.clone(),
                config.notifications.default_timezone,
            )),
            subscriptions: Arc::new(SubscriptionRepository::new(pool.clone())),
            delivery_logs: Arc::new(DeliveryLogRepository::new(pool.clone())),
            schedules: Arc::new(ScheduleRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool.clone())),
            mirror: Arc::new(MirrorRepository::new(pool)),
        }
    }
}

/// Helper: open the database pool, applying migrations when configured.
pub async fn connect(config: &AppConfig) -> Result<DatabasePool, AppError> {
    let db = DatabasePool::connect(&config.database).await?;
    if config.worker.run_migrations {
        coachsync_database::migration::run_migrations(db.pool()).await?;
    }
    Ok(db)
}

/// Helper: the reminder planner over the given repositories.
pub fn build_planner(repos: &Repositories, config: &AppConfig) -> NotificationPlanner {
    NotificationPlanner::new(
        repos.preferences.clone(),
        repos.jobs.clone(),
        repos.schedules.clone(),
        repos.users.clone(),
        &config.notifications,
    )
}

/// Helper: the push delivery worker over the given repositories.
pub fn build_worker(
    repos: &Repositories,
    config: &AppConfig,
) -> Result<NotificationWorker, AppError> {
    let transport = Arc::new(PushGatewayClient::new(&config.push)?);
    Ok(NotificationWorker::new(
        repos.jobs.clone(),
        repos.subscriptions.clone(),
        repos.preferences.clone(),
        repos.delivery_logs.clone(),
        transport,
        &config.notifications,
        config.worker.delivery_concurrency,
    ))
}

/// Helper: the outbox dispatcher and upstream mirror sharing one client.
pub fn build_upstream(
    repos: &Repositories,
    config: &AppConfig,
) -> Result<(OutboxDispatcher, UpstreamMirror), AppError> {
    let upstream = Arc::new(AirtableClient::new(&config.upstream)?);
    let dispatcher = OutboxDispatcher::new(repos.outbox.clone(), upstream.clone(), &config.outbox);
    let mirror = UpstreamMirror::new(upstream, repos.mirror.clone(), &config.upstream);
    Ok((dispatcher, mirror))
}
