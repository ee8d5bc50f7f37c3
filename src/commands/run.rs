//! Long-running worker command.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use coachsync_core::config::AppConfig;
use coachsync_core::error::AppError;
use coachsync_worker::WorkerLoop;

/// Wire the engine and run the worker loop until a shutdown signal.
pub async fn execute(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting CoachSync worker v{}", env!("CARGO_PKG_VERSION"));

    // ── Database connection + migrations ─────────────────────────
    let db = super::connect(&config).await?;
    let repos = super::Repositories::new(&db, &config);

    // ── Pipelines ────────────────────────────────────────────────
    let (dispatcher, mirror) = super::build_upstream(&repos, &config)?;
    let worker = super::build_worker(&repos, &config)?;
    let planner = super::build_planner(&repos, &config);

    if !worker.is_enabled() {
        tracing::warn!("Push credentials missing, notification delivery is disabled");
    }
    if !config.upstream.is_configured() {
        tracing::warn!("Upstream credentials missing, outbox entries stay pending until configured");
    }

    let mut worker_loop = WorkerLoop::new(
        Arc::new(dispatcher),
        Arc::new(worker),
        Arc::new(planner),
        Arc::new(mirror),
        config.worker.clone(),
    );

    // ── Shutdown channel ─────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        worker_loop.run(shutdown_rx).await;
    });

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, finishing current tick...");
    let _ = shutdown_tx.send(true);

    if tokio::time::timeout(Duration::from_secs(30), handle).await.is_err() {
        tracing::warn!("Worker loop did not stop within 30s");
    }

    db.close().await;
    tracing::info!("CoachSync worker shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
