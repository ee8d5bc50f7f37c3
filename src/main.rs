//! CoachSync delivery engine entry point.
//!
//! Parses the command line, loads configuration, initializes logging and
//! hands off to the selected command.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use coachsync_core::config::AppConfig;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(&cli.config_dir) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = cli.execute(config).await {
        tracing::error!("coachsync error: {}", e);
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Load `{dir}/default.toml`, the `COACHSYNC_ENV` overlay and `COACHSYNC__*`
/// environment variables.
fn load_configuration(dir: &str) -> Result<AppConfig, coachsync_core::AppError> {
    let env = std::env::var("COACHSYNC_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(dir, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}
