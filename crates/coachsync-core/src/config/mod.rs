//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! optional TOML files and `COACHSYNC__`-prefixed environment variables.
//! Every field carries a default so the worker runs unconfigured.

pub mod database;
pub mod logging;
pub mod notification;
pub mod outbox;
pub mod push;
pub mod upstream;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::notification::NotificationConfig;
pub use self::outbox::OutboxConfig;
pub use self::push::PushConfig;
pub use self::upstream::UpstreamConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Worker loop settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Sync outbox retry settings.
    #[serde(default)]
    pub outbox: OutboxConfig,
    /// Reminder planning and delivery settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Push transport credentials.
    #[serde(default)]
    pub push: PushConfig,
    /// Upstream system-of-record settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges `{dir}/default.toml`, the environment overlay `{dir}/{env}.toml`
    /// and environment variables prefixed with `COACHSYNC__`. Missing files
    /// are not an error.
    pub fn load(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("COACHSYNC")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("upstream.resync_tables")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
