//! Application configuration schemas.
//!
//! Configuration is read from an optional TOML file and overlaid with
//! environment variables prefixed `STOCKBOT__` (nested keys joined by
//! `__`), so `STOCKBOT__STORE__FAUNA__SECRET` sets `store.fauna.secret`.

pub mod logging;
pub mod store;

use serde::{Deserialize, Serialize};

pub use self::logging::LoggingConfig;
pub use self::store::{CollectionSchema, FaunaConfig, MemoryStoreConfig, StoreConfig};

use crate::error::{AppError, AppResult, ErrorKind};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "STOCKBOT";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Document store connection settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `path` (if it exists) plus the environment.
    pub fn load(path: &str) -> AppResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(environment())
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to build config: {e}"),
                    e,
                )
            })?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to deserialize config: {e}"),
                    e,
                )
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that would only fail later at connect time.
    pub fn validate(&self) -> AppResult<()> {
        self.store.validate()?;
        self.logging.validate()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}
