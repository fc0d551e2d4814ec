//! Logging configuration.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive, e.g. `"info"` or `"stockbot_database=debug"`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format: `"json"` or `"pretty"`.
    #[serde(default = "default_format")]
    pub format: String,
}

impl LoggingConfig {
    pub(crate) fn validate(&self) -> AppResult<()> {
        match self.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(AppError::configuration(format!(
                "Unknown log format: '{other}'. Supported: json, pretty"
            ))),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}
