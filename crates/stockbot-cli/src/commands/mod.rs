//! CLI command definitions and dispatch.

pub mod config;
pub mod todo;

use clap::{Parser, Subcommand};

use crate::output::{self, OutputFormat};
use stockbot_core::config::AppConfig;
use stockbot_core::error::{AppError, AppResult};
use stockbot_database::StoreConnection;
use stockbot_database::client::StoreClient;

/// stockbot: inspect and edit the bot's stored data
#[derive(Debug, Parser)]
#[command(name = "stockbot-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml", env = "STOCKBOT_CONFIG")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check that the store is reachable with the configured secret
    Health,
    /// Todo management
    Todo(todo::TodoArgs),
    /// Configuration inspection
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        match &self.command {
            Commands::Health => health(&config).await,
            Commands::Todo(args) => {
                let connection = connect(&config).await?;
                todo::execute(args, &connection, self.format).await
            }
            Commands::Config(args) => config::execute(args, &config, self.format),
        }
    }
}

/// Helper: open the configured store
pub async fn connect(config: &AppConfig) -> AppResult<StoreConnection> {
    StoreConnection::connect(&config.store).await
}

async fn health(config: &AppConfig) -> AppResult<()> {
    let connection = connect(config).await?;
    if connection.health_check().await? {
        output::print_success(&format!(
            "Store '{}' is reachable",
            connection.provider_type()
        ));
        Ok(())
    } else {
        Err(AppError::new(
            stockbot_core::ErrorKind::ServiceUnavailable,
            format!("Store '{}' failed its health check", connection.provider_type()),
        ))
    }
}
