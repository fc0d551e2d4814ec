//! Configuration inspection CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use stockbot_core::config::AppConfig;
use stockbot_core::config::store::mask_secret;
use stockbot_core::error::AppResult;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration with the store secret masked
    Show,
    /// Summarize the configuration that would be used
    Validate,
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    match &args.command {
        ConfigCommand::Show => {
            let masked = masked(config);
            match format {
                OutputFormat::Json => output::print_json(&masked),
                OutputFormat::Table => println!("{masked:#?}"),
            }
        }
        ConfigCommand::Validate => {
            config.validate()?;
            output::print_success("Configuration is valid");
            output::print_kv("Store", &config.store.provider);
            if config.store.provider == "fauna" {
                output::print_kv("Endpoint", &config.store.fauna.endpoint);
                output::print_kv("Secret", &mask_secret(&config.store.fauna.secret));
            } else {
                let names: Vec<&str> = config
                    .store
                    .memory
                    .collections
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect();
                output::print_kv("Collections", &names.join(", "));
            }
            output::print_kv("Log level", &config.logging.level);
        }
    }

    Ok(())
}

fn masked(config: &AppConfig) -> AppConfig {
    let mut masked = config.clone();
    masked.store.fauna.secret = mask_secret(&masked.store.fauna.secret);
    masked
}
