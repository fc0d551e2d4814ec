//! Todo management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use stockbot_core::error::{AppError, AppResult};
use stockbot_core::traits::{IdentityFactory, Repository};
use stockbot_core::types::PaginationOptions;
use stockbot_database::StoreConnection;
use stockbot_database::repositories::TodoRepository;
use stockbot_entity::todo::TodoEntity;

/// Arguments for todo commands
#[derive(Debug, Args)]
pub struct TodoArgs {
    /// Todo subcommand
    #[command(subcommand)]
    pub command: TodoCommand,
}

/// Todo subcommands
#[derive(Debug, Subcommand)]
pub enum TodoCommand {
    /// Reserve a fresh identifier from the store
    NextId,
    /// Create a todo
    Add {
        /// What needs doing
        text: String,
        /// Identifier to store it under (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Show one todo
    Get {
        /// Todo ID
        id: String,
    },
    /// Mark a todo as done
    Done {
        /// Todo ID
        id: String,
    },
    /// Delete a todo
    Remove {
        /// Todo ID
        id: String,
    },
    /// List todos one page at a time
    List {
        /// Page size
        #[arg(short, long)]
        size: Option<u32>,
        /// Start the page at this todo ID
        #[arg(long, conflicts_with = "before")]
        after: Option<String>,
        /// End the page just before this todo ID
        #[arg(long)]
        before: Option<String>,
    },
}

/// Todo display row
#[derive(Debug, Serialize, Tabled)]
struct TodoRow {
    /// ID
    id: String,
    /// Done
    done: String,
    /// Text
    text: String,
    /// Created
    created_at: String,
}

impl From<&TodoEntity> for TodoRow {
    fn from(todo: &TodoEntity) -> Self {
        Self {
            id: todo.id.clone(),
            done: if todo.done { "yes" } else { "no" }.to_string(),
            text: todo.text.clone(),
            created_at: todo.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute todo commands
pub async fn execute(
    args: &TodoArgs,
    connection: &StoreConnection,
    format: OutputFormat,
) -> AppResult<()> {
    let repo = TodoRepository::new(connection.client());

    match &args.command {
        TodoCommand::NextId => {
            let id = repo.next_id().await?;
            match format {
                OutputFormat::Table => println!("{id}"),
                OutputFormat::Json => output::print_json(&serde_json::json!({ "id": id })),
            }
        }
        TodoCommand::Add { text, id } => {
            if text.trim().is_empty() {
                return Err(AppError::validation("Todo text must not be empty"));
            }
            let id = match id {
                Some(id) => id.clone(),
                None => repo.next_id().await?,
            };
            let saved = repo.save(&TodoEntity::new(id, text.as_str())).await?;
            output::print_item(&TodoRow::from(&saved), format);
        }
        TodoCommand::Get { id } => match repo.find(id).await? {
            Some(todo) => output::print_item(&TodoRow::from(&todo), format),
            None => output::print_warning(&format!("Todo '{id}' not found")),
        },
        TodoCommand::Done { id } => match repo.find(id).await? {
            Some(todo) => {
                let saved = repo.save(&todo.completed()).await?;
                output::print_item(&TodoRow::from(&saved), format);
            }
            None => output::print_warning(&format!("Todo '{id}' not found")),
        },
        TodoCommand::Remove { id } => match repo.remove(id).await? {
            Some(todo) => output::print_success(&format!("Removed todo '{}': {}", todo.id, todo.text)),
            None => output::print_warning(&format!("Todo '{id}' not found")),
        },
        TodoCommand::List {
            size,
            after,
            before,
        } => {
            let options = PaginationOptions {
                size: *size,
                after: after.clone(),
                before: before.clone(),
            };
            let page = repo.find_all(&options).await?;
            let rows: Vec<TodoRow> = page.data.iter().map(TodoRow::from).collect();

            match format {
                OutputFormat::Json => output::print_json(&serde_json::json!({
                    "data": rows,
                    "before": page.before,
                    "after": page.after,
                })),
                OutputFormat::Table => {
                    output::print_list(&rows, format);
                    if let Some(before) = &page.before {
                        output::print_kv("previous", &format!("--before {before}"));
                    }
                    if let Some(after) = &page.after {
                        output::print_kv("next", &format!("--after {after}"));
                    }
                }
            }
        }
    }

    Ok(())
}
