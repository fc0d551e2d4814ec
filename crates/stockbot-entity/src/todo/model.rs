//! Todo entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbot_core::types::Entity;

/// A todo item tracked by the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoEntity {
    /// Document identifier, usually obtained from `next_id`.
    pub id: String,
    /// What needs doing.
    pub text: String,
    /// Whether the item has been completed.
    #[serde(default)]
    pub done: bool,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
}

impl TodoEntity {
    /// Create an open todo under a pre-allocated identifier.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            done: false,
            created_at: Utc::now(),
        }
    }

    /// Copy of this todo marked as completed.
    pub fn completed(&self) -> Self {
        Self {
            done: true,
            ..self.clone()
        }
    }
}

impl Entity for TodoEntity {
    fn id(&self) -> &str {
        &self.id
    }
}
