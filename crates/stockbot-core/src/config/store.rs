//! Document store configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Top-level store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store provider: `"fauna"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Hosted Fauna settings.
    #[serde(default)]
    pub fauna: FaunaConfig,
    /// In-process store settings.
    #[serde(default)]
    pub memory: MemoryStoreConfig,
}

impl StoreConfig {
    pub(crate) fn validate(&self) -> AppResult<()> {
        match self.provider.as_str() {
            "fauna" => {
                if self.fauna.secret.trim().is_empty() {
                    return Err(AppError::configuration(
                        "store.fauna.secret must be set when store.provider = \"fauna\"",
                    ));
                }
                if self.fauna.timeout_seconds == 0 {
                    return Err(AppError::configuration(
                        "store.fauna.timeout_seconds must be greater than zero",
                    ));
                }
                Ok(())
            }
            "memory" => {
                if let Some(schema) = self
                    .memory
                    .collections
                    .iter()
                    .find(|c| c.name.is_empty() || c.index.is_empty())
                {
                    return Err(AppError::configuration(format!(
                        "store.memory.collections entry {schema:?} needs both a name and an index"
                    )));
                }
                Ok(())
            }
            other => Err(AppError::configuration(format!(
                "Unknown store provider: '{other}'. Supported: fauna, memory"
            ))),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            fauna: FaunaConfig::default(),
            memory: MemoryStoreConfig::default(),
        }
    }
}

/// Hosted Fauna connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct FaunaConfig {
    /// Base URL of the query endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Access secret (database key).
    #[serde(default)]
    pub secret: String,
    /// Whole-request HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Server-side query timeout in milliseconds (`X-Query-Timeout`).
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
}

impl Default for FaunaConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            secret: String::new(),
            timeout_seconds: default_timeout(),
            query_timeout_ms: None,
        }
    }
}

impl fmt::Debug for FaunaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaunaConfig")
            .field("endpoint", &self.endpoint)
            .field("secret", &mask_secret(&self.secret))
            .field("timeout_seconds", &self.timeout_seconds)
            .field("query_timeout_ms", &self.query_timeout_ms)
            .finish()
    }
}

/// In-process store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Collections (and their listing index) the store starts with.
    #[serde(default = "default_collections")]
    pub collections: Vec<CollectionSchema>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            collections: default_collections(),
        }
    }
}

/// One collection and the index used to list it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub index: String,
}

/// Keep the first four characters of a secret for log correlation.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}****")
}

fn default_provider() -> String {
    "fauna".to_string()
}

fn default_endpoint() -> String {
    "https://db.fauna.com".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_collections() -> Vec<CollectionSchema> {
    vec![CollectionSchema {
        name: "todos".to_string(),
        index: "all_todos".to_string(),
    }]
}
