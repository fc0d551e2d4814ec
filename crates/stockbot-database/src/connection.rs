//! The process-wide store handle.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use stockbot_core::config::StoreConfig;
use stockbot_core::error::{AppError, AppResult};

use crate::client::StoreClient;
use crate::query::{Expr, Value};

/// Wraps the store client selected by configuration.
///
/// Construct it once at startup and hand [`StoreConnection::client`] to
/// every repository; clones share the same underlying client.
#[derive(Debug, Clone)]
pub struct StoreConnection {
    inner: Arc<dyn StoreClient>,
}

impl StoreConnection {
    /// Create the configured store client.
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let inner: Arc<dyn StoreClient> = match config.provider.as_str() {
            #[cfg(feature = "fauna")]
            "fauna" => {
                info!("Initializing Fauna store client");
                Arc::new(crate::client::FaunaClient::new(&config.fauna)?)
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!(
                    collections = config.memory.collections.len(),
                    "Initializing in-memory store"
                );
                Arc::new(crate::client::MemoryStore::from_config(&config.memory))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: fauna, memory"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Wrap an existing client (for testing).
    pub fn from_client(client: Arc<dyn StoreClient>) -> Self {
        Self { inner: client }
    }

    /// Shared handle for repositories.
    pub fn client(&self) -> Arc<dyn StoreClient> {
        Arc::clone(&self.inner)
    }
}

#[async_trait]
impl StoreClient for StoreConnection {
    fn provider_type(&self) -> &str {
        self.inner.provider_type()
    }

    async fn query(&self, expr: &Expr) -> AppResult<Value> {
        self.inner.query(expr).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockbot_core::error::ErrorKind;

    #[tokio::test]
    async fn test_memory_provider_selected() {
        let config = StoreConfig {
            provider: "memory".to_string(),
            ..StoreConfig::default()
        };
        let connection = StoreConnection::connect(&config).await.expect("connect");
        assert_eq!(connection.provider_type(), "memory");
        assert!(connection.health_check().await.expect("health"));
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let config = StoreConfig {
            provider: "mongo".to_string(),
            ..StoreConfig::default()
        };
        let err = StoreConnection::connect(&config).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_clients_are_shared() {
        let connection = StoreConnection::from_client(Arc::new(
            crate::client::MemoryStore::new().with_collection("todos", "all_todos"),
        ));
        assert!(Arc::ptr_eq(&connection.client(), &connection.clone().client()));
    }
}
