//! Todo repository.

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;

use stockbot_core::error::AppResult;
use stockbot_core::traits::{IdentityFactory, Repository};
use stockbot_core::types::{CollectionBinding, Page, PaginationOptions};
use stockbot_entity::todo::TodoEntity;

use super::document::DocumentRepository;
use crate::client::StoreClient;

/// Collection holding todo documents.
pub const TODO_COLLECTION: &str = "todos";
/// Index listing every todo document.
pub const TODO_INDEX: &str = "all_todos";

/// Repository for [`TodoEntity`] documents in `todos`, listed through
/// `all_todos`.
#[derive(Debug, Clone)]
pub struct TodoRepository {
    inner: DocumentRepository<TodoEntity>,
}

impl TodoRepository {
    /// Create a new todo repository on the shared store client.
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self {
            inner: DocumentRepository::new(
                client,
                CollectionBinding::new(TODO_COLLECTION, TODO_INDEX),
            ),
        }
    }
}

impl Deref for TodoRepository {
    type Target = DocumentRepository<TodoEntity>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[async_trait]
impl Repository<TodoEntity> for TodoRepository {
    async fn save(&self, entity: &TodoEntity) -> AppResult<TodoEntity> {
        self.inner.save(entity).await
    }

    async fn find(&self, id: &str) -> AppResult<Option<TodoEntity>> {
        self.inner.find(id).await
    }

    async fn remove(&self, id: &str) -> AppResult<Option<TodoEntity>> {
        self.inner.remove(id).await
    }

    async fn find_all(&self, options: &PaginationOptions) -> AppResult<Page<TodoEntity>> {
        self.inner.find_all(options).await
    }
}

#[async_trait]
impl IdentityFactory for TodoRepository {
    async fn next_id(&self) -> AppResult<String> {
        self.inner.next_id().await
    }
}
