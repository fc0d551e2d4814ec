//! Generic repository trait for document access.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::types::entity::Entity;
use crate::types::pagination::{Page, PaginationOptions};

/// Generic CRUD repository over one collection of `T` documents.
///
/// Absence is reported as `Ok(None)`; every other failure is an `Err`
/// carrying the store's original error as its source.
#[async_trait]
pub trait Repository<T>: Send + Sync + 'static
where
    T: Entity,
{
    /// Create the document under `entity.id()`, or fully replace it if it
    /// already exists, and return the stored value.
    async fn save(&self, entity: &T) -> AppResult<T>;

    /// Find an entity by its identifier.
    async fn find(&self, id: &str) -> AppResult<Option<T>>;

    /// Delete an entity and return the value it had before deletion.
    async fn remove(&self, id: &str) -> AppResult<Option<T>>;

    /// List one page of entities through the bound index.
    async fn find_all(&self, options: &PaginationOptions) -> AppResult<Page<T>>;
}
