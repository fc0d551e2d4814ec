//! Store-generated identifiers.

use async_trait::async_trait;

use crate::error::AppResult;

/// Source of fresh identifiers for new entities.
///
/// Every call may consume an identifier on the store side, even when the
/// caller never uses the result.
#[async_trait]
pub trait IdentityFactory: Send + Sync + 'static {
    /// Ask the store for an identifier no other document has been given.
    async fn next_id(&self) -> AppResult<String>;
}
