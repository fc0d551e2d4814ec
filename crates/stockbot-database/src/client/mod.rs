//! Store clients.
//!
//! [`StoreClient`] is the only thing repositories know about the store:
//! submit an [`Expr`], get back a [`Value`] or an [`AppError`] whose kind is
//! [`ErrorKind::NotFound`](stockbot_core::error::ErrorKind::NotFound) when
//! the targeted document does not exist.

pub mod error;
#[cfg(feature = "fauna")]
pub mod fauna;
#[cfg(feature = "memory")]
pub mod memory;

use std::fmt;

use async_trait::async_trait;

use stockbot_core::error::AppResult;

use crate::query::{Expr, Value};

pub use error::QueryError;
#[cfg(feature = "fauna")]
pub use fauna::FaunaClient;
#[cfg(feature = "memory")]
pub use memory::MemoryStore;

/// A handle to a document store that evaluates query expressions.
#[async_trait]
pub trait StoreClient: Send + Sync + fmt::Debug + 'static {
    /// Provider name (e.g. `"fauna"`, `"memory"`).
    fn provider_type(&self) -> &str;

    /// Evaluate one expression. Each call is atomic on the store side.
    async fn query(&self, expr: &Expr) -> AppResult<Value>;

    /// Check whether the store is reachable and accepts the credentials.
    async fn health_check(&self) -> AppResult<bool>;
}
