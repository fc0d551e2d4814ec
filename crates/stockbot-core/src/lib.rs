//! # stockbot-core
//!
//! Core crate for the stockbot persistence layer. Holds the repository
//! traits, the entity/page/pagination model, configuration schemas, and
//! the error type every other crate maps into.
//!
//! Nothing in here knows about a concrete document store.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{AppError, AppResult, ErrorKind};
