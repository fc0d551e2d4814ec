//! Core traits defined in `stockbot-core` and implemented by the database crate.

pub mod identity;
pub mod repository;

pub use identity::IdentityFactory;
pub use repository::Repository;
