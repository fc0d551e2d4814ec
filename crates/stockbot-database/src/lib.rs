//! # stockbot-database
//!
//! Document store access for stockbot: the query expression builder, the
//! store value model, store clients (hosted Fauna over HTTP and an
//! in-process store), and the repository implementations built on them.

pub mod client;
pub mod connection;
pub mod query;
pub mod repositories;

pub use client::StoreClient;
pub use connection::StoreConnection;
