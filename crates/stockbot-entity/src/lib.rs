//! # stockbot-entity
//!
//! Domain entity models for stockbot. Every struct here is stored as the
//! `data` of one document and implements [`stockbot_core::types::Entity`].

pub mod todo;

pub use todo::TodoEntity;
