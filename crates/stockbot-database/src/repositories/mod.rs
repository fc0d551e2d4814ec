//! Repository implementations.

pub mod document;
pub mod todo;

pub use document::DocumentRepository;
pub use todo::TodoRepository;
