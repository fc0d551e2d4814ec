//! Model types shared by repositories and their callers.

pub mod binding;
pub mod entity;
pub mod pagination;

pub use binding::CollectionBinding;
pub use entity::Entity;
pub use pagination::{MAX_PAGE_SIZE, Page, PaginationOptions};
