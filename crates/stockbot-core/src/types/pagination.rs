//! Cursor pagination types for listing queries.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Largest page the store will return in one request.
pub const MAX_PAGE_SIZE: u32 = 100_000;

/// Request parameters for a paginated listing.
///
/// Cursors are document identifiers. `after` is inclusive: the page starts
/// at that document. `before` is exclusive: the page ends just before it.
/// When both are given the store decides which one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationOptions {
    /// Maximum number of entities on the page (store default when unset).
    #[serde(default)]
    pub size: Option<u32>,
    /// Start the page at this document.
    #[serde(default)]
    pub after: Option<String>,
    /// End the page just before this document.
    #[serde(default)]
    pub before: Option<String>,
}

impl PaginationOptions {
    /// First page with the store's default size.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into());
        self
    }

    pub fn with_before(mut self, before: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self
    }

    /// Check the options before a query is built from them.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(size) = self.size {
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(AppError::validation(format!(
                    "Page size must be between 1 and {MAX_PAGE_SIZE}, got {size}"
                )));
            }
        }
        if self.after.as_deref() == Some("") || self.before.as_deref() == Some("") {
            return Err(AppError::validation("Pagination cursors must not be empty"));
        }
        Ok(())
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Entities on this page, in index order.
    pub data: Vec<T>,
    /// Cursor for the previous page, present only when one exists.
    pub before: Option<String>,
    /// Cursor for the next page, present only when one exists.
    pub after: Option<String>,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, before: Option<String>, after: Option<String>) -> Self {
        Self {
            data,
            before,
            after,
        }
    }

    /// A page with no entities and no neighbours.
    pub fn empty() -> Self {
        Self::new(Vec::new(), None, None)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.after.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.before.is_some()
    }

    /// Options that request the page following this one, if any.
    pub fn next_options(&self, size: Option<u32>) -> Option<PaginationOptions> {
        self.after.as_ref().map(|after| PaginationOptions {
            size,
            after: Some(after.clone()),
            before: None,
        })
    }

    /// Options that request the page preceding this one, if any.
    pub fn previous_options(&self, size: Option<u32>) -> Option<PaginationOptions> {
        self.before.as_ref().map(|before| PaginationOptions {
            size,
            after: None,
            before: Some(before.clone()),
        })
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}
