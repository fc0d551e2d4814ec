//! Collection/index pair a concrete repository is bound to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Names of the collection holding an entity's documents and of the
/// index used to list them.
///
/// Both must already exist in the store's schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionBinding {
    collection: String,
    index: String,
}

impl CollectionBinding {
    pub fn new(collection: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            index: index.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn index(&self) -> &str {
        &self.index
    }
}

impl fmt::Display for CollectionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (index {})", self.collection, self.index)
    }
}
