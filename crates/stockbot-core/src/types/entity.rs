//! The contract every persisted record satisfies.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A record with a unique string identifier.
///
/// Apart from [`Entity::id`] the repository treats the record as opaque:
/// it is serialized as a whole under the document's `data` key and
/// deserialized back from it.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The identifier the record is stored under.
    fn id(&self) -> &str;
}
