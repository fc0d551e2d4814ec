//! Generic document repository.
//!
//! Every entity type shares this implementation; a concrete repository
//! only chooses the entity type and the collection/index it lives in.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use stockbot_core::error::{AppError, AppResult};
use stockbot_core::traits::{IdentityFactory, Repository};
use stockbot_core::types::{CollectionBinding, Entity, Page, PaginationOptions};

use crate::client::StoreClient;
use crate::query::{Expr, Lambda, Pagination, Value};

/// Variable name bound to each index entry while mapping a page.
const PAGE_ENTRY: &str = "nextRef";

/// Repository storing `T` as documents of one collection.
///
/// Documents are written as `{ data: <entity> }` and read back from the
/// same `data` field. The repository keeps no state besides its binding.
pub struct DocumentRepository<T> {
    client: Arc<dyn StoreClient>,
    binding: CollectionBinding,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> DocumentRepository<T> {
    pub fn new(client: Arc<dyn StoreClient>, binding: CollectionBinding) -> Self {
        Self {
            client,
            binding,
            _entity: PhantomData,
        }
    }

    /// The collection/index pair this repository was built with.
    pub fn binding(&self) -> &CollectionBinding {
        &self.binding
    }

    fn collection(&self) -> Expr {
        Expr::collection(self.binding.collection())
    }

    fn document(&self, id: &str) -> Expr {
        Expr::reference(self.collection(), id)
    }

    /// Create the document if it is missing, replace it otherwise, and
    /// select the stored `data`.
    fn save_query(&self, id: &str, data: Expr) -> Expr {
        let params = Expr::object([("data", data)]);
        Expr::select(
            "data",
            Expr::if_then_else(
                Expr::exists(self.document(id)),
                Expr::replace(self.document(id), params.clone()),
                Expr::create(self.document(id), params),
            ),
        )
    }

    fn find_all_query(&self, options: &PaginationOptions) -> Expr {
        let mut page = Pagination::new(Expr::match_index(Expr::index(self.binding.index())));
        if let Some(size) = options.size {
            page = page.size(size);
        }
        if let Some(after) = &options.after {
            page = page.after(self.document(after));
        }
        if let Some(before) = &options.before {
            page = page.before(self.document(before));
        }
        Expr::map(
            page.into(),
            Lambda::new(
                PAGE_ENTRY,
                Expr::select("data", Expr::get(Expr::var(PAGE_ENTRY))),
            ),
        )
    }

    fn to_entity(value: &Value) -> AppResult<T> {
        value.decode()
    }

    fn to_page(value: &Value) -> AppResult<Page<T>> {
        let data = value
            .at("data")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AppError::serialization(format!(
                    "Page response has no data array (got {})",
                    value.type_name()
                ))
            })?
            .iter()
            .map(Self::to_entity)
            .collect::<AppResult<Vec<T>>>()?;

        Ok(Page::new(
            data,
            cursor_id(value.at("before")),
            cursor_id(value.at("after")),
        ))
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for DocumentRepository<T> {
    async fn save(&self, entity: &T) -> AppResult<T> {
        let id = entity.id();
        if id.is_empty() {
            return Err(AppError::validation(format!(
                "Cannot save into '{}' without an id",
                self.binding.collection()
            )));
        }
        debug!(collection = self.binding.collection(), id, "Saving document");

        let data = Expr::literal(serde_json::to_value(entity)?);
        let value = self.client.query(&self.save_query(id, data)).await?;
        Self::to_entity(&value)
    }

    async fn find(&self, id: &str) -> AppResult<Option<T>> {
        debug!(collection = self.binding.collection(), id, "Finding document");

        let query = Expr::select("data", Expr::get(self.document(id)));
        let value = into_optional(self.client.query(&query).await)?;
        value.as_ref().map(Self::to_entity).transpose()
    }

    async fn remove(&self, id: &str) -> AppResult<Option<T>> {
        debug!(collection = self.binding.collection(), id, "Removing document");

        let query = Expr::select("data", Expr::delete(self.document(id)));
        let value = into_optional(self.client.query(&query).await)?;
        value.as_ref().map(Self::to_entity).transpose()
    }

    async fn find_all(&self, options: &PaginationOptions) -> AppResult<Page<T>> {
        options.validate()?;
        debug!(
            index = self.binding.index(),
            size = ?options.size,
            after = ?options.after,
            before = ?options.before,
            "Listing documents"
        );

        let value = self.client.query(&self.find_all_query(options)).await?;
        Self::to_page(&value)
    }
}

#[async_trait]
impl<T: Entity> IdentityFactory for DocumentRepository<T> {
    async fn next_id(&self) -> AppResult<String> {
        let value = self.client.query(&Expr::new_id()).await?;
        match value {
            Value::String(id) => Ok(id),
            other => Err(AppError::serialization(format!(
                "NewId returned {} instead of a string",
                other.type_name()
            ))),
        }
    }
}

impl<T> Clone for DocumentRepository<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            binding: self.binding.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for DocumentRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRepository")
            .field("entity", &std::any::type_name::<T>())
            .field("binding", &self.binding)
            .field("client", &self.client.provider_type())
            .finish()
    }
}

/// Turn the store's not-found signal into `None`; pass everything else on.
fn into_optional<V>(result: AppResult<V>) -> AppResult<Option<V>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Cursors arrive as an array holding one ref; a bare ref or id string is
/// accepted too. Anything else means there is no neighbouring page.
fn cursor_id(cursor: Option<&Value>) -> Option<String> {
    match cursor? {
        Value::Array(items) => items.first().and_then(|item| cursor_id(Some(item))),
        Value::Ref(reference) => Some(reference.id.clone()),
        Value::String(id) => Some(id.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::query::RefV;
    use stockbot_core::error::ErrorKind;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    impl Entity for Note {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn repository() -> DocumentRepository<Note> {
        let store = crate::client::MemoryStore::new().with_collection("notes", "all_notes");
        DocumentRepository::new(Arc::new(store), CollectionBinding::new("notes", "all_notes"))
    }

    #[test]
    fn test_save_query_shape() {
        let repo = repository();
        let wire = repo.save_query("1", Expr::literal(json!({ "id": "1" }))).to_wire();
        assert_eq!(wire["select"], json!("data"));
        assert_eq!(
            wire["from"]["if"],
            json!({ "exists": { "ref": { "collection": "notes" }, "id": "1" } })
        );
    }

    #[test]
    fn test_find_all_query_uses_index_and_cursors() {
        let repo = repository();
        let options = PaginationOptions::new().with_size(3).with_before("9");
        let wire = repo.find_all_query(&options).to_wire();
        let paginate = &wire["collection"];
        assert_eq!(paginate["paginate"], json!({ "match": { "index": "all_notes" } }));
        assert_eq!(paginate["size"], json!(3));
        assert_eq!(paginate["before"]["id"], json!("9"));
        assert!(paginate.get("after").is_none());
    }

    #[test]
    fn test_cursor_shapes() {
        let reference = Value::Ref(RefV::document("notes", "5"));
        assert_eq!(cursor_id(Some(&Value::Array(vec![reference.clone()]))), Some("5".to_string()));
        assert_eq!(cursor_id(Some(&reference)), Some("5".to_string()));
        assert_eq!(cursor_id(Some(&Value::Array(Vec::new()))), None);
        assert_eq!(cursor_id(Some(&Value::Null)), None);
        assert_eq!(cursor_id(None), None);
    }

    #[test]
    fn test_into_optional_only_swallows_not_found() {
        assert!(into_optional::<()>(Err(AppError::not_found("gone"))).expect("ok").is_none());
        let err = into_optional::<()>(Err(AppError::store("boom"))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Store);
    }

    #[tokio::test]
    async fn test_save_rejects_empty_id() {
        let note = Note {
            id: String::new(),
            body: "x".to_string(),
        };
        let err = repository().save(&note).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_save_replaces_existing_document() {
        let repo = repository();
        let mut note = Note {
            id: "1".to_string(),
            body: "first".to_string(),
        };
        repo.save(&note).await.expect("create");
        note.body = "second".to_string();
        let saved = repo.save(&note).await.expect("replace");

        assert_eq!(saved, note);
        assert_eq!(repo.find("1").await.expect("find"), Some(note));
    }

    #[tokio::test]
    async fn test_decode_failure_propagates() {
        let store = Arc::new(crate::client::MemoryStore::new().with_collection("notes", "all_notes"));
        let raw = Expr::create(
            Expr::reference(Expr::collection("notes"), "bad"),
            Expr::object([("data", Expr::literal(json!({ "id": "bad" })))]),
        );
        store.query(&raw).await.expect("raw create");

        let repo: DocumentRepository<Note> =
            DocumentRepository::new(store, CollectionBinding::new("notes", "all_notes"));
        let err = repo.find("bad").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }

    #[tokio::test]
    async fn test_debug_names_entity_and_binding() {
        let rendered = format!("{:?}", repository());
        assert!(rendered.contains("Note"));
        assert!(rendered.contains("all_notes"));
        assert!(rendered.contains("memory"));
    }
}
