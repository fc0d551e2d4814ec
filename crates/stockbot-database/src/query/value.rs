//! Values returned by the store.
//!
//! The store answers in JSON with a handful of tagged objects (`@ref`,
//! `@ts`, `@date`, `@bytes`, `@obj`) for types JSON has no syntax for.
//! [`Value::from_wire`] turns that into a typed tree; [`Value::decode`]
//! maps a subtree onto a serde type.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value as Json, json};

use stockbot_core::error::{AppError, AppResult};

/// A decoded store value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Ref(RefV),
    /// Timestamp in ISO-8601 form, as sent by the store.
    Time(String),
    /// Calendar date in `YYYY-MM-DD` form.
    Date(String),
    /// Base64-encoded bytes.
    Bytes(String),
}

/// A reference to a document, collection, or index.
///
/// `collection` is the reference's parent: documents point at their
/// collection, collections and indexes at the `collections`/`indexes`
/// schema refs, and those have no parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefV {
    pub id: String,
    pub collection: Option<Box<RefV>>,
}

impl RefV {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection: None,
        }
    }

    pub fn with_collection(mut self, collection: RefV) -> Self {
        self.collection = Some(Box::new(collection));
        self
    }

    /// Ref to a user collection, e.g. `Collection("todos")`.
    pub fn collection(name: impl Into<String>) -> Self {
        Self::new(name).with_collection(Self::new("collections"))
    }

    /// Ref to an index, e.g. `Index("all_todos")`.
    pub fn index(name: impl Into<String>) -> Self {
        Self::new(name).with_collection(Self::new("indexes"))
    }

    /// Ref to a document of the named collection.
    pub fn document(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(id).with_collection(Self::collection(collection))
    }

    /// Name of the parent collection, if any.
    pub fn collection_name(&self) -> Option<&str> {
        self.collection.as_deref().map(|c| c.id.as_str())
    }

    fn from_wire(inner: &Json) -> AppResult<Self> {
        let fields = inner
            .as_object()
            .ok_or_else(|| AppError::serialization(format!("Malformed @ref: {inner}")))?;
        let id = fields
            .get("id")
            .and_then(Json::as_str)
            .ok_or_else(|| AppError::serialization(format!("@ref without id: {inner}")))?;

        let collection = match fields.get("collection").or_else(|| fields.get("class")) {
            Some(parent) => {
                let parent = parent
                    .get("@ref")
                    .ok_or_else(|| AppError::serialization(format!("Malformed @ref parent: {parent}")))?;
                Some(Box::new(Self::from_wire(parent)?))
            }
            None => None,
        };

        Ok(Self {
            id: id.to_string(),
            collection,
        })
    }

    /// Render as the store's tagged `@ref` object.
    pub fn to_wire(&self) -> Json {
        let mut inner = Map::new();
        inner.insert("id".to_string(), json!(self.id));
        if let Some(parent) = &self.collection {
            inner.insert("collection".to_string(), parent.to_wire());
        }
        json!({ "@ref": inner })
    }
}

impl Value {
    /// Decode the store's tagged JSON.
    pub fn from_wire(json: &Json) -> AppResult<Self> {
        Ok(match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => Self::Number(n.clone()),
            Json::String(s) => Self::String(s.clone()),
            Json::Array(items) => Self::Array(
                items
                    .iter()
                    .map(Self::from_wire)
                    .collect::<AppResult<Vec<_>>>()?,
            ),
            Json::Object(fields) => {
                if fields.len() == 1 {
                    if let Some((tag, inner)) = fields.iter().next() {
                        match tag.as_str() {
                            "@ref" => return Ok(Self::Ref(RefV::from_wire(inner)?)),
                            "@ts" => return Ok(Self::Time(tagged_string(tag, inner)?)),
                            "@date" => return Ok(Self::Date(tagged_string(tag, inner)?)),
                            "@bytes" => return Ok(Self::Bytes(tagged_string(tag, inner)?)),
                            "@obj" => {
                                let escaped = inner.as_object().ok_or_else(|| {
                                    AppError::serialization(format!("Malformed @obj: {inner}"))
                                })?;
                                return Self::object_from_wire(escaped);
                            }
                            _ => {}
                        }
                    }
                }
                Self::object_from_wire(fields)?
            }
        })
    }

    fn object_from_wire(fields: &Map<String, Json>) -> AppResult<Self> {
        fields
            .iter()
            .map(|(k, v)| Ok((k.clone(), Self::from_wire(v)?)))
            .collect::<AppResult<BTreeMap<_, _>>>()
            .map(Self::Object)
    }

    /// Convert plain JSON without interpreting any `@` tags.
    pub fn from_plain(json: &Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => Self::Number(n.clone()),
            Json::String(s) => Self::String(s.clone()),
            Json::Array(items) => Self::Array(items.iter().map(Self::from_plain).collect()),
            Json::Object(fields) => Self::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_plain(v)))
                    .collect(),
            ),
        }
    }

    /// Render as tagged JSON, escaping objects whose keys could be read
    /// back as a tag.
    pub fn to_wire(&self) -> Json {
        match self {
            Self::Object(fields) => {
                let rendered: Map<String, Json> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect();
                if fields.keys().any(|k| k.starts_with('@')) {
                    json!({ "@obj": rendered })
                } else {
                    Json::Object(rendered)
                }
            }
            Self::Array(items) => Json::Array(items.iter().map(Value::to_wire).collect()),
            Self::Ref(reference) => reference.to_wire(),
            Self::Time(ts) => json!({ "@ts": ts }),
            Self::Date(date) => json!({ "@date": date }),
            Self::Bytes(bytes) => json!({ "@bytes": bytes }),
            other => other.to_json(),
        }
    }

    /// Render as plain JSON for serde decoding. Refs collapse to their id;
    /// times, dates, and bytes to their string form.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => Json::Number(n.clone()),
            Self::String(s) | Self::Time(s) | Self::Date(s) | Self::Bytes(s) => {
                Json::String(s.clone())
            }
            Self::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Self::Object(fields) => Json::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Ref(reference) => Json::String(reference.id.clone()),
        }
    }

    /// Decode this value into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_value(self.to_json()).map_err(AppError::from)
    }

    /// Field of an object value.
    pub fn at(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(fields) => fields.get(key),
            _ => None,
        }
    }

    /// Nested field lookup.
    pub fn at_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        path.iter()
            .try_fold(self, |value, key| value.at(key.as_ref()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&RefV> {
        match self {
            Self::Ref(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Ref(_) => "ref",
            Self::Time(_) => "time",
            Self::Date(_) => "date",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl From<RefV> for Value {
    fn from(reference: RefV) -> Self {
        Self::Ref(reference)
    }
}

fn tagged_string(tag: &str, inner: &Json) -> AppResult<String> {
    inner
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AppError::serialization(format!("Malformed {tag}: {inner}")))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use stockbot_core::error::ErrorKind;

    fn todo_ref_json(id: &str) -> Json {
        json!({
            "@ref": {
                "id": id,
                "collection": {
                    "@ref": { "id": "todos", "collection": { "@ref": { "id": "collections" } } }
                }
            }
        })
    }

    #[test]
    fn test_decodes_document_refs() {
        let value = Value::from_wire(&todo_ref_json("101")).expect("decode");
        let reference = value.as_reference().expect("ref");
        assert_eq!(reference, &RefV::document("todos", "101"));
        assert_eq!(reference.collection_name(), Some("todos"));
    }

    #[test]
    fn test_ref_round_trips_through_wire_form() {
        let reference = RefV::index("all_todos");
        let back = Value::from_wire(&reference.to_wire()).expect("decode");
        assert_eq!(back, Value::Ref(reference));
    }

    #[test]
    fn test_decodes_page_shape() {
        let page = json!({
            "before": [todo_ref_json("1")],
            "after": [todo_ref_json("3")],
            "data": [{ "id": "1", "text": "a" }, { "id": "2", "text": "b" }]
        });
        let value = Value::from_wire(&page).expect("decode");

        let after = value.at("after").and_then(Value::as_array).expect("after");
        assert_eq!(after[0].as_reference().map(|r| r.id.as_str()), Some("3"));
        assert_eq!(value.at_path(&["data"]).and_then(Value::as_array).map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_escaped_object_keeps_reserved_keys() {
        let value = Value::from_wire(&json!({ "@obj": { "@ref": "not a ref" } })).expect("decode");
        assert_eq!(value.at("@ref").and_then(Value::as_str), Some("not a ref"));
        assert_eq!(value.to_wire(), json!({ "@obj": { "@ref": "not a ref" } }));
    }

    #[test]
    fn test_scalar_tags() {
        let value = Value::from_wire(&json!({
            "ts": { "@ts": "2024-03-01T10:00:00Z" },
            "day": { "@date": "2024-03-01" }
        }))
        .expect("decode");
        assert_eq!(value.at("ts"), Some(&Value::Time("2024-03-01T10:00:00Z".to_string())));
        assert_eq!(value.at("day"), Some(&Value::Date("2024-03-01".to_string())));
    }

    #[test]
    fn test_malformed_ref_is_serialization_error() {
        let err = Value::from_wire(&json!({ "@ref": { "collection": null } })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
        count: u32,
    }

    #[test]
    fn test_decode_into_struct() {
        let value = Value::from_plain(&json!({ "id": "9", "count": 3 }));
        assert_eq!(
            value.decode::<Item>().expect("decode"),
            Item {
                id: "9".to_string(),
                count: 3
            }
        );

        let err = Value::from_plain(&json!({ "id": 9 })).decode::<Item>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }
}
