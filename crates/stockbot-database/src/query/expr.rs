//! Query expressions and their JSON wire form.
//!
//! An [`Expr`] is a tree of store functions (`Get`, `Create`, `Paginate`,
//! ...) built in Rust and serialized into the JSON object syntax the store
//! evaluates. Literal JSON objects are escaped as `{"object": ...}` on the
//! way out so they can never be mistaken for a function call.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as Json, json};

/// A query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal JSON value.
    Literal(Json),
    /// An object whose fields are themselves expressions.
    Object(BTreeMap<String, Expr>),
    /// An array of expressions.
    Array(Vec<Expr>),
    /// Reference to one document of a collection.
    Ref { collection: Box<Expr>, id: Box<Expr> },
    /// Reference to a collection.
    Collection(String),
    /// Reference to an index.
    Index(String),
    Get(Box<Expr>),
    Exists(Box<Expr>),
    Create { reference: Box<Expr>, params: Box<Expr> },
    Replace { reference: Box<Expr>, params: Box<Expr> },
    Delete(Box<Expr>),
    /// Extract the value at `path` from the result of `from`.
    Select { path: Vec<String>, from: Box<Expr> },
    If {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// The set of refs covered by an index.
    Match(Box<Expr>),
    Paginate(Pagination),
    /// Apply `lambda` to every element of `collection` (arrays and pages).
    Map { collection: Box<Expr>, lambda: Lambda },
    /// A variable bound by an enclosing [`Lambda`].
    Var(String),
    /// A fresh, store-unique document identifier.
    NewId,
}

impl Expr {
    pub fn literal(value: impl Into<Json>) -> Self {
        Self::Literal(value.into())
    }

    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Expr)>,
    {
        Self::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn collection(name: impl Into<String>) -> Self {
        Self::Collection(name.into())
    }

    pub fn index(name: impl Into<String>) -> Self {
        Self::Index(name.into())
    }

    pub fn reference(collection: Expr, id: impl Into<Expr>) -> Self {
        Self::Ref {
            collection: Box::new(collection),
            id: Box::new(id.into()),
        }
    }

    pub fn get(reference: Expr) -> Self {
        Self::Get(Box::new(reference))
    }

    pub fn exists(reference: Expr) -> Self {
        Self::Exists(Box::new(reference))
    }

    pub fn create(reference: Expr, params: Expr) -> Self {
        Self::Create {
            reference: Box::new(reference),
            params: Box::new(params),
        }
    }

    pub fn replace(reference: Expr, params: Expr) -> Self {
        Self::Replace {
            reference: Box::new(reference),
            params: Box::new(params),
        }
    }

    pub fn delete(reference: Expr) -> Self {
        Self::Delete(Box::new(reference))
    }

    /// Select a single top-level field.
    pub fn select(field: impl Into<String>, from: Expr) -> Self {
        Self::Select {
            path: vec![field.into()],
            from: Box::new(from),
        }
    }

    pub fn select_path<I, S>(path: I, from: Expr) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Select {
            path: path.into_iter().map(Into::into).collect(),
            from: Box::new(from),
        }
    }

    pub fn if_then_else(condition: Expr, then: Expr, otherwise: Expr) -> Self {
        Self::If {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn match_index(index: Expr) -> Self {
        Self::Match(Box::new(index))
    }

    pub fn map(collection: Expr, lambda: Lambda) -> Self {
        Self::Map {
            collection: Box::new(collection),
            lambda,
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn new_id() -> Self {
        Self::NewId
    }

    /// Render the expression in the store's JSON query syntax.
    pub fn to_wire(&self) -> Json {
        match self {
            Self::Literal(value) => escape_literal(value),
            Self::Object(fields) => {
                let fields: Map<String, Json> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect();
                json!({ "object": fields })
            }
            Self::Array(items) => Json::Array(items.iter().map(Expr::to_wire).collect()),
            Self::Ref { collection, id } => {
                json!({ "ref": collection.to_wire(), "id": id.to_wire() })
            }
            Self::Collection(name) => json!({ "collection": name }),
            Self::Index(name) => json!({ "index": name }),
            Self::Get(reference) => json!({ "get": reference.to_wire() }),
            Self::Exists(reference) => json!({ "exists": reference.to_wire() }),
            Self::Create { reference, params } => {
                json!({ "create": reference.to_wire(), "params": params.to_wire() })
            }
            Self::Replace { reference, params } => {
                json!({ "replace": reference.to_wire(), "params": params.to_wire() })
            }
            Self::Delete(reference) => json!({ "delete": reference.to_wire() }),
            Self::Select { path, from } => {
                let path = match path.as_slice() {
                    [single] => json!(single),
                    many => json!(many),
                };
                json!({ "select": path, "from": from.to_wire() })
            }
            Self::If {
                condition,
                then,
                otherwise,
            } => json!({
                "if": condition.to_wire(),
                "then": then.to_wire(),
                "else": otherwise.to_wire(),
            }),
            Self::Match(index) => json!({ "match": index.to_wire() }),
            Self::Paginate(pagination) => pagination.to_wire(),
            Self::Map { collection, lambda } => json!({
                "map": { "lambda": lambda.param, "expr": lambda.body.to_wire() },
                "collection": collection.to_wire(),
            }),
            Self::Var(name) => json!({ "var": name }),
            Self::NewId => json!({ "new_id": null }),
        }
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::Literal(Json::String(value.to_string()))
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Literal(Json::String(value))
    }
}

impl From<Pagination> for Expr {
    fn from(pagination: Pagination) -> Self {
        Self::Paginate(pagination)
    }
}

/// A one-parameter function used by [`Expr::Map`].
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub param: String,
    pub body: Box<Expr>,
}

impl Lambda {
    pub fn new(param: impl Into<String>, body: Expr) -> Self {
        Self {
            param: param.into(),
            body: Box::new(body),
        }
    }
}

/// A `Paginate` call under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    pub set: Box<Expr>,
    pub size: Option<u32>,
    pub after: Option<Box<Expr>>,
    pub before: Option<Box<Expr>>,
}

impl Pagination {
    pub fn new(set: Expr) -> Self {
        Self {
            set: Box::new(set),
            size: None,
            after: None,
            before: None,
        }
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn after(mut self, cursor: Expr) -> Self {
        self.after = Some(Box::new(cursor));
        self
    }

    pub fn before(mut self, cursor: Expr) -> Self {
        self.before = Some(Box::new(cursor));
        self
    }

    fn to_wire(&self) -> Json {
        let mut call = Map::new();
        call.insert("paginate".to_string(), self.set.to_wire());
        if let Some(size) = self.size {
            call.insert("size".to_string(), json!(size));
        }
        if let Some(after) = &self.after {
            call.insert("after".to_string(), after.to_wire());
        }
        if let Some(before) = &self.before {
            call.insert("before".to_string(), before.to_wire());
        }
        Json::Object(call)
    }
}

fn escape_literal(value: &Json) -> Json {
    match value {
        Json::Object(fields) => {
            let fields: Map<String, Json> = fields
                .iter()
                .map(|(k, v)| (k.clone(), escape_literal(v)))
                .collect();
            json!({ "object": fields })
        }
        Json::Array(items) => Json::Array(items.iter().map(escape_literal).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo_ref(id: &str) -> Expr {
        Expr::reference(Expr::collection("todos"), id)
    }

    #[test]
    fn test_get_by_ref_wire_form() {
        let expr = Expr::select("data", Expr::get(todo_ref("101")));
        assert_eq!(
            expr.to_wire(),
            json!({
                "select": "data",
                "from": { "get": { "ref": { "collection": "todos" }, "id": "101" } }
            })
        );
    }

    #[test]
    fn test_literal_objects_are_escaped() {
        let expr = Expr::literal(json!({ "text": "x", "tags": [{ "k": 1 }] }));
        assert_eq!(
            expr.to_wire(),
            json!({ "object": { "text": "x", "tags": [{ "object": { "k": 1 } }] } })
        );
    }

    #[test]
    fn test_upsert_wire_form() {
        let params = Expr::object([("data", Expr::literal(json!({ "id": "1" })))]);
        let expr = Expr::if_then_else(
            Expr::exists(todo_ref("1")),
            Expr::replace(todo_ref("1"), params.clone()),
            Expr::create(todo_ref("1"), params),
        );
        let wire = expr.to_wire();
        assert_eq!(wire["if"], json!({ "exists": { "ref": { "collection": "todos" }, "id": "1" } }));
        assert_eq!(
            wire["then"]["params"],
            json!({ "object": { "data": { "object": { "id": "1" } } } })
        );
        assert!(wire["else"].get("create").is_some());
    }

    #[test]
    fn test_paginate_with_map_wire_form() {
        let page = Pagination::new(Expr::match_index(Expr::index("all_todos")))
            .size(2)
            .after(todo_ref("5"));
        let expr = Expr::map(
            page.into(),
            Lambda::new("nextRef", Expr::select("data", Expr::get(Expr::var("nextRef")))),
        );

        let wire = expr.to_wire();
        assert_eq!(wire["map"]["lambda"], json!("nextRef"));
        assert_eq!(
            wire["map"]["expr"],
            json!({ "select": "data", "from": { "get": { "var": "nextRef" } } })
        );
        assert_eq!(
            wire["collection"],
            json!({
                "paginate": { "match": { "index": "all_todos" } },
                "size": 2,
                "after": { "ref": { "collection": "todos" }, "id": "5" }
            })
        );
        assert!(wire["collection"].get("before").is_none());
    }

    #[test]
    fn test_multi_segment_select_and_new_id() {
        let expr = Expr::select_path(["data", "text"], Expr::get(todo_ref("1")));
        assert_eq!(expr.to_wire()["select"], json!(["data", "text"]));
        assert_eq!(Expr::new_id().to_wire(), json!({ "new_id": null }));
        assert_eq!(serde_json::to_value(Expr::new_id()).expect("serialize"), json!({ "new_id": null }));
    }
}
