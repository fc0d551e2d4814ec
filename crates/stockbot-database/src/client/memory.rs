//! In-process store that evaluates the same expressions as the hosted one.
//!
//! Used for local development (`store.provider = "memory"`) and tests.
//! Documents live in per-collection `BTreeMap`s keyed by id, so index
//! listings come back ordered by id. Every query runs under one lock,
//! which gives the per-request atomicity the hosted store provides.
//!
//! Unlike the hosted store, document ids are not required to be numeric:
//! any non-empty string is accepted. Ids that work here may be rejected
//! with `invalid argument` by Fauna.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Number;
use tokio::sync::Mutex;
use tracing::debug;

use stockbot_core::config::MemoryStoreConfig;
use stockbot_core::error::AppResult;

use super::StoreClient;
use super::error::QueryError;
use crate::query::{Expr, Lambda, Pagination, RefV, Value};

/// Page size used when a `Paginate` call does not give one.
pub const DEFAULT_PAGE_SIZE: u32 = 64;

/// In-memory document store.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    next_id: AtomicU64,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, BTreeMap<String, StoredDocument>>,
    /// Index name to source collection.
    indexes: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    data: Value,
    ts: i64,
}

impl MemoryStore {
    /// An empty store with no collections.
    pub fn new() -> Self {
        // Ids are numeric strings of constant width, so string order
        // matches issue order.
        let seed = (Utc::now().timestamp_micros().max(0) as u64).saturating_mul(100);
        Self {
            state: Mutex::new(State::default()),
            next_id: AtomicU64::new(seed),
        }
    }

    /// A store with the collections listed in configuration.
    pub fn from_config(config: &MemoryStoreConfig) -> Self {
        config
            .collections
            .iter()
            .fold(Self::new(), |store, schema| {
                store.with_collection(&schema.name, &schema.index)
            })
    }

    /// Declare a collection and the index that lists it.
    pub fn with_collection(mut self, name: &str, index: &str) -> Self {
        let state = self.state.get_mut();
        state.collections.entry(name.to_string()).or_default();
        state.indexes.insert(index.to_string(), name.to_string());
        self
    }

    /// Number of documents currently stored in `collection`.
    pub async fn document_count(&self, collection: &str) -> usize {
        let state = self.state.lock().await;
        state.collections.get(collection).map_or(0, BTreeMap::len)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn query(&self, expr: &Expr) -> AppResult<Value> {
        let mut state = self.state.lock().await;
        let mut evaluator = Evaluator {
            state: &mut state,
            next_id: &self.next_id,
            scope: Vec::new(),
            now: Utc::now().timestamp_micros(),
        };
        let result = evaluator.eval(expr);
        if let Err(err) = &result {
            debug!(code = %err.code, "Memory store rejected query: {}", err.description);
        }
        Ok(result?)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

type EvalResult<T> = Result<T, QueryError>;

struct Evaluator<'a> {
    state: &'a mut State,
    next_id: &'a AtomicU64,
    scope: Vec<(String, Value)>,
    now: i64,
}

impl Evaluator<'_> {
    fn eval(&mut self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Literal(json) => Ok(Value::from_plain(json)),
            Expr::Object(fields) => fields
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.eval(v)?)))
                .collect::<EvalResult<BTreeMap<_, _>>>()
                .map(Value::Object),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::Array),
            Expr::Collection(name) => Ok(RefV::collection(name.as_str()).into()),
            Expr::Index(name) => Ok(RefV::index(name.as_str()).into()),
            Expr::Ref { collection, id } => {
                let collection = self.eval_ref(collection)?;
                if collection.collection_name() != Some("collections") {
                    return Err(QueryError::invalid_argument(format!(
                        "Ref expects a collection, got '{}'",
                        collection.id
                    )));
                }
                let id = self.eval_string(id)?;
                Ok(RefV::document(collection.id, id).into())
            }
            Expr::Get(reference) => {
                let reference = self.eval_ref(reference)?;
                let (collection, id) = self.document_ref(&reference)?;
                let documents = self.collection(collection)?;
                documents
                    .get(id)
                    .map(|doc| document_value(&reference, doc))
                    .ok_or_else(|| missing_document(&reference))
            }
            Expr::Exists(reference) => {
                let reference = self.eval_ref(reference)?;
                let (collection, id) = self.document_ref(&reference)?;
                Ok(Value::Bool(self.collection(collection)?.contains_key(id)))
            }
            Expr::Create { reference, params } => {
                let reference = self.eval_ref(reference)?;
                let data = self.eval_params(params)?;
                let (collection, id) = self.document_ref(&reference)?;
                let now = self.now;
                let documents = self.collection_mut(collection)?;
                if documents.contains_key(id) {
                    return Err(QueryError::already_exists(format!(
                        "Document '{}/{}' already exists",
                        collection, id
                    )));
                }
                let doc = StoredDocument { data, ts: now };
                documents.insert(id.to_string(), doc.clone());
                Ok(document_value(&reference, &doc))
            }
            Expr::Replace { reference, params } => {
                let reference = self.eval_ref(reference)?;
                let data = self.eval_params(params)?;
                let (collection, id) = self.document_ref(&reference)?;
                let now = self.now;
                let documents = self.collection_mut(collection)?;
                let doc = documents
                    .get_mut(id)
                    .ok_or_else(|| missing_document(&reference))?;
                doc.data = data;
                doc.ts = now;
                Ok(document_value(&reference, doc))
            }
            Expr::Delete(reference) => {
                let reference = self.eval_ref(reference)?;
                let (collection, id) = self.document_ref(&reference)?;
                let removed = self
                    .collection_mut(collection)?
                    .remove(id)
                    .ok_or_else(|| missing_document(&reference))?;
                Ok(document_value(&reference, &removed))
            }
            Expr::Select { path, from } => {
                let from = self.eval(from)?;
                select(&from, path).cloned()
            }
            Expr::If {
                condition,
                then,
                otherwise,
            } => match self.eval(condition)? {
                Value::Bool(true) => self.eval(then),
                Value::Bool(false) => self.eval(otherwise),
                other => Err(QueryError::invalid_argument(format!(
                    "If condition must be a boolean, got {}",
                    other.type_name()
                ))),
            },
            Expr::Match(_) => Err(QueryError::invalid_argument(
                "Sets can only be read through Paginate",
            )),
            Expr::Paginate(pagination) => self.paginate(pagination),
            Expr::Map { collection, lambda } => {
                let collection = self.eval(collection)?;
                self.map(collection, lambda)
            }
            Expr::Var(name) => self
                .scope
                .iter()
                .rev()
                .find(|(bound, _)| bound == name)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| {
                    QueryError::invalid_expression(format!("Variable '{name}' is not defined"))
                }),
            Expr::NewId => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                Ok(Value::String(id.to_string()))
            }
        }
    }

    fn eval_ref(&mut self, expr: &Expr) -> EvalResult<RefV> {
        match self.eval(expr)? {
            Value::Ref(reference) => Ok(reference),
            other => Err(QueryError::invalid_argument(format!(
                "Expected a ref, got {}",
                other.type_name()
            ))),
        }
    }

    fn eval_string(&mut self, expr: &Expr) -> EvalResult<String> {
        match self.eval(expr)? {
            Value::String(s) if !s.is_empty() => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(QueryError::invalid_argument(format!(
                "Expected a non-empty id, got {}",
                other.type_name()
            ))),
        }
    }

    /// Evaluate `Create`/`Replace` params and return their `data` field.
    fn eval_params(&mut self, params: &Expr) -> EvalResult<Value> {
        match self.eval(params)? {
            Value::Object(mut fields) => Ok(fields
                .remove("data")
                .unwrap_or_else(|| Value::Object(BTreeMap::new()))),
            other => Err(QueryError::invalid_argument(format!(
                "Params must be an object, got {}",
                other.type_name()
            ))),
        }
    }

    fn document_ref<'r>(&self, reference: &'r RefV) -> EvalResult<(&'r str, &'r str)> {
        match reference.collection.as_deref() {
            Some(parent) if parent.collection_name() == Some("collections") => {
                Ok((parent.id.as_str(), reference.id.as_str()))
            }
            _ => Err(QueryError::invalid_argument(format!(
                "'{}' is not a document ref",
                reference.id
            ))),
        }
    }

    fn collection(&self, name: &str) -> EvalResult<&BTreeMap<String, StoredDocument>> {
        self.state
            .collections
            .get(name)
            .ok_or_else(|| QueryError::invalid_ref(format!("Collection '{name}' does not exist")))
    }

    fn collection_mut(&mut self, name: &str) -> EvalResult<&mut BTreeMap<String, StoredDocument>> {
        self.state
            .collections
            .get_mut(name)
            .ok_or_else(|| QueryError::invalid_ref(format!("Collection '{name}' does not exist")))
    }

    fn paginate(&mut self, pagination: &Pagination) -> EvalResult<Value> {
        let Expr::Match(index) = pagination.set.as_ref() else {
            return Err(QueryError::invalid_argument(
                "Paginate expects a Match over an index",
            ));
        };
        let index = self.eval_ref(index)?;
        if index.collection_name() != Some("indexes") {
            return Err(QueryError::invalid_argument(format!(
                "Match expects an index, got '{}'",
                index.id
            )));
        }
        let source = self
            .state
            .indexes
            .get(&index.id)
            .cloned()
            .ok_or_else(|| QueryError::invalid_ref(format!("Index '{}' does not exist", index.id)))?;

        let size = pagination.size.unwrap_or(DEFAULT_PAGE_SIZE);
        if size == 0 {
            return Err(QueryError::invalid_argument("Page size must be positive"));
        }
        let after = pagination
            .after
            .as_deref()
            .map(|cursor| self.eval_cursor(cursor))
            .transpose()?;
        let before = pagination
            .before
            .as_deref()
            .map(|cursor| self.eval_cursor(cursor))
            .transpose()?;

        let ids: Vec<&String> = self.collection(&source)?.keys().collect();
        let size = size as usize;

        // `after` is inclusive, `before` exclusive; `after` wins when both are set.
        let (start, end) = match (&after, &before) {
            (Some(after), _) => {
                let start = ids.partition_point(|id| id.as_str() < after.as_str());
                (start, (start + size).min(ids.len()))
            }
            (None, Some(before)) => {
                let end = ids.partition_point(|id| id.as_str() < before.as_str());
                (end.saturating_sub(size), end)
            }
            (None, None) => (0, size.min(ids.len())),
        };

        let cursor = |id: &str| Value::Array(vec![RefV::document(source.as_str(), id).into()]);

        let mut page = BTreeMap::new();
        page.insert(
            "data".to_string(),
            Value::Array(
                ids[start..end]
                    .iter()
                    .map(|id| RefV::document(source.as_str(), id.as_str()).into())
                    .collect(),
            ),
        );
        if start > 0 {
            // Past the last id the requested cursor itself points back.
            let first = ids
                .get(start)
                .map(|id| id.as_str())
                .or(after.as_deref())
                .unwrap_or_default();
            page.insert("before".to_string(), cursor(first));
        }
        if end < ids.len() {
            page.insert("after".to_string(), cursor(ids[end].as_str()));
        }
        Ok(Value::Object(page))
    }

    /// Cursors may be a ref, an array holding a ref, or a bare id.
    fn eval_cursor(&mut self, cursor: &Expr) -> EvalResult<String> {
        match self.eval(cursor)? {
            Value::Ref(reference) => Ok(reference.id),
            Value::String(id) => Ok(id),
            Value::Array(items) => match items.into_iter().next() {
                Some(Value::Ref(reference)) => Ok(reference.id),
                Some(Value::String(id)) => Ok(id),
                _ => Err(QueryError::invalid_argument("Cursor array must start with a ref")),
            },
            other => Err(QueryError::invalid_argument(format!(
                "Invalid cursor of type {}",
                other.type_name()
            ))),
        }
    }

    fn map(&mut self, collection: Value, lambda: &Lambda) -> EvalResult<Value> {
        match collection {
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.apply(lambda, item))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::Array),
            Value::Object(mut page) => {
                let Some(Value::Array(items)) = page.remove("data") else {
                    return Err(QueryError::invalid_argument(
                        "Map expects an array or a page",
                    ));
                };
                let mapped = self.map(Value::Array(items), lambda)?;
                page.insert("data".to_string(), mapped);
                Ok(Value::Object(page))
            }
            other => Err(QueryError::invalid_argument(format!(
                "Map expects an array or a page, got {}",
                other.type_name()
            ))),
        }
    }

    fn apply(&mut self, lambda: &Lambda, argument: Value) -> EvalResult<Value> {
        self.scope.push((lambda.param.clone(), argument));
        let result = self.eval(&lambda.body);
        self.scope.pop();
        result
    }
}

fn document_value(reference: &RefV, doc: &StoredDocument) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert("ref".to_string(), Value::Ref(reference.clone()));
    fields.insert("ts".to_string(), Value::Number(Number::from(doc.ts)));
    fields.insert("data".to_string(), doc.data.clone());
    Value::Object(fields)
}

fn missing_document(reference: &RefV) -> QueryError {
    QueryError::instance_not_found(format!(
        "Document '{}/{}' not found",
        reference.collection_name().unwrap_or_default(),
        reference.id
    ))
}

fn select<'v>(value: &'v Value, path: &[String]) -> EvalResult<&'v Value> {
    path.iter().try_fold(value, |current, segment| {
        let next = match current {
            Value::Object(fields) => fields.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        next.ok_or_else(|| {
            QueryError::value_not_found(format!("Value not found at path [{}]", path.join(", ")))
        })
    })
}
