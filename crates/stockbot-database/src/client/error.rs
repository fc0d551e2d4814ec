//! Errors reported by the store for a single query.

use serde::Deserialize;
use serde_json::Value as Json;
use thiserror::Error;

use stockbot_core::error::{AppError, ErrorKind};

/// Error codes the store uses in its `errors` array.
pub mod codes {
    pub const INSTANCE_NOT_FOUND: &str = "instance not found";
    pub const VALUE_NOT_FOUND: &str = "value not found";
    pub const INSTANCE_ALREADY_EXISTS: &str = "instance already exists";
    pub const INVALID_REF: &str = "invalid ref";
    pub const INVALID_ARGUMENT: &str = "invalid argument";
    pub const INVALID_EXPRESSION: &str = "invalid expression";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const PERMISSION_DENIED: &str = "permission denied";
    pub const UNEXPECTED_RESPONSE: &str = "unexpected response";
}

/// A query the store evaluated and rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code} (HTTP {status}): {description}")]
pub struct QueryError {
    /// HTTP status the store answered with.
    pub status: u16,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable description.
    pub description: String,
    /// Path to the failing sub-expression.
    pub position: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireErrors {
    errors: Vec<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    code: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    position: Vec<Json>,
}

impl QueryError {
    pub fn new(status: u16, code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            description: description.into(),
            position: Vec::new(),
        }
    }

    pub fn instance_not_found(description: impl Into<String>) -> Self {
        Self::new(404, codes::INSTANCE_NOT_FOUND, description)
    }

    pub fn value_not_found(description: impl Into<String>) -> Self {
        Self::new(404, codes::VALUE_NOT_FOUND, description)
    }

    pub fn already_exists(description: impl Into<String>) -> Self {
        Self::new(400, codes::INSTANCE_ALREADY_EXISTS, description)
    }

    pub fn invalid_ref(description: impl Into<String>) -> Self {
        Self::new(400, codes::INVALID_REF, description)
    }

    pub fn invalid_argument(description: impl Into<String>) -> Self {
        Self::new(400, codes::INVALID_ARGUMENT, description)
    }

    pub fn invalid_expression(description: impl Into<String>) -> Self {
        Self::new(400, codes::INVALID_EXPRESSION, description)
    }

    /// Build from an error response body. Bodies that are not the store's
    /// `{"errors": [...]}` shape are kept verbatim in the description.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<WireErrors>(body) {
            Ok(parsed) if !parsed.errors.is_empty() => {
                let first = &parsed.errors[0];
                Self {
                    status,
                    code: first.code.clone(),
                    description: first.description.clone(),
                    position: first
                        .position
                        .iter()
                        .map(|p| match p {
                            Json::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect(),
                }
            }
            _ => Self::new(status, codes::UNEXPECTED_RESPONSE, body.trim()),
        }
    }

    /// Category this error maps to at the application boundary.
    pub fn kind(&self) -> ErrorKind {
        match (self.status, self.code.as_str()) {
            // A 404 that is not a store error body came from something else
            // on the path, such as a wrong endpoint or a proxy.
            (_, codes::INSTANCE_NOT_FOUND | codes::VALUE_NOT_FOUND) => ErrorKind::NotFound,
            (404, code) if code != codes::UNEXPECTED_RESPONSE => ErrorKind::NotFound,
            (401, _) | (_, codes::UNAUTHORIZED) => ErrorKind::Authentication,
            (403, _) | (_, codes::PERMISSION_DENIED) => ErrorKind::Authorization,
            (409, _) | (_, codes::INSTANCE_ALREADY_EXISTS) => ErrorKind::Conflict,
            (429 | 502 | 503 | 504, _) => ErrorKind::ServiceUnavailable,
            _ => ErrorKind::Store,
        }
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        let kind = err.kind();
        AppError::with_source(kind, format!("Store query failed: {err}"), err)
    }
}
