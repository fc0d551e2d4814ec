//! Application error type shared by every stockbot crate.
//!
//! Store clients, repositories, and the CLI all report failures as
//! [`AppError`]. The [`ErrorKind`] is what callers branch on; the boxed
//! source keeps the original cause intact.

use std::fmt;
use thiserror::Error;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The targeted document (or path inside it) does not exist.
    NotFound,
    /// Caller input was rejected before reaching the store.
    Validation,
    /// The store refused a write because the instance already exists.
    Conflict,
    /// The store rejected the access secret.
    Authentication,
    /// The secret is valid but lacks permission for the query.
    Authorization,
    /// Any other failure reported by the document store.
    Store,
    /// A value could not be encoded for, or decoded from, the store.
    Serialization,
    /// Configuration is missing or malformed.
    Configuration,
    /// The store could not be reached or asked us to back off.
    ServiceUnavailable,
    /// Bug or invariant violation inside stockbot itself.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::Conflict => "CONFLICT",
            Self::Authentication => "AUTHENTICATION",
            Self::Authorization => "AUTHORIZATION",
            Self::Store => "STORE",
            Self::Serialization => "SERIALIZATION",
            Self::Configuration => "CONFIGURATION",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::Internal => "INTERNAL",
        };
        f.write_str(name)
    }
}

/// The error returned by every fallible stockbot operation.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Underlying cause, when there is one.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create an error without an underlying cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create an error that wraps `source`.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Store, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error is the store's "does not exist" signal.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON conversion failed: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = AppError::not_found("Document 'todos/1' not found");
        assert_eq!(err.to_string(), "NOT_FOUND: Document 'todos/1' not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_with_source_preserves_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = AppError::with_source(ErrorKind::ServiceUnavailable, "store unreachable", cause);

        assert!(!err.is_not_found());
        let source = err.source().expect("source kept");
        assert_eq!(source.to_string(), "reset by peer");
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let json_err = serde_json::from_str::<u32>("\"nope\"").unwrap_err();
        let err: AppError = json_err.into();
        assert_eq!(err.kind, ErrorKind::Serialization);
        assert!(err.source().is_some());
    }
}
