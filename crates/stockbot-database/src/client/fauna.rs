//! HTTP client for the hosted Fauna query endpoint.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value as Json;
use tracing::{debug, info, warn};

use stockbot_core::config::FaunaConfig;
use stockbot_core::config::store::mask_secret;
use stockbot_core::error::{AppError, AppResult, ErrorKind};

use super::error::QueryError;
use super::StoreClient;
use crate::query::{Expr, Value};

const API_VERSION: &str = "4";

/// Store client speaking the FQL v4 JSON protocol over HTTPS.
///
/// One instance is created at startup and shared by every repository;
/// the inner `reqwest::Client` pools connections.
#[derive(Clone)]
pub struct FaunaClient {
    http: reqwest::Client,
    endpoint: String,
    secret: String,
}

impl FaunaClient {
    /// Build a client from configuration. No request is made.
    pub fn new(config: &FaunaConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-FaunaDB-API-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(timeout_ms) = config.query_timeout_ms {
            headers.insert("X-Query-Timeout", HeaderValue::from(timeout_ms));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .user_agent(concat!("stockbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to build HTTP client: {e}"),
                    e,
                )
            })?;

        let endpoint = format!("{}/", config.endpoint.trim_end_matches('/'));

        info!(
            endpoint = %endpoint,
            secret = %mask_secret(&config.secret),
            timeout_seconds = config.timeout_seconds,
            "Configured Fauna store client"
        );

        Ok(Self {
            http,
            endpoint,
            secret: config.secret.clone(),
        })
    }

    /// The URL queries are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for FaunaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaunaClient")
            .field("endpoint", &self.endpoint)
            .field("secret", &mask_secret(&self.secret))
            .finish()
    }
}

#[async_trait]
impl StoreClient for FaunaClient {
    fn provider_type(&self) -> &str {
        "fauna"
    }

    async fn query(&self, expr: &Expr) -> AppResult<Value> {
        let started = Instant::now();

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.secret)
            .json(expr)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::ServiceUnavailable,
                    format!("Store request failed: {e}"),
                    e,
                )
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ServiceUnavailable,
                format!("Failed to read store response: {e}"),
                e,
            )
        })?;

        debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Store query completed"
        );

        if !status.is_success() {
            let err = QueryError::from_response(status.as_u16(), &body);
            if err.kind() != ErrorKind::NotFound {
                warn!(status = err.status, code = %err.code, "Store rejected query: {}", err.description);
            }
            return Err(err.into());
        }

        let json: Json = serde_json::from_str(&body)?;
        let resource = json.get("resource").ok_or_else(|| {
            AppError::serialization(format!("Store response has no 'resource' field: {body}"))
        })?;
        Value::from_wire(resource)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let value = self.query(&Expr::literal(true)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}
