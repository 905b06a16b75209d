// 🏦 Aggregator Client - transaction provider trait and Plaid HTTP client
// PlaidClient posts to {base_url}/transactions/get

use crate::config::AggregatorConfig;
use crate::error::ProviderError;
use crate::models::ResolvedRange;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Payload of `POST /transactions/get`
#[derive(Clone, Serialize)]
pub struct TransactionsGetRequest {
    pub client_id: String,
    pub secret: String,
    pub access_token: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl TransactionsGetRequest {
    pub fn new(config: &AggregatorConfig, range: &ResolvedRange) -> Self {
        TransactionsGetRequest {
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
            access_token: config.access_token.clone(),
            start_date: range.start,
            end_date: range.end,
        }
    }

    /// Loggable form of the payload with credentials masked
    pub fn redacted(&self) -> Value {
        json!({
            "client_id": self.client_id,
            "secret": "<redacted>",
            "access_token": "<redacted>",
            "start_date": self.start_date,
            "end_date": self.end_date,
        })
    }
}

impl fmt::Debug for TransactionsGetRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted())
    }
}

/// An answer the aggregator actually gave
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse {
    /// 2xx with a JSON body
    Success(Value),
    /// Non-2xx with a JSON error body
    Failure {
        status: u16,
        error_code: Option<String>,
        body: Value,
    },
}

impl ProviderResponse {
    /// Classify a raw HTTP answer. Bodies that are not JSON are malformed.
    pub fn from_http(status: u16, body: &str) -> Result<Self, ProviderError> {
        let body: Value = serde_json::from_str(body)
            .map_err(|e| ProviderError::Malformed(format!("HTTP {}: {}", status, e)))?;

        if (200..300).contains(&status) {
            return Ok(ProviderResponse::Success(body));
        }

        let error_code = body
            .get("error_code")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(ProviderResponse::Failure { status, error_code, body })
    }
}

#[async_trait]
pub trait TransactionProvider: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &str;

    /// Issue one `transactions/get` call.
    ///
    /// `Err` means the call could not be completed; an error answered by the
    /// aggregator is `Ok(ProviderResponse::Failure { .. })`.
    async fn get_transactions(&self, request: &TransactionsGetRequest) -> Result<ProviderResponse, ProviderError>;
}

/// Plaid HTTP client; the inner connection pool is shared across requests
#[derive(Clone)]
pub struct PlaidClient {
    client: reqwest::Client,
    base_url: String,
}

impl PlaidClient {
    pub fn new(config: &AggregatorConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(PlaidClient {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}/transactions/get", self.base_url)
    }
}

#[async_trait]
impl TransactionProvider for PlaidClient {
    fn name(&self) -> &str {
        "plaid"
    }

    async fn get_transactions(&self, request: &TransactionsGetRequest) -> Result<ProviderResponse, ProviderError> {
        let url = self.url();
        debug!(%url, "POST transactions/get");

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        ProviderResponse::from_http(status, &body)
    }
}
