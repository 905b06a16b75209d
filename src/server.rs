// 🌐 REST API with Axum
// Transaction fetch, chat-completion proxy and financial assistant endpoints

use crate::aggregator::PlaidClient;
use crate::assistant::{self, AssistantInput};
use crate::config::Config;
use crate::error::{LlmError, ValidationError};
use crate::fetcher::TransactionFetcher;
use crate::llm::{ChatCompletionRequest, ChatProvider, DeepSeekClient};
use crate::models::TransactionQuery;
use crate::service::TransactionService;
use anyhow::Context as _;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub transactions: Arc<TransactionService>,
    pub chat: Arc<dyn ChatProvider>,
}

impl AppState {
    pub fn new(transactions: TransactionService, chat: Arc<dyn ChatProvider>) -> Self {
        AppState {
            transactions: Arc::new(transactions),
            chat,
        }
    }

    /// Wire the real aggregator and LLM clients from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let plaid = PlaidClient::new(&config.aggregator, config.http_timeout)
            .context("Failed to build aggregator client")?;
        let fetcher = TransactionFetcher::new(Arc::new(plaid), config.aggregator.clone(), config.retry);

        let chat = DeepSeekClient::new(&config.llm, config.http_timeout).context("Failed to build LLM client")?;

        Ok(AppState::new(TransactionService::new(fetcher), Arc::new(chat)))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Client-facing failure, rendered as `{"detail": ...}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Body the extractor could not read; keeps the extractor's status
    Rejected(StatusCode, String),
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Rejected(status, detail) => (status, detail),
            ApiError::Upstream(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        ApiError::Upstream(format!("Error calling DeepSeek API: {}", e))
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET / - Liveness message
async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "DeepSeek API Proxy is running. Use /chat/completions endpoint for chat completions."
    }))
}

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

/// POST /fetchTransaction - Transactions for a date range, live or fallback
async fn fetch_transaction(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let query = parse_transaction_query(&body)?;
    info!(institution_id = query.institution_id(), "POST /fetchTransaction");

    let response = state.transactions.handle(&query).await?;
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Empty bodies are an empty query; anything else must be a JSON object
fn parse_transaction_query(body: &[u8]) -> Result<TransactionQuery, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TransactionQuery::default());
    }

    let not_an_object = || ApiError::BadRequest("request body must be a JSON object".to_string());

    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Unreadable /fetchTransaction body");
        not_an_object()
    })?;
    if !value.is_object() {
        warn!("Non-object /fetchTransaction body");
        return Err(not_an_object());
    }

    // Every field is raw JSON, so an object always deserializes
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "Unreadable /fetchTransaction body");
        not_an_object()
    })
}

/// POST /chat/completions - Proxy to the LLM provider
async fn chat_completions(
    State(state): State<AppState>,
    request: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = request.map_err(|rejection| {
        warn!(error = %rejection, "Unreadable /chat/completions body");
        ApiError::from(rejection)
    })?;

    if request.stream {
        return Err(ApiError::BadRequest("streaming responses are not supported".to_string()));
    }

    info!(model = %request.model, messages = request.messages.len(), "POST /chat/completions");

    let body = state.chat.complete(&request).await.map_err(|e| {
        error!(error = %e, "Chat completion failed");
        ApiError::from(e)
    })?;

    Ok(Json(body))
}

/// POST /financial-assistant - Suggestion from emotion + purchase history
async fn financial_assistant(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<assistant::AssistantResponse>, ApiError> {
    let input = AssistantInput::from_request(&body, &params);

    let response = assistant::suggest(state.chat.as_ref(), &input).await.map_err(|e| {
        error!(error = %e, "Financial assistant failed");
        ApiError::from(e)
    })?;

    Ok(Json(response))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/fetchTransaction", post(fetch_transaction))
        .route("/chat/completions", post(chat_completions))
        .route("/financial-assistant", post(financial_assistant))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::ProviderResponse;
    use crate::assistant::testing::CannedChat;
    use crate::error::ProviderError;
    use crate::fetcher::testing::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app_with(script: Vec<Result<ProviderResponse, ProviderError>>, chat: CannedChat) -> (Router, Timeline) {
        let (fetcher, timeline) = scripted_fetcher(script);
        let state = AppState::new(TransactionService::new(fetcher), Arc::new(chat));
        (router(state), timeline)
    }

    fn app(script: Vec<Result<ProviderResponse, ProviderError>>) -> (Router, Timeline) {
        app_with(script, CannedChat::replying("Take a walk first."))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_start_date_is_400() {
        let (app, timeline) = app(vec![]);

        let (status, body) = send(app, post_json("/fetchTransaction", r#"{"start_date": "not-a-date"}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"detail": "start_date must be a string of the format 'YYYY-MM-DD'"}));
        assert_eq!(timeline.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_end_date_is_400() {
        let (app, _) = app(vec![]);

        let (status, body) = send(app, post_json("/fetchTransaction", r#"{"end_date": 42}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "end_date must be a string of the format 'YYYY-MM-DD'");
    }

    #[tokio::test]
    async fn test_empty_body_is_200() {
        let (app, _) = app(vec![Err(ProviderError::Network("unreachable".to_string()))]);

        let request = Request::builder()
            .method("POST")
            .uri("/fetchTransaction")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transactions"].as_array().unwrap().len(), 5);
        assert_eq!(body["transactions"][0]["name"], "Starbucks");
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_error_marker() {
        let (app, timeline) = app(vec![not_ready(), not_ready(), not_ready()]);

        let (status, body) = send(app, post_json("/fetchTransaction", "{}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(timeline.calls(), 3);
        assert_eq!(
            body,
            json!({"transactions": [{"transaction_id": "1", "amount": 75.5, "name": "Error", "date": "2024-05-15"}]})
        );
    }

    #[tokio::test]
    async fn test_live_transactions_relayed() {
        let live = json!([{"transaction_id": "p1", "amount": 4.33, "name": "Bakery", "date": "2024-06-02"}]);
        let (app, _) = app(vec![Ok(ProviderResponse::Success(json!({"transactions": live.clone()})))]);

        let (status, body) = send(
            app,
            post_json("/fetchTransaction", r#"{"institution_id": "ins_1", "start_date": "2024-06-01", "end_date": "2024-06-30"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"transactions": live}));
    }

    #[tokio::test]
    async fn test_non_object_body_is_400() {
        let (app, _) = app(vec![]);

        let (status, body) = send(app, post_json("/fetchTransaction", "[1, 2]")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "request body must be a JSON object");
    }

    #[tokio::test]
    async fn test_non_string_institution_id_is_200() {
        let (app, timeline) = app(vec![Err(ProviderError::Network("unreachable".to_string()))]);

        let (status, body) = send(app, post_json("/fetchTransaction", r#"{"institution_id": 7}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(timeline.calls(), 1);
        assert_eq!(body["transactions"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_non_json_body_is_400() {
        let (app, timeline) = app(vec![]);

        let (status, body) = send(app, post_json("/fetchTransaction", "start_date=2024-01-01")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "request body must be a JSON object");
        assert_eq!(timeline.calls(), 0);
    }

    #[tokio::test]
    async fn test_chat_completions_proxied() {
        let (app, _) = app(vec![]);

        let (status, body) = send(
            app,
            post_json("/chat/completions", r#"{"messages": [{"role": "user", "content": "hello"}]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["choices"][0]["message"]["content"], "Take a walk first.");
    }

    #[tokio::test]
    async fn test_chat_streaming_rejected() {
        let (app, _) = app(vec![]);

        let (status, body) = send(
            app,
            post_json("/chat/completions", r#"{"messages": [], "stream": true}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "streaming responses are not supported");
    }

    #[tokio::test]
    async fn test_chat_unreadable_body_is_json_error() {
        let (app, _) = app(vec![]);

        let (status, body) = send(app, post_json("/chat/completions", r#"{"model": "deepseek-chat"}"#)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("messages"));
    }

    #[tokio::test]
    async fn test_chat_failure_is_500() {
        let (app, _) = app_with(vec![], CannedChat::failing("connection reset"));

        let (status, body) = send(
            app,
            post_json("/chat/completions", r#"{"messages": [{"role": "user", "content": "hello"}]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Error calling DeepSeek API: request failed: connection reset");
    }

    #[tokio::test]
    async fn test_financial_assistant_json_body() {
        let (app, _) = app(vec![]);

        let (status, body) = send(
            app,
            post_json("/financial-assistant", r#"{"emotion": "bored", "purchase_history": "games"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"financial_suggestion": "Take a walk first."}));
    }

    #[tokio::test]
    async fn test_financial_assistant_query_params() {
        let chat = Arc::new(CannedChat::replying("Sleep on it."));
        let (fetcher, _) = scripted_fetcher(vec![]);
        let app = router(AppState::new(TransactionService::new(fetcher), chat.clone()));

        let request = Request::builder()
            .method("POST")
            .uri("/financial-assistant?emotion=sad&purchase_history=candles")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["financial_suggestion"], "Sleep on it.");
        let sent = chat.requests.lock().unwrap();
        assert!(sent[0].messages[1].content.contains("feeling sad"));
        assert!(sent[0].messages[1].content.contains("purchases: candles."));
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let (app, _) = app(vec![]);
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("/chat/completions"));

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
