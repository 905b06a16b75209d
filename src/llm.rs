// 💬 LLM Client - chat completions against the DeepSeek API

use crate::config::LlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`, inbound and outbound.
///
/// Optional sampling parameters are omitted from the upstream call when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Falls back to the configured model when empty
    #[serde(default)]
    pub model: String,

    pub messages: Vec<ChatMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub stream: bool,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        ChatCompletionRequest {
            model: model.into(),
            messages,
            temperature: None,
            top_p: None,
            max_tokens: None,
            stream: false,
        }
    }
}

/// First choice's message content of a completion body
pub fn first_choice_content(body: &Value) -> Option<&str> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Model used when a request does not name one
    fn default_model(&self) -> &str;

    /// Run one non-streaming completion and return the provider's JSON body
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<Value, LlmError>;
}

pub struct DeepSeekClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl DeepSeekClient {
    pub fn new(config: &LlmConfig, timeout: Duration) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .pool_max_idle_per_host(2)
            .build()?;

        Ok(DeepSeekClient {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatProvider for DeepSeekClient {
    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatCompletionRequest) -> Result<Value, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| LlmError::InvalidResponse("API key contains invalid header characters".to_string()))?;

        let mut request = request.clone();
        if request.model.is_empty() {
            request.model = self.model.clone();
        }

        let url = format!("{}/chat/completions", self.base_url);
        debug!(%url, model = %request.model, messages = request.messages.len(), "POST chat/completions");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, bearer)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "LLM provider returned an error");
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
