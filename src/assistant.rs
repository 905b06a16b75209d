// 🧠 Financial Assistant
// Turns the user's mood and recent purchases into a spending suggestion

use crate::error::LlmError;
use crate::llm::{first_choice_content, ChatCompletionRequest, ChatMessage, ChatProvider};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

pub const DEFAULT_EMOTION: &str = "neutral";

const SYSTEM_PROMPT: &str = "You are a helpful financial assistant.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantInput {
    pub emotion: String,
    pub purchase_history: String,
}

impl Default for AssistantInput {
    fn default() -> Self {
        AssistantInput {
            emotion: DEFAULT_EMOTION.to_string(),
            purchase_history: String::new(),
        }
    }
}

impl AssistantInput {
    /// Read the inputs from a JSON object body, or from the query string when
    /// the body is not a JSON object. Non-string values are used as their JSON
    /// text; missing or `null` fields take their defaults.
    pub fn from_request(body: &[u8], query: &HashMap<String, String>) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => AssistantInput::from_fields(
                fields.get("emotion").and_then(field_text),
                fields.get("purchase_history").and_then(field_text),
            ),
            _ => AssistantInput::from_fields(query.get("emotion").cloned(), query.get("purchase_history").cloned()),
        }
    }

    fn from_fields(emotion: Option<String>, purchase_history: Option<String>) -> Self {
        AssistantInput {
            emotion: emotion.unwrap_or_else(|| DEFAULT_EMOTION.to_string()),
            purchase_history: purchase_history.unwrap_or_default(),
        }
    }
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantResponse {
    pub financial_suggestion: String,
}

pub fn build_prompt(input: &AssistantInput) -> String {
    format!(
        "You are a financial assistant dedicated to helping users prevent emotional spending.\n\
         The user is currently feeling {} and has recently made these purchases: {}.\n\
         Based on this information, provide a thoughtful, actionable suggestion to help the user make mindful financial decisions.",
        input.emotion, input.purchase_history
    )
}

/// Ask the provider for a suggestion using its default model
pub async fn suggest(chat: &dyn ChatProvider, input: &AssistantInput) -> Result<AssistantResponse, LlmError> {
    info!(emotion = %input.emotion, "Requesting financial suggestion");

    let request = ChatCompletionRequest::new(
        chat.default_model(),
        vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(build_prompt(input))],
    );

    let body = chat.complete(&request).await?;
    let suggestion = first_choice_content(&body)
        .ok_or_else(|| LlmError::InvalidResponse("completion has no message content".to_string()))?;

    Ok(AssistantResponse {
        financial_suggestion: suggestion.to_string(),
    })
}
