//! Translate canonical chat messages into upstream request bodies.
//!
//! Gemini has no system role, so the first system message is folded into the
//! text of the opening user turn, separated by a blank line. Only that first
//! system message survives; later ones are dropped. When the conversation does
//! not open with a user turn the system text goes nowhere.

use super::gemini_types::{Content, GeminiRole, GenerateContentRequest, GenerationConfig};
use super::openai_types::ChatCompletionRequest;
use super::types::{ChatMessage, Role};
use serde_json::Value;

/// Build the Gemini `contents` list for a conversation.
pub fn to_gemini_contents(messages: &[ChatMessage]) -> Vec<Content> {
    let prefix = messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| format!("{}\n\n", m.content))
        .unwrap_or_default();

    messages
        .iter()
        .filter(|m| m.role != Role::System)
        .enumerate()
        .map(|(index, msg)| match msg.role {
            Role::User if index == 0 => {
                Content::text(Some(GeminiRole::User), format!("{prefix}{}", msg.content))
            }
            Role::User => Content::text(Some(GeminiRole::User), msg.content.clone()),
            _ => Content::text(Some(GeminiRole::Model), msg.content.clone()),
        })
        .collect()
}

pub fn to_gemini_request(messages: &[ChatMessage]) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: to_gemini_contents(messages),
        generation_config: None,
    }
}

/// Single-prompt request for the forecast endpoint; the model is asked for JSON.
pub fn forecast_request(prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::text(None, prompt)],
        generation_config: Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
        }),
    }
}

/// OpenAI takes the client's messages as they are, extra fields included.
pub fn to_openai_request(messages: &[Value], model: &str) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: messages.to_vec(),
    }
}
