//! Translate upstream responses into a [`ChatOutcome`].

use super::gemini_types::{GeminiErrorResponse, GenerateContentResponse};
use super::openai_types::{ChatCompletionResponse, ChatErrorResponse};
use crate::error::{ProxyError, Result};

/// Reply sent when the upstream answered but produced nothing usable.
pub const BLOCKED_REPLY: &str =
    "I could not generate a response. The prompt may have been blocked for safety reasons.";

/// Used when an upstream error body carries no message of its own.
pub const UPSTREAM_ERROR_FALLBACK: &str = "The upstream API returned an error.";

/// Result of one upstream call that reached the upstream and got an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Reply(String),
    /// Success status but no content. Rendered as a successful [`BLOCKED_REPLY`].
    ContentBlocked,
    /// The upstream refused the request; relayed with its status.
    Rejected { message: String, status: u16 },
}

impl ChatOutcome {
    /// Text to hand back to the client, or `None` for a rejection.
    #[must_use]
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Self::Reply(text) => Some(text),
            Self::ContentBlocked => Some(BLOCKED_REPLY),
            Self::Rejected { .. } => None,
        }
    }

    fn rejected(status: u16, message: Option<String>) -> Self {
        Self::Rejected {
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| UPSTREAM_ERROR_FALLBACK.to_string()),
            status,
        }
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Pick the reply out of a parsed Gemini response: first candidate, first part.
/// A first part without text counts as no content.
pub fn gemini_response_to_outcome(resp: &GenerateContentResponse) -> ChatOutcome {
    resp.candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|content| content.parts.first())
        .and_then(|part| part.text.clone())
        .map_or(ChatOutcome::ContentBlocked, ChatOutcome::Reply)
}

/// Interpret a raw Gemini answer. `Err` only when a success body is unreadable.
pub fn gemini_to_outcome(status: u16, body: &str) -> Result<ChatOutcome> {
    if !is_success(status) {
        let message = serde_json::from_str::<GeminiErrorResponse>(body)
            .ok()
            .and_then(|e| e.error.message);
        return Ok(ChatOutcome::rejected(status, message));
    }

    let resp: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        ProxyError::translation(format!("Failed to parse Gemini response: {e}"))
    })?;

    Ok(gemini_response_to_outcome(&resp))
}

pub fn openai_response_to_outcome(resp: &ChatCompletionResponse) -> ChatOutcome {
    resp.choices
        .first()
        .and_then(|c| c.message.as_ref())
        .and_then(|m| m.content.clone())
        .map_or(ChatOutcome::ContentBlocked, ChatOutcome::Reply)
}

/// Interpret a raw OpenAI answer. `Err` only when a success body is unreadable.
pub fn openai_to_outcome(status: u16, body: &str) -> Result<ChatOutcome> {
    if !is_success(status) {
        let message = serde_json::from_str::<ChatErrorResponse>(body)
            .ok()
            .and_then(|e| e.error.message);
        return Ok(ChatOutcome::rejected(status, message));
    }

    let resp: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
        ProxyError::translation(format!("Failed to parse OpenAI response: {e}"))
    })?;

    Ok(openai_response_to_outcome(&resp))
}
