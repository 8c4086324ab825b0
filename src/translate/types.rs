//! Canonical request and reply bodies exchanged with the browser client.

use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Any role the client sends that is not one of the three above.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// `POST /api/chat` body. Messages stay raw JSON until the upstream format is
/// known: OpenAI gets them untouched, Gemini needs [`parse_messages`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Vec<Value>>,
}

impl ChatRequest {
    /// The conversation, in order. An empty list is accepted; a missing one is not.
    pub fn into_messages(self) -> Result<Vec<Value>> {
        self.messages
            .ok_or_else(|| ProxyError::validation("Request body must contain a \"messages\" array."))
    }
}

/// Read raw messages as `{role, content}` pairs with string content.
pub fn parse_messages(raw: &[Value]) -> Result<Vec<ChatMessage>> {
    raw.iter()
        .enumerate()
        .map(|(index, value)| {
            ChatMessage::deserialize(value).map_err(|e| {
                ProxyError::validation(format!("Invalid message at index {index}: {e}"))
            })
        })
        .collect()
}

/// `POST /api/forecast` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

impl ForecastRequest {
    pub fn into_prompt(self) -> Result<String> {
        match self.prompt {
            Some(prompt) if !prompt.is_empty() => Ok(prompt),
            _ => Err(ProxyError::validation(
                "Request body must contain a \"prompt\".",
            )),
        }
    }
}

/// Success body: `{choices:[{message:{content}}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub choices: Vec<ReplyChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyChoice {
    pub message: ReplyMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub content: String,
}

impl ChatReply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ReplyChoice {
                message: ReplyMessage {
                    content: content.into(),
                },
            }],
        }
    }
}

/// Failure body: `{error:{message}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roles_parse() {
        let messages: Vec<ChatMessage> = serde_json::from_value(json!([
            {"role": "system", "content": "s"},
            {"role": "user", "content": "u"},
            {"role": "assistant", "content": "a"},
            {"role": "tool", "content": "t"},
        ]))
        .unwrap();

        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[3].role, Role::Other("tool".to_string()));
    }

    #[test]
    fn test_unknown_role_serializes_back_verbatim() {
        let msg = ChatMessage::new(Role::Other("function".to_string()), "x");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "function", "content": "x"}));

        let value = serde_json::to_value(ChatMessage::assistant("y")).unwrap();
        assert_eq!(value, json!({"role": "assistant", "content": "y"}));
    }

    #[test]
    fn test_missing_messages_is_a_validation_error() {
        let req: ChatRequest = serde_json::from_value(json!({"prompt": "hi"})).unwrap();
        assert!(matches!(
            req.into_messages(),
            Err(ProxyError::Validation { .. })
        ));

        let req: ChatRequest = serde_json::from_value(json!({"messages": []})).unwrap();
        assert!(req.into_messages().unwrap().is_empty());
    }

    #[test]
    fn test_parse_messages_ignores_extra_fields() {
        let raw = vec![json!({"role": "user", "content": "U", "name": "bob"})];
        assert_eq!(parse_messages(&raw).unwrap(), vec![ChatMessage::user("U")]);
    }

    #[test]
    fn test_parse_messages_requires_string_content() {
        let raw = vec![
            json!({"role": "user", "content": "ok"}),
            json!({"role": "user", "content": [{"type": "text", "text": "U"}]}),
        ];
        let err = parse_messages(&raw).unwrap_err();
        assert!(matches!(err, ProxyError::Validation { .. }));
        assert!(err.detail().starts_with("Invalid message at index 1:"));
    }

    #[test]
    fn test_forecast_prompt_must_be_non_empty() {
        let req: ForecastRequest = serde_json::from_value(json!({"prompt": ""})).unwrap();
        assert!(req.into_prompt().is_err());

        let req: ForecastRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.into_prompt().is_err());

        let req: ForecastRequest = serde_json::from_value(json!({"prompt": "rain?"})).unwrap();
        assert_eq!(req.into_prompt().unwrap(), "rain?");
    }

    #[test]
    fn test_reply_shapes() {
        assert_eq!(
            serde_json::to_value(ChatReply::new("hi")).unwrap(),
            json!({"choices": [{"message": {"content": "hi"}}]})
        );
        assert_eq!(
            serde_json::to_value(ErrorBody::new("nope")).unwrap(),
            json!({"error": {"message": "nope"}})
        );
    }
}
