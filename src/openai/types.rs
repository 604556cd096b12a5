//! Request and response types for the chat-completions endpoint.
//!
//! All structs derive `Serialize` and `Deserialize` for JSON conversion in
//! the format expected by an OpenAI-compatible `/v1/chat/completions`
//! endpoint.

use serde::{Deserialize, Serialize};

/// Request body for the chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier (e.g. "gpt-4o").
    pub model: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Conversation messages (system, user, assistant).
    pub messages: Vec<ChatMessage>,
}

/// A single message in a chat-completion conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender role: "system", "user" or "assistant".
    pub role: String,
    /// Textual content of the message.
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }
}

/// Response returned by the chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Unique response identifier assigned by the API.
    pub id: String,
    /// Generated choices; the first one carries the answer.
    pub choices: Vec<ChatChoice>,
    /// Model that produced the response.
    pub model: String,
}

/// One generated completion within a [`ChatResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    /// The generated assistant message.
    pub message: ChatMessage,
    /// Why generation stopped ("stop", "length"); `None` while streaming.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// Trimmed text of the first choice, or an empty string when the
    /// response carries no choices.
    pub fn text(&self) -> String {
        self.choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_roundtrip() {
        let req = ChatRequest {
            model: "gpt-4o".into(),
            max_tokens: 1024,
            messages: vec![ChatMessage::user("Hello")],
        };
        let json = serde_json::to_string(&req).unwrap();
        let parsed: ChatRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model, "gpt-4o");
        assert_eq!(parsed.max_tokens, 1024);
        assert_eq!(parsed.messages.len(), 1);
        assert_eq!(parsed.messages[0].role, "user");
        assert_eq!(parsed.messages[0].content, "Hello");
    }

    #[test]
    fn chat_response_deserialize_from_api_format() {
        let api_json = r#"{
            "id": "chatcmpl-123",
            "model": "gpt-4o",
            "choices": [
                {"message": {"role": "assistant", "content": "  Answer here  "},
                 "finish_reason": "stop"}
            ]
        }"#;
        let resp: ChatResponse = serde_json::from_str(api_json).unwrap();
        assert_eq!(resp.id, "chatcmpl-123");
        assert_eq!(resp.text(), "Answer here");
        assert_eq!(resp.choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn empty_choices_yield_empty_text() {
        let resp = ChatResponse {
            id: "chatcmpl-456".into(),
            choices: vec![],
            model: "gpt-4o".into(),
        };
        assert_eq!(resp.text(), "");
    }

    #[test]
    fn missing_finish_reason_defaults_to_none() {
        let api_json = r#"{
            "id": "chatcmpl-789",
            "model": "gpt-4o",
            "choices": [{"message": {"role": "assistant", "content": "hi"}}]
        }"#;
        let resp: ChatResponse = serde_json::from_str(api_json).unwrap();
        assert_eq!(resp.choices[0].finish_reason, None);
    }
}
