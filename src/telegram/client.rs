use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::error::TelegramError;
use super::types::{ApiResponse, InlineKeyboardMarkup, Update};

const API_URL: &str = "https://api.telegram.org";

/// Long-poll wait passed to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u64 = 50;

/// Escapes the characters MarkdownV2 treats as markup. Applied to every
/// piece of dynamic text before it goes into a message.
pub fn escape_markdown_v2(text: &str) -> String {
    const SPECIAL: &[char] = &[
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut escaped = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        if SPECIAL.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Message delivery as the publish path sees it. Implemented by
/// [`TelegramClient`] and by test stubs.
pub trait Channel {
    fn deliver_text(
        &self,
        chat: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), TelegramError>> + Send;

    fn deliver_photo(
        &self,
        chat: &str,
        photo_url: &str,
        caption: &str,
    ) -> impl std::future::Future<Output = Result<(), TelegramError>> + Send;
}

impl<C: Channel + Send + Sync> Channel for std::sync::Arc<C> {
    async fn deliver_text(&self, chat: &str, text: &str) -> Result<(), TelegramError> {
        (**self).deliver_text(chat, text).await
    }

    async fn deliver_photo(
        &self,
        chat: &str,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), TelegramError> {
        (**self).deliver_photo(chat, photo_url, caption).await
    }
}

pub struct TelegramClient {
    token: String,
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(token: String, base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            token,
            client,
            base_url,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token)
    }

    async fn call<T: DeserializeOwned + Default>(
        &self,
        method: &str,
        body: &impl Serialize,
    ) -> Result<T, TelegramError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let api: ApiResponse<T> = response.json().await?;

        if !api.ok {
            return Err(TelegramError::Api {
                status: status.as_u16(),
                description: api
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        api.result.ok_or(TelegramError::Api {
            status: status.as_u16(),
            description: "ok response without result".to_string(),
        })
    }

    /// Sends a MarkdownV2 message, optionally with an inline keyboard.
    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "MarkdownV2",
        });
        if let Some(kb) = keyboard {
            body["reply_markup"] = serde_json::to_value(kb).expect("keyboard serializes");
        }
        self.call::<serde_json::Value>("sendMessage", &body).await?;
        Ok(())
    }

    /// Sends a photo by URL with a MarkdownV2 caption.
    pub async fn send_photo(
        &self,
        chat_id: &str,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), TelegramError> {
        let body = json!({
            "chat_id": chat_id,
            "photo": photo_url,
            "caption": caption,
            "parse_mode": "MarkdownV2",
        });
        self.call::<serde_json::Value>("sendPhoto", &body).await?;
        Ok(())
    }

    /// Long-polls for inbound updates past `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let body = json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message", "callback_query"],
        });
        self.call("getUpdates", &body).await
    }

    /// Acknowledges a callback query so the client stops its spinner.
    pub async fn answer_callback(&self, callback_id: &str) -> Result<(), TelegramError> {
        let body = json!({ "callback_query_id": callback_id });
        self.call::<serde_json::Value>("answerCallbackQuery", &body)
            .await?;
        Ok(())
    }
}

impl Channel for TelegramClient {
    async fn deliver_text(&self, chat: &str, text: &str) -> Result<(), TelegramError> {
        self.send_message(chat, text, None).await
    }

    async fn deliver_photo(
        &self,
        chat: &str,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), TelegramError> {
        self.send_photo(chat, photo_url, caption).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ok_body(result: serde_json::Value) -> serde_json::Value {
        json!({ "ok": true, "result": result })
    }

    #[test]
    fn escape_markdown_v2_specials() {
        assert_eq!(escape_markdown_v2("hello_world"), "hello\\_world");
        assert_eq!(escape_markdown_v2("a.b.c"), "a\\.b\\.c");
        assert_eq!(escape_markdown_v2("test (value)"), "test \\(value\\)");
        assert_eq!(escape_markdown_v2("no special"), "no special");
        assert_eq!(escape_markdown_v2("Heat (1995)!"), "Heat \\(1995\\)\\!");
    }

    #[tokio::test]
    async fn send_message_hits_the_token_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(json!({
                "chat_id": "@reviews",
                "parse_mode": "MarkdownV2"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({}))))
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::with_base_url("123:abc".into(), server.uri());
        client
            .send_message("@reviews", "hello", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_photo_carries_caption() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendPhoto"))
            .and(body_partial_json(json!({
                "photo": "https://example.com/poster.jpg",
                "caption": "caption"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({}))))
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::with_base_url("123:abc".into(), server.uri());
        client
            .send_photo("@reviews", "https://example.com/poster.jpg", "caption")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn get_updates_parses_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!([
                {"update_id": 10, "message": {"chat": {"id": 1}, "from": {"id": 1}, "text": "hi"}}
            ]))))
            .mount(&server)
            .await;

        let client = TelegramClient::with_base_url("123:abc".into(), server.uri());
        let updates = client.get_updates(0).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, 10);
    }

    #[tokio::test]
    async fn api_level_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let client = TelegramClient::with_base_url("123:abc".into(), server.uri());
        let err = client
            .send_message("@nowhere", "hello", None)
            .await
            .unwrap_err();
        match err {
            TelegramError::Api { description, .. } => {
                assert!(description.contains("chat not found"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
