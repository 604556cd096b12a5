use std::time::Duration;

use reqwest::Client;

use super::error::ProviderError;
use super::types::{ChatRequest, ChatResponse};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Sends chat-completion requests. Implemented by [`OpenAiClient`] and by
/// test stubs.
pub trait ChatCompleter {
    fn complete(
        &self,
        req: &ChatRequest,
    ) -> impl std::future::Future<Output = Result<ChatResponse, ProviderError>> + Send;
}

pub struct OpenAiClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self {
            api_key,
            client,
            base_url,
        }
    }
}

impl ChatCompleter for OpenAiClient {
    async fn complete(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<ChatResponse>().await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::types::ChatMessage;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_request() -> ChatRequest {
        ChatRequest {
            model: "gpt-4o".into(),
            max_tokens: 256,
            messages: vec![ChatMessage::user("Name a heist film")],
        }
    }

    #[tokio::test]
    async fn complete_parses_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "model": "gpt-4o",
                "choices": [
                    {"message": {"role": "assistant", "content": "Heat (1995)"},
                     "finish_reason": "stop"}
                ]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url("sk-test".into(), server.uri());
        let resp = client.complete(&sample_request()).await.unwrap();
        assert_eq!(resp.text(), "Heat (1995)");
    }

    #[tokio::test]
    async fn complete_maps_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url("sk-test".into(), server.uri());
        let err = client.complete(&sample_request()).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RateLimited {
                retry_after_ms: 7000
            }
        ));
    }

    #[tokio::test]
    async fn complete_maps_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url("sk-test".into(), server.uri());
        let err = client.complete(&sample_request()).await.unwrap_err();
        match err {
            ProviderError::ApiError { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }
}
