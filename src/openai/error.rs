//! Error types for the chat-completion client.
//!
//! [`ProviderError`] covers the failure scenarios the publish path has to
//! distinguish: rate limiting, API-reported errors, network failures, and
//! model output that does not parse into the expected record shape.

use thiserror::Error;

/// Errors produced by the content-provider client or its response parsing.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The server returned HTTP 429. `retry_after_ms` is how long the
    /// caller should wait before retrying.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Error returned by the API (e.g. 401 invalid key, 500 internal).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Underlying network failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The model answered, but the text did not parse into the expected
    /// structure. Callers treat this as a declined attempt and may retry.
    #[error("unparsable model output: {0}")]
    Parse(String),
}
