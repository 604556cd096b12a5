use thiserror::Error;

/// Errors from the Telegram Bot API transport.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// The API answered with `ok: false` or a non-success status.
    #[error("Telegram API error (status {status}): {description}")]
    Api { status: u16, description: String },

    /// Underlying network failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
