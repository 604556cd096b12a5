use thiserror::Error;

use crate::openai::ProviderError;
use crate::telegram::TelegramError;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Content provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Telegram error: {0}")]
    Telegram(#[from] TelegramError),

    #[error("Invalid schedule: {0}")]
    Schedule(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
