pub mod client;
pub mod error;
pub mod types;

pub use client::{ChatCompleter, OpenAiClient};
pub use error::ProviderError;
pub use types::{ChatMessage, ChatRequest, ChatResponse};
