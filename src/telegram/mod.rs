pub mod client;
pub mod error;
pub mod types;

pub use client::{Channel, TelegramClient, escape_markdown_v2};
pub use error::TelegramError;
pub use types::{CallbackQuery, IncomingMessage, InlineKeyboardMarkup, Update};
