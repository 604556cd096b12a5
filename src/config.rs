//! Bot configuration loaded from the environment.
//!
//! The struct [`BotConfig`] holds every deployment-supplied value. A `.env`
//! file is honored via `dotenvy` before the environment is read, matching
//! how the bot is deployed. There are no CLI flags beyond process start.

use std::env;

use crate::error::BotError;

/// Runtime configuration read from named environment values.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram Bot API token.
    pub bot_token: String,

    /// API key for the chat-completion service.
    pub openai_api_key: String,

    /// Telegram user ids allowed to drive the admin workflow.
    pub admins: Vec<i64>,

    /// Target channel identifier (e.g. `@moviechannel` or `-100...`).
    pub channel_id: String,

    /// Optional override text prepended to review-generation instructions.
    pub review_prompt_override: Option<String>,

    /// Google Custom Search credentials for poster lookup. Poster
    /// enrichment is disabled when either half is missing.
    pub google_api_key: Option<String>,
    pub google_cx_id: Option<String>,

    /// Path of the append-only publish history file.
    pub history_path: String,
}

impl BotConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, BotError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through a lookup function (testable seam).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, BotError> {
        let required = |name: &str| -> Result<String, BotError> {
            get(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| BotError::Config(format!("{name} is not set")))
        };

        let admins = parse_admins(&required("ADMINS")?)?;

        Ok(Self {
            bot_token: required("TELEGRAM_BOT_TOKEN")?,
            openai_api_key: required("OPENAI_API_KEY")?,
            admins,
            channel_id: required("CHANNEL_ID")?,
            review_prompt_override: get("REVIEW_PROMPT_OVERRIDE").filter(|v| !v.is_empty()),
            google_api_key: get("GOOGLE_API_KEY").filter(|v| !v.is_empty()),
            google_cx_id: get("GOOGLE_CX_ID").filter(|v| !v.is_empty()),
            history_path: get("HISTORY_PATH").unwrap_or_else(|| "history.jsonl".to_string()),
        })
    }

    /// Whether poster lookup credentials are present.
    pub fn posters_enabled(&self) -> bool {
        self.google_api_key.is_some() && self.google_cx_id.is_some()
    }
}

/// Parses the comma-separated administrator id list.
fn parse_admins(raw: &str) -> Result<Vec<i64>, BotError> {
    let admins = raw
        .split(',')
        .map(|part| part.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| BotError::Config(format!("ADMINS must be comma-separated integers: {e}")))?;

    if admins.is_empty() {
        return Err(BotError::Config("ADMINS must not be empty".into()));
    }
    Ok(admins)
}
