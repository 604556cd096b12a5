mod config;
mod content;
mod dispatch;
mod error;
mod history;
mod openai;
mod poster;
mod publish;
mod scheduler;
mod settings;
mod telegram;
mod workflow;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::config::BotConfig;
use crate::content::ReviewWriter;
use crate::dispatch::Dispatcher;
use crate::history::HistoryStore;
use crate::openai::OpenAiClient;
use crate::poster::{GoogleImageSearch, Posters};
use crate::publish::Publisher;
use crate::scheduler::{PUBLISH_JOB_KEY, PublishScheduler};
use crate::settings::{BotSettings, SEED_WINDOW};
use crate::telegram::TelegramClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reelbot=info")),
        )
        .init();

    let config = BotConfig::from_env().context("loading configuration")?;

    let provider = Arc::new(ReviewWriter::new(
        OpenAiClient::new(config.openai_api_key.clone()),
        config.review_prompt_override.clone(),
    ));
    let telegram = Arc::new(TelegramClient::new(config.bot_token.clone()));
    let posters = match (&config.google_api_key, &config.google_cx_id) {
        (Some(key), Some(cx)) => Posters::Google(GoogleImageSearch::new(key.clone(), cx.clone())),
        _ => {
            tracing::info!("poster lookup credentials missing, posting text-only");
            Posters::Disabled
        }
    };

    let history = HistoryStore::open(&config.history_path);
    let recent = history
        .load_recent(SEED_WINDOW)
        .context("loading publish history")?;
    tracing::info!(
        path = %config.history_path,
        entries = recent.len(),
        "seeded recency window from history"
    );
    let mut settings = BotSettings::default();
    settings.seed_recent(recent);
    let settings = Arc::new(Mutex::new(settings));

    let publisher = Arc::new(Publisher::new(
        provider.clone(),
        posters,
        telegram.clone(),
        history,
        settings.clone(),
        config.channel_id.clone(),
        config.admins.clone(),
    ));

    let mut scheduler = PublishScheduler::new();
    let schedule = settings.lock().await.cron_schedule()?;
    let scheduled = publisher.clone();
    scheduler.register(PUBLISH_JOB_KEY, schedule, move || {
        let publisher = scheduled.clone();
        async move {
            publisher.publish_from_settings().await;
        }
    });

    let mut dispatcher = Dispatcher::new(
        telegram.clone(),
        provider,
        publisher,
        settings,
        scheduler,
        config.admins.clone(),
    );

    tracing::info!(channel = %config.channel_id, "bot started, polling for updates");
    let mut offset = 0i64;
    loop {
        match telegram.get_updates(offset).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    dispatcher.handle_update(update).await;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "getUpdates failed, backing off");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}
