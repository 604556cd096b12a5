//! The publish operation.
//!
//! [`Publisher`] turns the current genre/style pair (or a pending authored
//! review) into a delivered channel message and a history record:
//! bounded generation retries, a single duplicate-replacement attempt,
//! best-effort poster enrichment, MarkdownV2 composition, delivery, then
//! recency/history bookkeeping. Every externally-caused failure is caught
//! here, logged, and reported once to the administrators; nothing
//! propagates into the scheduler.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::content::{Authored, ContentProvider, Movie};
use crate::error::BotError;
use crate::history::{HistoryEntry, HistoryStore};
use crate::poster::PosterFinder;
use crate::settings::{BotSettings, style_guidance};
use crate::telegram::{Channel, escape_markdown_v2};

/// Total candidate-generation attempts before a cycle is abandoned.
const MAX_GENERATION_ATTEMPTS: u32 = 3;

/// Result of one publish cycle.
#[derive(Debug, PartialEq)]
pub enum PublishReport {
    Published(Movie),
    /// Another publish was already in flight; this invocation was skipped.
    SkippedInFlight,
    /// The cycle was abandoned; administrators have been notified.
    Failed(String),
}

pub struct Publisher<P, F, C> {
    provider: P,
    posters: F,
    channel: C,
    history: HistoryStore,
    settings: Arc<Mutex<BotSettings>>,
    channel_id: String,
    admins: Vec<i64>,
    /// Serializes publish cycles: a scheduled tick and a "publish now"
    /// must never overlap.
    in_flight: Mutex<()>,
}

impl<P, F, C> Publisher<P, F, C>
where
    P: ContentProvider + Send + Sync,
    F: PosterFinder + Send + Sync,
    C: Channel + Send + Sync,
{
    pub fn new(
        provider: P,
        posters: F,
        channel: C,
        history: HistoryStore,
        settings: Arc<Mutex<BotSettings>>,
        channel_id: String,
        admins: Vec<i64>,
    ) -> Self {
        Self {
            provider,
            posters,
            channel,
            history,
            settings,
            channel_id,
            admins,
            in_flight: Mutex::new(()),
        }
    }

    /// Publishes a generated review using the current genre and style.
    /// Invoked by the scheduler and by "publish now" with nothing pending.
    pub async fn publish_from_settings(&self) -> PublishReport {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::warn!("publish already in flight, skipping");
            return PublishReport::SkippedInFlight;
        };

        let (genre, style) = {
            let settings = self.settings.lock().await;
            (
                settings.current_genre().to_string(),
                settings.current_style().to_string(),
            )
        };

        match self.generate_and_publish(&genre, &style).await {
            Ok(movie) => PublishReport::Published(movie),
            Err(e) => self.report_failure(e).await,
        }
    }

    /// Publishes an authored review verbatim, bypassing generation and the
    /// duplicate check.
    pub async fn publish_pending(&self, authored: Authored) -> PublishReport {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::warn!("publish already in flight, skipping");
            return PublishReport::SkippedInFlight;
        };

        let (genre, style) = {
            let settings = self.settings.lock().await;
            (
                settings.current_genre().to_string(),
                settings.current_style().to_string(),
            )
        };

        match self
            .deliver_and_record(&authored.movie, &authored.review, &genre, &style)
            .await
        {
            Ok(()) => PublishReport::Published(authored.movie),
            Err(e) => self.report_failure(e).await,
        }
    }

    async fn generate_and_publish(&self, genre: &str, style: &str) -> Result<Movie, BotError> {
        let exclusions = self.settings.lock().await.recency().exclusions();

        // Up to 3 attempts for a candidate; malformed responses are
        // silently retried.
        let mut candidate = None;
        let mut last_error = None;
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            match self.provider.suggest_movie(genre, &exclusions).await {
                Ok(movie) => {
                    candidate = Some(movie);
                    break;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "movie suggestion attempt failed");
                    last_error = Some(e);
                }
            }
        }
        let Some(mut movie) = candidate else {
            return Err(last_error
                .map(BotError::Provider)
                .unwrap_or_else(|| BotError::Config("no generation attempts made".into())));
        };

        // Duplicate: exactly one replacement attempt, never a loop.
        if self.is_recent(&movie.identifier).await {
            tracing::info!(identifier = %movie.identifier, "candidate already published, requesting replacement");
            let mut widened = exclusions.clone();
            widened.push(movie.identifier.clone());
            let replacement = self
                .provider
                .suggest_movie(genre, &widened)
                .await
                .map_err(BotError::Provider)?;
            if self.is_recent(&replacement.identifier).await {
                return Err(BotError::Config(format!(
                    "duplicate candidate {} twice in a row, giving up this cycle",
                    replacement.identifier
                )));
            }
            movie = replacement;
        }

        let guidance = {
            let settings = self.settings.lock().await;
            style_guidance(settings.current_style()).unwrap_or_default().to_string()
        };
        let review = self
            .provider
            .write_review(&movie, &guidance)
            .await
            .map_err(BotError::Provider)?;

        self.deliver_and_record(&movie, &review, genre, style)
            .await?;
        Ok(movie)
    }

    async fn deliver_and_record(
        &self,
        movie: &Movie,
        review: &str,
        genre: &str,
        style: &str,
    ) -> Result<(), BotError> {
        // Best-effort poster: any error means text-only.
        let poster = match self.posters.find_poster(&movie.title, movie.year).await {
            Ok(poster) => poster,
            Err(e) => {
                tracing::warn!(error = %e, "poster lookup failed, posting text-only");
                None
            }
        };

        let post = compose_post(movie, review, genre, style);

        match &poster {
            Some(url) => {
                self.channel
                    .deliver_photo(&self.channel_id, url, &post)
                    .await?
            }
            None => self.channel.deliver_text(&self.channel_id, &post).await?,
        }

        // Delivery succeeded: record it. A history write failure is logged
        // but does not undo the publish.
        self.settings
            .lock()
            .await
            .record_published(movie.identifier.clone());
        let entry = HistoryEntry::new(movie, Utc::now());
        if let Err(e) = self.history.append(&entry) {
            tracing::error!(error = %e, identifier = %movie.identifier, "failed to append history entry");
        }

        tracing::info!(identifier = %movie.identifier, title = %movie.title, "published review");
        Ok(())
    }

    async fn is_recent(&self, identifier: &str) -> bool {
        self.settings.lock().await.recency().is_recent(identifier)
    }

    async fn report_failure(&self, error: BotError) -> PublishReport {
        tracing::error!(error = %error, "publish cycle failed");
        let text = escape_markdown_v2(&format!("Publish failed: {error}"));
        for admin in &self.admins {
            if let Err(e) = self.channel.deliver_text(&admin.to_string(), &text).await {
                tracing::error!(admin, error = %e, "failed to notify administrator");
            }
        }
        PublishReport::Failed(error.to_string())
    }
}

/// Composes the channel post: title, year, genre, style label, review body.
/// All dynamic text is escaped for MarkdownV2.
fn compose_post(movie: &Movie, review: &str, genre: &str, style: &str) -> String {
    format!(
        "🎬 *{}* \\({}\\)\n\n📖 Genre: {}\n🖋 Style: {}\n\n📝 {}",
        escape_markdown_v2(&movie.title),
        movie.year,
        escape_markdown_v2(genre),
        escape_markdown_v2(style),
        escape_markdown_v2(review),
    )
}
