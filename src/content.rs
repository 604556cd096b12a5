//! Movie and review generation on top of the chat-completion client.
//!
//! [`ReviewWriter`] sends structured prompts asking the model to pick a
//! movie for a genre, write a styled review, or turn a free-text operator
//! query into a movie plus review. Model output that does not parse into
//! the expected JSON shape is reported as [`ProviderError::Parse`]; callers
//! decide whether to retry (scheduled publishing) or re-prompt (authoring).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::openai::{ChatCompleter, ChatMessage, ChatRequest, ProviderError};

const GENERATION_MODEL: &str = "gpt-4o";

/// A single creative work as produced by the content provider or by ad-hoc
/// authoring. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    /// Stable unique key: an external catalog id (e.g. "tt0133093") when the
    /// model supplies one, otherwise a generated opaque id.
    pub identifier: String,
    pub title: String,
    pub year: i32,
    pub synopsis: String,
}

/// A movie plus its finished review text, ready for publishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authored {
    pub movie: Movie,
    pub review: String,
}

/// Operations the publish path and the authoring flow need from the
/// content provider. Implemented by [`ReviewWriter`] and by test stubs.
pub trait ContentProvider {
    /// Ask for a movie candidate in `genre`, steering the model away from
    /// recently published identifiers.
    fn suggest_movie(
        &self,
        genre: &str,
        exclude: &[String],
    ) -> impl std::future::Future<Output = Result<Movie, ProviderError>> + Send;

    /// Write a review of `movie` following the style guidance text.
    fn write_review(
        &self,
        movie: &Movie,
        style_guidance: &str,
    ) -> impl std::future::Future<Output = Result<String, ProviderError>> + Send;

    /// Turn a free-text operator query into a movie plus review.
    fn review_from_query(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = Result<Authored, ProviderError>> + Send;
}

impl<P: ContentProvider + Send + Sync> ContentProvider for std::sync::Arc<P> {
    async fn suggest_movie(&self, genre: &str, exclude: &[String]) -> Result<Movie, ProviderError> {
        (**self).suggest_movie(genre, exclude).await
    }

    async fn write_review(
        &self,
        movie: &Movie,
        style_guidance: &str,
    ) -> Result<String, ProviderError> {
        (**self).write_review(movie, style_guidance).await
    }

    async fn review_from_query(&self, query: &str) -> Result<Authored, ProviderError> {
        (**self).review_from_query(query).await
    }
}

/// Content provider backed by a chat-completion client.
pub struct ReviewWriter<C> {
    client: C,
    /// Extra instruction text prepended to review prompts, from
    /// `REVIEW_PROMPT_OVERRIDE`.
    prompt_override: Option<String>,
}

/// Raw model response for a movie suggestion.
#[derive(Debug, Deserialize)]
struct RawMovie {
    #[serde(default)]
    identifier: Option<String>,
    title: String,
    year: i32,
    #[serde(default)]
    synopsis: String,
}

/// Raw model response for a free-text authoring request.
#[derive(Debug, Deserialize)]
struct RawAuthored {
    #[serde(default)]
    identifier: Option<String>,
    title: String,
    year: i32,
    #[serde(default)]
    synopsis: String,
    review: String,
}

impl RawMovie {
    fn into_movie(self) -> Result<Movie, ProviderError> {
        if self.title.trim().is_empty() {
            return Err(ProviderError::Parse("movie title is empty".into()));
        }
        Ok(Movie {
            identifier: self
                .identifier
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(opaque_id),
            title: self.title,
            year: self.year,
            synopsis: self.synopsis,
        })
    }
}

/// Opaque identifier for entries without a catalog id.
fn opaque_id() -> String {
    format!("adhoc-{}", Uuid::new_v4())
}

/// Strips a Markdown code fence around model output, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

impl<C: ChatCompleter + Sync> ReviewWriter<C> {
    pub fn new(client: C, prompt_override: Option<String>) -> Self {
        Self {
            client,
            prompt_override,
        }
    }

    async fn ask(&self, prompt: String, max_tokens: u32) -> Result<String, ProviderError> {
        let mut messages = Vec::new();
        if let Some(extra) = &self.prompt_override {
            messages.push(ChatMessage::system(extra.clone()));
        }
        messages.push(ChatMessage::user(prompt));

        let req = ChatRequest {
            model: GENERATION_MODEL.to_string(),
            max_tokens,
            messages,
        };
        let response = self.client.complete(&req).await?;
        Ok(response.text())
    }
}

impl<C: ChatCompleter + Sync> ContentProvider for ReviewWriter<C> {
    async fn suggest_movie(
        &self,
        genre: &str,
        exclude: &[String],
    ) -> Result<Movie, ProviderError> {
        let exclusions = if exclude.is_empty() {
            String::new()
        } else {
            format!(
                "\nDo not pick any of these already-covered movies (identifiers): {}.",
                exclude.join(", ")
            )
        };

        let prompt = format!(
            "Name one well-known {genre} movie worth reviewing. \
             Respond with ONLY valid JSON, no other text.\n\
             \n\
             Format:\n\
             {{\"identifier\": \"<IMDb id like tt0133093>\", \"title\": \"<title>\", \
             \"year\": <release year>, \"synopsis\": \"<one-sentence synopsis>\"}}\
             {exclusions}"
        );

        let text = self.ask(prompt, 512).await?;
        let raw: RawMovie = serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| ProviderError::Parse(format!("movie suggestion: {e}")))?;
        raw.into_movie()
    }

    async fn write_review(
        &self,
        movie: &Movie,
        style_guidance: &str,
    ) -> Result<String, ProviderError> {
        let prompt = format!(
            "Write a review of the movie \"{}\" ({}). {style_guidance}\n\
             Synopsis for context: {}\n\
             Respond with the review text only, 150-250 words, plain prose.",
            movie.title, movie.year, movie.synopsis
        );

        let text = self.ask(prompt, 1024).await?;
        if text.is_empty() {
            return Err(ProviderError::Parse("review text is empty".into()));
        }
        Ok(text)
    }

    async fn review_from_query(&self, query: &str) -> Result<Authored, ProviderError> {
        let prompt = format!(
            "An operator described a movie as: \"{query}\".\n\
             Identify the movie and write a short review of it. \
             Respond with ONLY valid JSON, no other text.\n\
             \n\
             Format:\n\
             {{\"identifier\": \"<IMDb id or null>\", \"title\": \"<title>\", \
             \"year\": <release year>, \"synopsis\": \"<one-sentence synopsis>\", \
             \"review\": \"<150-250 word review>\"}}"
        );

        let text = self.ask(prompt, 1536).await?;
        let raw: RawAuthored = serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| ProviderError::Parse(format!("authored review: {e}")))?;

        if raw.review.trim().is_empty() {
            return Err(ProviderError::Parse("review text is empty".into()));
        }

        let review = raw.review.clone();
        let movie = RawMovie {
            identifier: raw.identifier,
            title: raw.title,
            year: raw.year,
            synopsis: raw.synopsis,
        }
        .into_movie()?;

        Ok(Authored { movie, review })
    }
}
