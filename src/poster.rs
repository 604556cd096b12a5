//! Poster lookup via Google Custom Search image search.
//!
//! Enrichment is best-effort: the publish path treats any error here as
//! "no image" and posts text-only.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::BotError;

const API_URL: &str = "https://www.googleapis.com";

/// Looks up a poster image URL for a movie. Implemented by
/// [`GoogleImageSearch`], the disabled [`Posters::Disabled`] variant and
/// test stubs.
pub trait PosterFinder {
    fn find_poster(
        &self,
        title: &str,
        year: i32,
    ) -> impl std::future::Future<Output = Result<Option<String>, BotError>> + Send;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: String,
}

pub struct GoogleImageSearch {
    api_key: String,
    cx_id: String,
    client: Client,
    base_url: String,
}

impl GoogleImageSearch {
    pub fn new(api_key: String, cx_id: String) -> Self {
        Self::with_base_url(api_key, cx_id, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, cx_id: String, base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            api_key,
            cx_id,
            client,
            base_url,
        }
    }
}

impl PosterFinder for GoogleImageSearch {
    async fn find_poster(&self, title: &str, year: i32) -> Result<Option<String>, BotError> {
        let url = format!("{}/customsearch/v1", self.base_url);
        let query = format!("{title} {year} movie poster");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx_id.as_str()),
                ("q", query.as_str()),
                ("searchType", "image"),
                ("num", "1"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response.json().await?;
        Ok(body.items.into_iter().next().map(|item| item.link))
    }
}

/// Runtime selection between a configured image search and no enrichment.
pub enum Posters {
    Google(GoogleImageSearch),
    Disabled,
}

impl PosterFinder for Posters {
    async fn find_poster(&self, title: &str, year: i32) -> Result<Option<String>, BotError> {
        match self {
            Posters::Google(search) => search.find_poster(title, year).await,
            Posters::Disabled => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn find_poster_returns_first_image_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("searchType", "image"))
            .and(query_param("q", "Heat 1995 movie poster"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"link": "https://img.example.com/heat.jpg"},
                    {"link": "https://img.example.com/heat2.jpg"}
                ]
            })))
            .mount(&server)
            .await;

        let search = GoogleImageSearch::with_base_url("key".into(), "cx".into(), server.uri());
        let poster = search.find_poster("Heat", 1995).await.unwrap();
        assert_eq!(poster.as_deref(), Some("https://img.example.com/heat.jpg"));
    }

    #[tokio::test]
    async fn no_results_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let search = GoogleImageSearch::with_base_url("key".into(), "cx".into(), server.uri());
        assert!(search.find_poster("Heat", 1995).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn http_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let search = GoogleImageSearch::with_base_url("key".into(), "cx".into(), server.uri());
        assert!(search.find_poster("Heat", 1995).await.is_err());
    }

    #[tokio::test]
    async fn disabled_variant_always_none() {
        let posters = Posters::Disabled;
        assert!(posters.find_poster("Heat", 1995).await.unwrap().is_none());
    }
}
