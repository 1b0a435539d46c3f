//! TMDB v3 catalog
//!
//! Endpoints used:
//! 1. Browse: /discover/movie?sort_by=... → popularity-ordered movies
//! 2. Search: /search/movie?query=... → movies matching the title text
//! 3. Videos: /movie/{id}/videos?language=... → trailers, teasers, clips
//!
//! Authentication is a v4 read access token sent as a bearer token.

use crate::{
    error::{AppError, AppResult},
    models::{CatalogResponse, MovieId, TmdbPage, TmdbVideoList, VideoEntry},
    services::catalog::MovieCatalog,
};
use reqwest::{header, Client as HttpClient, Response};
use serde::de::DeserializeOwned;

#[derive(Clone)]
pub struct TmdbCatalog {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    video_language: String,
}

impl TmdbCatalog {
    pub fn new(api_key: String, api_url: String, video_language: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            video_language,
        }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> AppResult<Response> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        Ok(response)
    }

    /// Decodes a body, logging the raw payload when it does not match
    async fn decode<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        let response_text = response.text().await?;

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                response = %response_text,
                "Failed to deserialize TMDB response"
            );
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })
    }

    async fn fetch_page(&self, path: &str, query: &[(&str, &str)]) -> AppResult<CatalogResponse> {
        let response = self.get(path, query).await?;
        let page: TmdbPage = Self::decode(response).await?;
        Ok(CatalogResponse::from(page))
    }
}

#[async_trait::async_trait]
impl MovieCatalog for TmdbCatalog {
    async fn discover(&self, sort_by: &str) -> AppResult<CatalogResponse> {
        let response = self
            .fetch_page("/discover/movie", &[("sort_by", sort_by)])
            .await?;

        tracing::info!(
            sort_by = %sort_by,
            results = response.results.len(),
            catalog = "tmdb",
            "Discover completed"
        );

        Ok(response)
    }

    async fn search_by_text(&self, query: &str) -> AppResult<CatalogResponse> {
        let response = self
            .fetch_page("/search/movie", &[("query", query)])
            .await?;

        tracing::info!(
            query = %query,
            results = response.results.len(),
            catalog = "tmdb",
            "Title search completed"
        );

        Ok(response)
    }

    async fn list_videos(&self, movie_id: MovieId) -> AppResult<Vec<VideoEntry>> {
        let path = format!("/movie/{}/videos", movie_id);
        let response = self
            .get(&path, &[("language", self.video_language.as_str())])
            .await?;
        let listing: TmdbVideoList = Self::decode(response).await?;

        tracing::debug!(
            movie_id = %movie_id,
            videos = listing.results.len(),
            catalog = "tmdb",
            "Video listing fetched"
        );

        Ok(listing.results)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
