use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod trending;

pub use trending::{TrendingEntry, TrendingMetadata};

/// A search the user asked for. The raw text goes to the catalog, the
/// normalized form keys the trending counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Query(String);

impl Query {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    /// Trimmed, lowercased aggregation key
    pub fn normalized(&self) -> String {
        self.0.trim().to_lowercase()
    }

    /// An empty query means "browse": no text filter, popularity order
    ///
    /// Whitespace is still text and goes to the text search.
    pub fn is_browse(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// TMDB movie identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub u64);

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One movie in a result list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
}

impl MovieSummary {
    /// Full poster URL under `image_base`, if the movie has a poster
    pub fn poster_url(&self, image_base: &str) -> Option<String> {
        self.poster_path.as_deref().map(|path| {
            format!(
                "{}/{}",
                image_base.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        })
    }
}

/// Whether the catalog itself considered the request successful
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Failure { message: Option<String> },
}

/// Catalog answer to a discover or text search
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogResponse {
    pub status: ResponseStatus,
    pub results: Vec<MovieSummary>,
}

impl CatalogResponse {
    pub fn success(results: Vec<MovieSummary>) -> Self {
        Self {
            status: ResponseStatus::Success,
            results,
        }
    }

    pub fn failure(message: Option<String>) -> Self {
        Self {
            status: ResponseStatus::Failure { message },
            results: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network, HTTP status or payload decoding failed
    Transport,
    /// The catalog answered but reported failure in its payload
    Application,
}

/// User-facing description of why a search produced no results
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// The outcome of one search: ordered movies, or an empty list plus a failure
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct SearchResult {
    pub query: Query,
    pub movies: Vec<MovieSummary>,
    pub error: Option<SearchFailure>,
}

impl SearchResult {
    pub fn found(query: Query, movies: Vec<MovieSummary>) -> Self {
        Self {
            query,
            movies,
            error: None,
        }
    }

    pub fn failed(query: Query, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            query,
            movies: Vec::new(),
            error: Some(SearchFailure {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

// ============================================================================
// Trailer Types
// ============================================================================

/// One entry of a movie's video listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoEntry {
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Platform-specific video key (a YouTube video id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoKey(pub String);

impl Display for VideoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Unavailability {
    /// The listing had no usable video
    NoTrailer,
    /// The listing could not be fetched or decoded
    LookupFailed,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TrailerOutcome {
    Resolved(VideoKey),
    Unavailable(Unavailability),
}

impl TrailerOutcome {
    pub fn video_key(&self) -> Option<&VideoKey> {
        match self {
            TrailerOutcome::Resolved(key) => Some(key),
            TrailerOutcome::Unavailable(_) => None,
        }
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Raw page from `/discover/movie` and `/search/movie`
///
/// TMDB reports failures as `{"success": false, "status_message": ...}`;
/// OMDb-style proxies use `{"Response": "False", "Error": ...}`. Both are
/// accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPage {
    #[serde(default)]
    pub results: Option<Vec<MovieSummary>>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(rename = "Response", default)]
    pub response: Option<String>,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
}

impl From<TmdbPage> for CatalogResponse {
    fn from(page: TmdbPage) -> Self {
        if page.success == Some(false) {
            return CatalogResponse::failure(page.status_message.or(page.error));
        }
        if page.response.as_deref() == Some("False") {
            return CatalogResponse::failure(page.error.or(page.status_message));
        }
        CatalogResponse::success(page.results.unwrap_or_default())
    }
}

/// Raw listing from `/movie/{id}/videos`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbVideoList {
    pub results: Vec<VideoEntry>,
}
