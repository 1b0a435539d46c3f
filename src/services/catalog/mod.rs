//! Movie metadata catalog abstraction
//!
//! The orchestration services only ever talk to this trait. A catalog must
//! report logical failures through `CatalogResponse::status` rather than an
//! `Err`, and must treat "no results" as an empty, successful response.

use crate::{
    error::AppResult,
    models::{CatalogResponse, MovieId, VideoEntry},
};

pub mod tmdb;

pub use tmdb::TmdbCatalog;

/// Sort order used for browse mode
pub const POPULARITY_DESC: &str = "popularity.desc";

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieCatalog: Send + Sync {
    /// List movies without a text filter, in the given sort order
    async fn discover(&self, sort_by: &str) -> AppResult<CatalogResponse>;

    /// Search movies by title text
    async fn search_by_text(&self, query: &str) -> AppResult<CatalogResponse>;

    /// Fetch every video attached to a movie
    ///
    /// `Err` means the listing could not be fetched or decoded; an empty
    /// `Vec` means the movie has no videos.
    async fn list_videos(&self, movie_id: MovieId) -> AppResult<Vec<VideoEntry>>;

    /// Catalog name for logging and debugging
    fn name(&self) -> &'static str;
}
