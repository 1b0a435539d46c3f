use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{MovieId, TrailerOutcome, TrendingEntry, Unavailability},
    services::{Notification, PresentationView},
};

use super::AppState;

/// Largest trending list a caller may ask for
const MAX_TRENDING_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct InputRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TrailerResponse {
    pub movie_id: MovieId,
    pub outcome: TrailerOutcome,
    /// Transient message to show, if any
    pub notification: Option<&'static str>,
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Feeds the search box text into the debouncer
pub async fn submit_input(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<InputRequest>,
) -> AppResult<StatusCode> {
    tracing::debug!(request_id = %request_id, text = %request.text, "Input received");

    if !state.session.submit_input(request.text) {
        return Err(AppError::Internal("Search session has shut down".to_string()));
    }

    Ok(StatusCode::ACCEPTED)
}

/// Current search state plus the trending list loaded at startup
pub async fn get_view(State(state): State<AppState>) -> Json<PresentationView> {
    Json(state.session.view())
}

/// Fresh ranked read of the trending counters
pub async fn get_trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingParams>,
) -> AppResult<Json<Vec<TrendingEntry>>> {
    let limit = params.limit.unwrap_or(state.trending_limit);
    if limit > MAX_TRENDING_LIMIT {
        return Err(AppError::InvalidInput(format!(
            "limit must be at most {}",
            MAX_TRENDING_LIMIT
        )));
    }

    let entries = state.trending.top_entries(limit).await?;
    Ok(Json(entries))
}

/// Resolves the trailer of a selected title
pub async fn resolve_trailer(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(movie_id): Path<u64>,
) -> Json<TrailerResponse> {
    let movie_id = MovieId(movie_id);
    let outcome = state.session.select_title(movie_id).await;

    tracing::info!(
        request_id = %request_id,
        movie_id = %movie_id,
        resolved = outcome.video_key().is_some(),
        "Trailer request completed"
    );

    let notification = match outcome {
        TrailerOutcome::Resolved(_) => None,
        TrailerOutcome::Unavailable(Unavailability::NoTrailer) => {
            Some(Notification::NoTrailer.message())
        }
        TrailerOutcome::Unavailable(Unavailability::LookupFailed) => {
            Some(Notification::TrailerLookupFailed.message())
        }
    };

    Json(TrailerResponse {
        movie_id,
        outcome,
        notification,
    })
}
