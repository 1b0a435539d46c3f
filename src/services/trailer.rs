use std::sync::Arc;

use crate::{
    models::{MovieId, TrailerOutcome, Unavailability, VideoEntry, VideoKey},
    services::{
        catalog::MovieCatalog,
        notify::{Notification, Notifier},
    },
};

/// Site name of the platform whose videos can be embedded
pub const CANONICAL_PLATFORM: &str = "YouTube";

const TRAILER_TYPE: &str = "Trailer";

type Tier = fn(&VideoEntry) -> bool;

/// Selection tiers, best first
const SELECTION_TIERS: [Tier; 2] = [
    |video: &VideoEntry| video.site == CANONICAL_PLATFORM && video.kind == TRAILER_TYPE,
    |video: &VideoEntry| video.site == CANONICAL_PLATFORM,
];

/// Picks the video to play: the first platform trailer, else the first
/// platform video of any type
pub fn select_video(videos: &[VideoEntry]) -> Option<&VideoEntry> {
    SELECTION_TIERS
        .iter()
        .find_map(|matches| videos.iter().find(|&video| matches(video)))
}

/// Resolves a movie to a single playable video
#[derive(Clone)]
pub struct TrailerResolver {
    catalog: Arc<dyn MovieCatalog>,
    notifier: Notifier,
}

impl TrailerResolver {
    pub fn new(catalog: Arc<dyn MovieCatalog>, notifier: Notifier) -> Self {
        Self { catalog, notifier }
    }

    /// Looks up the movie's videos and applies [`select_video`]
    ///
    /// Holds no state between calls; concurrent resolutions of the same id
    /// race independently.
    pub async fn resolve(&self, movie_id: MovieId) -> TrailerOutcome {
        let videos = match self.catalog.list_videos(movie_id).await {
            Ok(videos) => videos,
            Err(e) => {
                tracing::error!(movie_id = %movie_id, error = %e, "Error fetching trailer");
                self.notifier.notify(Notification::TrailerLookupFailed);
                return TrailerOutcome::Unavailable(Unavailability::LookupFailed);
            }
        };

        match select_video(&videos) {
            Some(video) => {
                tracing::debug!(
                    movie_id = %movie_id,
                    key = %video.key,
                    kind = %video.kind,
                    "Trailer resolved"
                );
                TrailerOutcome::Resolved(VideoKey(video.key.clone()))
            }
            None => {
                tracing::info!(
                    movie_id = %movie_id,
                    videos = videos.len(),
                    "No trailer available"
                );
                self.notifier.notify(Notification::NoTrailer);
                TrailerOutcome::Unavailable(Unavailability::NoTrailer)
            }
        }
    }
}
