use std::sync::Arc;

use crate::{
    db::TrendingStore,
    services::{
        MovieCatalog, MovieSession, Notifier, SearchOrchestrator, SessionSettings,
        TrailerResolver, TrendingAggregator,
    },
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<MovieSession>,
    pub trending: TrendingAggregator,
    pub notifier: Notifier,
    pub trending_limit: usize,
}

impl AppState {
    /// Assembles the services around a catalog and a trending store and
    /// starts the session
    pub async fn new(
        catalog: Arc<dyn MovieCatalog>,
        store: Arc<dyn TrendingStore>,
        image_base: String,
        settings: SessionSettings,
    ) -> Self {
        let notifier = Notifier::new();
        let trending = TrendingAggregator::new(store);

        let orchestrator = Arc::new(SearchOrchestrator::new(
            catalog.clone(),
            trending.clone(),
            notifier.clone(),
            image_base,
        ));
        let trailers = TrailerResolver::new(catalog, notifier.clone());

        let trending_limit = settings.trending_limit;
        let session = MovieSession::start(orchestrator, &trending, trailers, settings).await;

        Self {
            session: Arc::new(session),
            trending,
            notifier,
            trending_limit,
        }
    }
}
