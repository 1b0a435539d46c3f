//! Search orchestration
//!
//! Every search gets a sequence number when it is issued. Catalog responses
//! may come back in any order; only the result of the most recently issued
//! search is ever published, everything older is dropped on arrival.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use serde::Serialize;
use tokio::sync::watch;

use crate::{
    models::{
        CatalogResponse, FailureKind, MovieSummary, Query, ResponseStatus, SearchFailure,
        SearchResult, TrendingMetadata,
    },
    services::{
        catalog::{MovieCatalog, POPULARITY_DESC},
        notify::{Notification, Notifier},
        trending::TrendingAggregator,
    },
};

/// Shown when the catalog reports failure without a message
pub const APPLICATION_FAILURE_MESSAGE: &str = "Failed to fetch movies";
/// Shown for any transport failure
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Error fetching movies. Please try again later.";

/// The currently published search state
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SearchView {
    pub query: Query,
    pub results: Vec<MovieSummary>,
    pub error: Option<SearchFailure>,
    /// True while the most recently issued search has not been published
    pub loading: bool,
    /// Sequence number of the most recently issued search
    pub latest_seq: u64,
    /// Sequence number whose result is on display, 0 before the first publish
    pub published_seq: u64,
}

impl SearchView {
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|failure| failure.message.as_str())
    }
}

/// An issued search waiting to be run
#[derive(Debug)]
pub struct SearchTicket {
    seq: u64,
    query: Query,
}

impl SearchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn query(&self) -> &Query {
        &self.query
    }
}

pub struct SearchOrchestrator {
    catalog: Arc<dyn MovieCatalog>,
    trending: TrendingAggregator,
    notifier: Notifier,
    /// Prefix for poster URLs recorded with trending hits
    image_base: String,
    next_seq: AtomicU64,
    view: watch::Sender<SearchView>,
}

impl SearchOrchestrator {
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        trending: TrendingAggregator,
        notifier: Notifier,
        image_base: String,
    ) -> Self {
        let (view, _) = watch::channel(SearchView::default());

        Self {
            catalog,
            trending,
            notifier,
            image_base,
            next_seq: AtomicU64::new(0),
            view,
        }
    }

    /// Issues and runs a search
    pub async fn search(&self, query: Query) -> SearchResult {
        let ticket = self.begin(query);
        self.run(ticket).await
    }

    /// Issues a search: assigns its sequence number and raises `loading`
    ///
    /// Any search issued earlier is superseded from this point on.
    pub fn begin(&self, query: Query) -> SearchTicket {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;

        self.view.send_modify(|view| {
            view.latest_seq = view.latest_seq.max(seq);
            view.loading = true;
        });

        tracing::debug!(seq, query = %query, "Search issued");
        SearchTicket { seq, query }
    }

    /// Runs an issued search to completion
    ///
    /// The result is always returned to the caller but only published if
    /// the ticket is still the latest one.
    pub async fn run(&self, ticket: SearchTicket) -> SearchResult {
        let SearchTicket { seq, query } = ticket;
        let result = self.fetch(query).await;

        if self.publish(seq, &result) {
            if matches!(&result.error, Some(failure) if failure.kind == FailureKind::Transport) {
                self.notifier.notify(Notification::MoviesUnavailable);
            }
        } else {
            tracing::debug!(seq, query = %result.query, "Dropping superseded search result");
        }

        self.record_trending(&result).await;
        result
    }

    /// Receiver that sees every published view
    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.view.subscribe()
    }

    /// Snapshot of the published view
    pub fn view(&self) -> SearchView {
        self.view.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.view.borrow().loading
    }

    async fn fetch(&self, query: Query) -> SearchResult {
        let response = if query.is_browse() {
            self.catalog.discover(POPULARITY_DESC).await
        } else {
            self.catalog.search_by_text(query.raw()).await
        };

        match response {
            Ok(CatalogResponse {
                status: ResponseStatus::Success,
                results,
            }) => {
                tracing::info!(query = %query, results = results.len(), "Search completed");
                SearchResult::found(query, results)
            }
            Ok(CatalogResponse {
                status: ResponseStatus::Failure { message },
                ..
            }) => {
                tracing::warn!(
                    query = %query,
                    message = message.as_deref().unwrap_or_default(),
                    "Catalog reported search failure"
                );
                let message = message.unwrap_or_else(|| APPLICATION_FAILURE_MESSAGE.to_string());
                SearchResult::failed(query, FailureKind::Application, message)
            }
            Err(e) => {
                tracing::error!(
                    query = %query,
                    error = %e,
                    transport = e.is_transport(),
                    "Error fetching movies"
                );
                SearchResult::failed(query, FailureKind::Transport, TRANSPORT_FAILURE_MESSAGE)
            }
        }
    }

    /// Replaces the view with `result` if `seq` is still the latest search
    fn publish(&self, seq: u64, result: &SearchResult) -> bool {
        self.view.send_if_modified(|view| {
            if seq != view.latest_seq {
                return false;
            }

            view.query = result.query.clone();
            view.results = result.movies.clone();
            view.error = result.error.clone();
            view.loading = false;
            view.published_seq = seq;
            true
        })
    }

    /// Counts a successful text search that found something
    ///
    /// Trending is best-effort: failures are logged and never touch the result.
    async fn record_trending(&self, result: &SearchResult) {
        if !result.is_success() {
            return;
        }
        // Whitespace-only text is searched but has no key to count under
        let key = result.query.normalized();
        if key.is_empty() {
            return;
        }
        let Some(top) = result.movies.first() else {
            return;
        };

        let metadata = TrendingMetadata {
            title: top.title.clone(),
            poster_url: top.poster_url(&self.image_base),
            movie_id: top.id,
        };

        if let Err(e) = self
            .trending
            .record_hit(&key, metadata)
            .await
        {
            tracing::error!(
                query = %result.query,
                error = %e,
                "Failed to record trending search"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{MemoryTrendingStore, TrendingStore},
        error::{AppError, AppResult},
        models::{MovieId, TrendingEntry, VideoEntry},
        services::catalog::MockMovieCatalog,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

    fn movie(id: u64, title: &str) -> MovieSummary {
        MovieSummary {
            id: MovieId(id),
            title: title.to_string(),
            poster_path: Some(format!("/{}.jpg", id)),
            vote_average: Some(7.5),
            release_date: Some("1986-07-18".to_string()),
            original_language: Some("en".to_string()),
        }
    }

    fn orchestrator(
        catalog: Arc<dyn MovieCatalog>,
        store: Arc<dyn TrendingStore>,
    ) -> SearchOrchestrator {
        SearchOrchestrator::new(
            catalog,
            TrendingAggregator::new(store),
            Notifier::new(),
            IMAGE_BASE.to_string(),
        )
    }

    /// Catalog whose text searches block until the test releases them
    #[derive(Default)]
    struct GatedCatalog {
        gates: Mutex<HashMap<String, oneshot::Receiver<AppResult<CatalogResponse>>>>,
    }

    impl GatedCatalog {
        fn gate(&self, query: &str) -> oneshot::Sender<AppResult<CatalogResponse>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(query.to_string(), rx);
            tx
        }

        async fn wait(&self, query: &str) -> AppResult<CatalogResponse> {
            let gate = self.gates.lock().unwrap().remove(query);
            match gate {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(AppError::Internal("gate dropped".to_string()))),
                None => Err(AppError::Internal(format!("no gate for {}", query))),
            }
        }
    }

    #[async_trait::async_trait]
    impl MovieCatalog for GatedCatalog {
        async fn discover(&self, _sort_by: &str) -> AppResult<CatalogResponse> {
            self.wait("").await
        }

        async fn search_by_text(&self, query: &str) -> AppResult<CatalogResponse> {
            self.wait(query).await
        }

        async fn list_videos(&self, _movie_id: MovieId) -> AppResult<Vec<VideoEntry>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl TrendingStore for FailingStore {
        async fn increment_or_create(&self, _: &str, _: &TrendingMetadata) -> AppResult<()> {
            Err(AppError::Internal("store offline".to_string()))
        }

        async fn top_n(&self, _: usize) -> AppResult<Vec<TrendingEntry>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_empty_query_uses_discover() {
        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_discover()
            .withf(|sort_by: &str| sort_by == "popularity.desc")
            .times(1)
            .returning(|_| Ok(CatalogResponse::success(vec![movie(1, "Popular")])));
        catalog.expect_search_by_text().never();

        let store = Arc::new(MemoryTrendingStore::new());
        let orchestrator = orchestrator(Arc::new(catalog), store.clone());

        let result = orchestrator.search(Query::new("")).await;

        assert_eq!(result.movies.len(), 1);
        assert!(store.top_n(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_query_uses_search_endpoint() {
        let mut catalog = MockMovieCatalog::new();
        catalog.expect_discover().never();
        catalog
            .expect_search_by_text()
            .withf(|query: &str| query == "batman")
            .times(1)
            .returning(|_| Ok(CatalogResponse::success(vec![movie(268, "Batman")])));

        let orchestrator = orchestrator(Arc::new(catalog), Arc::new(MemoryTrendingStore::new()));

        let result = orchestrator.search(Query::new("batman")).await;

        assert!(result.is_success());
        assert_eq!(result.movies[0].title, "Batman");
        assert_eq!(orchestrator.view().results, result.movies);
    }

    #[tokio::test]
    async fn test_whitespace_query_is_searched_but_not_counted() {
        let mut catalog = MockMovieCatalog::new();
        catalog.expect_discover().never();
        catalog
            .expect_search_by_text()
            .withf(|query: &str| query == "  ")
            .times(1)
            .returning(|_| Ok(CatalogResponse::success(vec![movie(603, "The Matrix")])));
        let store = Arc::new(MemoryTrendingStore::new());
        let orchestrator = orchestrator(Arc::new(catalog), store.clone());

        let result = orchestrator.search(Query::new("  ")).await;

        assert!(result.is_success());
        assert_eq!(result.movies.len(), 1);
        assert!(store.top_n(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_order_responses_publish_latest_only() {
        let catalog = Arc::new(GatedCatalog::default());
        let first = catalog.gate("alien");
        let second = catalog.gate("aliens");
        let third = catalog.gate("alien 3");

        let orchestrator = Arc::new(orchestrator(
            catalog.clone(),
            Arc::new(MemoryTrendingStore::new()),
        ));

        let tickets = [
            orchestrator.begin(Query::new("alien")),
            orchestrator.begin(Query::new("aliens")),
            orchestrator.begin(Query::new("alien 3")),
        ];
        let mut handles: Vec<_> = tickets
            .into_iter()
            .map(|ticket| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move { orchestrator.run(ticket).await })
            })
            .collect();
        let third_handle = handles.pop().unwrap();
        let second_handle = handles.pop().unwrap();
        let first_handle = handles.pop().unwrap();

        // Response 2 arrives first and is already stale
        second
            .send(Ok(CatalogResponse::success(vec![movie(679, "Aliens")])))
            .unwrap();
        let second_result = second_handle.await.unwrap();
        assert_eq!(second_result.movies[0].title, "Aliens");
        let view = orchestrator.view();
        assert!(view.loading);
        assert!(view.results.is_empty());
        assert_eq!(view.published_seq, 0);

        third
            .send(Ok(CatalogResponse::success(vec![movie(8077, "Alien³")])))
            .unwrap();
        third_handle.await.unwrap();
        let published = orchestrator.view();
        assert!(!published.loading);
        assert_eq!(published.published_seq, 3);
        assert_eq!(published.query, Query::new("alien 3"));
        assert_eq!(published.results[0].title, "Alien³");

        // Response 1 arrives last and changes nothing
        let mut rx = orchestrator.subscribe();
        rx.borrow_and_update();
        first
            .send(Ok(CatalogResponse::success(vec![movie(348, "Alien")])))
            .unwrap();
        first_handle.await.unwrap();
        assert!(!rx.has_changed().unwrap());
        assert_eq!(orchestrator.view(), published);
    }

    #[tokio::test]
    async fn test_loading_stays_up_until_latest_publishes() {
        let catalog = Arc::new(GatedCatalog::default());
        let first = catalog.gate("heat");
        let second = catalog.gate("heat 2");
        let orchestrator = Arc::new(orchestrator(
            catalog.clone(),
            Arc::new(MemoryTrendingStore::new()),
        ));

        assert!(!orchestrator.is_loading());
        let first_ticket = orchestrator.begin(Query::new("heat"));
        assert!(orchestrator.is_loading());
        let second_ticket = orchestrator.begin(Query::new("heat 2"));
        assert_eq!(second_ticket.seq(), first_ticket.seq() + 1);

        let o = orchestrator.clone();
        let first_handle = tokio::spawn(async move { o.run(first_ticket).await });
        first.send(Ok(CatalogResponse::success(vec![movie(949, "Heat")]))).unwrap();
        first_handle.await.unwrap();
        assert!(orchestrator.is_loading());

        let o = orchestrator.clone();
        let second_handle = tokio::spawn(async move { o.run(second_ticket).await });
        second.send(Ok(CatalogResponse::success(Vec::new()))).unwrap();
        second_handle.await.unwrap();
        assert!(!orchestrator.is_loading());
    }

    #[tokio::test]
    async fn test_zero_results_never_records_hit() {
        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_search_by_text()
            .returning(|_| Ok(CatalogResponse::success(Vec::new())));
        let store = Arc::new(MemoryTrendingStore::new());
        let orchestrator = orchestrator(Arc::new(catalog), store.clone());

        let result = orchestrator.search(Query::new("zzzzqx")).await;

        assert!(result.is_success());
        assert!(result.movies.is_empty());
        assert!(store.top_n(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hit_recorded_once_with_top_result() {
        let mut catalog = MockMovieCatalog::new();
        catalog.expect_search_by_text().times(1).returning(|_| {
            Ok(CatalogResponse::success(vec![
                movie(105, "Back to the Future"),
                movie(165, "Back to the Future Part II"),
            ]))
        });
        let store = Arc::new(MemoryTrendingStore::new());
        let orchestrator = orchestrator(Arc::new(catalog), store.clone());

        orchestrator.search(Query::new("  Back to the FUTURE ")).await;

        let entries = store.top_n(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "back to the future");
        assert_eq!(entries[0].count, 1);
        assert_eq!(entries[0].title, "Back to the Future");
        assert_eq!(entries[0].movie_id, MovieId(105));
        assert_eq!(
            entries[0].poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/105.jpg")
        );
    }

    #[tokio::test]
    async fn test_application_failure_uses_payload_message() {
        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_search_by_text()
            .returning(|_| Ok(CatalogResponse::failure(Some("Movie not found!".to_string()))));
        catalog
            .expect_discover()
            .returning(|_| Ok(CatalogResponse::failure(None)));
        let store = Arc::new(MemoryTrendingStore::new());
        let orchestrator = orchestrator(Arc::new(catalog), store.clone());

        let result = orchestrator.search(Query::new("nothing")).await;
        assert!(result.movies.is_empty());
        assert_eq!(
            result.error,
            Some(SearchFailure {
                kind: FailureKind::Application,
                message: "Movie not found!".to_string(),
            })
        );
        assert!(store.top_n(10).await.unwrap().is_empty());

        orchestrator.search(Query::new("")).await;
        assert_eq!(
            orchestrator.view().error_message(),
            Some(APPLICATION_FAILURE_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_transport_failure_yields_generic_message_and_notification() {
        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_search_by_text()
            .times(1)
            .returning(|_| Err(AppError::ExternalApi("TMDB API returned status 503".to_string())));
        let notifier = Notifier::new();
        let mut notifications = notifier.subscribe();
        let orchestrator = SearchOrchestrator::new(
            Arc::new(catalog),
            TrendingAggregator::new(Arc::new(MemoryTrendingStore::new())),
            notifier,
            IMAGE_BASE.to_string(),
        );

        let result = orchestrator.search(Query::new("jaws")).await;

        assert!(result.movies.is_empty());
        assert_eq!(result.error.unwrap().kind, FailureKind::Transport);
        assert_eq!(
            orchestrator.view().error_message(),
            Some(TRANSPORT_FAILURE_MESSAGE)
        );
        assert_eq!(
            notifications.try_recv().unwrap(),
            Notification::MoviesUnavailable
        );
    }

    #[tokio::test]
    async fn test_aggregation_failure_does_not_fail_search() {
        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_search_by_text()
            .returning(|_| Ok(CatalogResponse::success(vec![movie(578, "Jaws")])));
        let orchestrator = orchestrator(Arc::new(catalog), Arc::new(FailingStore));

        let result = orchestrator.search(Query::new("jaws")).await;

        assert!(result.is_success());
        assert_eq!(orchestrator.view().results[0].title, "Jaws");
        assert_eq!(orchestrator.view().error, None);
    }

    #[tokio::test]
    async fn test_stale_transport_failure_is_silent() {
        let catalog = Arc::new(GatedCatalog::default());
        let stale = catalog.gate("termin");
        let fresh = catalog.gate("terminator");
        let notifier = Notifier::new();
        let mut notifications = notifier.subscribe();
        let orchestrator = Arc::new(SearchOrchestrator::new(
            catalog.clone(),
            TrendingAggregator::new(Arc::new(MemoryTrendingStore::new())),
            notifier,
            IMAGE_BASE.to_string(),
        ));

        let stale_ticket = orchestrator.begin(Query::new("termin"));
        let fresh_ticket = orchestrator.begin(Query::new("terminator"));

        fresh
            .send(Ok(CatalogResponse::success(vec![movie(218, "The Terminator")])))
            .unwrap();
        orchestrator.run(fresh_ticket).await;

        stale
            .send(Err(AppError::ExternalApi("timeout".to_string())))
            .unwrap();
        orchestrator.run(stale_ticket).await;

        assert!(notifications.try_recv().is_err());
        assert_eq!(orchestrator.view().error, None);
        assert_eq!(orchestrator.view().results[0].title, "The Terminator");
    }

    #[tokio::test]
    async fn test_superseded_qualifying_search_still_counts() {
        let catalog = Arc::new(GatedCatalog::default());
        let older = catalog.gate("rocky");
        let newer = catalog.gate("rocky ii");
        let store = Arc::new(MemoryTrendingStore::new());
        let orchestrator = orchestrator(catalog.clone(), store.clone());

        let older_ticket = orchestrator.begin(Query::new("rocky"));
        let newer_ticket = orchestrator.begin(Query::new("rocky ii"));
        newer
            .send(Ok(CatalogResponse::success(vec![movie(1366, "Rocky II")])))
            .unwrap();
        older
            .send(Ok(CatalogResponse::success(vec![movie(1366, "Rocky")])))
            .unwrap();
        orchestrator.run(newer_ticket).await;
        orchestrator.run(older_ticket).await;

        assert_eq!(store.count("rocky").await, Some(1));
        assert_eq!(store.count("rocky ii").await, Some(1));
        assert_eq!(orchestrator.view().query, Query::new("rocky ii"));
    }
}
