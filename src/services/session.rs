//! One user's search session
//!
//! Wires raw input through the debouncer into the orchestrator, loads the
//! trending list once at start and hands trailer selections to the resolver.
//! The presentation only reads [`PresentationView`] snapshots and calls
//! [`MovieSession::submit_input`] / [`MovieSession::select_title`].

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{
    models::{MovieId, MovieSummary, Query, TrailerOutcome, TrendingEntry},
    services::{
        debounce::{self, DebounceInput, DebounceOutput, DEFAULT_QUIET_PERIOD},
        search::{SearchOrchestrator, SearchTicket, SearchView},
        trailer::TrailerResolver,
        trending::TrendingAggregator,
    },
};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub quiet_period: Duration,
    pub trending_limit: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            trending_limit: 5,
        }
    }
}

/// Everything the presentation needs to render
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PresentationView {
    pub loading: bool,
    pub error_message: Option<String>,
    pub query: String,
    pub results: Vec<MovieSummary>,
    pub trending: Vec<TrendingEntry>,
}

pub struct MovieSession {
    input: DebounceInput<String>,
    orchestrator: Arc<SearchOrchestrator>,
    trailers: TrailerResolver,
    trending: Vec<TrendingEntry>,
    pump: JoinHandle<()>,
}

impl MovieSession {
    /// Loads trending, starts a browse search and begins listening for input
    pub async fn start(
        orchestrator: Arc<SearchOrchestrator>,
        trending: &TrendingAggregator,
        trailers: TrailerResolver,
        settings: SessionSettings,
    ) -> Self {
        let trending = match trending.top_entries(settings.trending_limit).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, "Error fetching trending movies");
                Vec::new()
            }
        };

        let (input, output) = debounce::channel(settings.quiet_period);

        let initial = Query::default();
        spawn_search(orchestrator.clone(), orchestrator.begin(initial.clone()));
        let pump = tokio::spawn(pump_input(
            orchestrator.clone(),
            output,
            initial.raw().to_string(),
        ));

        tracing::info!(
            trending = trending.len(),
            quiet_period_ms = settings.quiet_period.as_millis() as u64,
            "Movie session started"
        );

        Self {
            input,
            orchestrator,
            trailers,
            trending,
            pump,
        }
    }

    /// Feeds the current text of the search box
    pub fn submit_input(&self, text: impl Into<String>) -> bool {
        self.input.push(text.into())
    }

    /// Resolves the trailer for a clicked title
    pub async fn select_title(&self, movie_id: MovieId) -> TrailerOutcome {
        self.trailers.resolve(movie_id).await
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.orchestrator.subscribe()
    }

    pub fn view(&self) -> PresentationView {
        let search = self.orchestrator.view();

        PresentationView {
            loading: search.loading,
            error_message: search.error_message().map(str::to_string),
            query: search.query.raw().to_string(),
            results: search.results,
            trending: self.trending.clone(),
        }
    }
}

impl Drop for MovieSession {
    fn drop(&mut self) {
        // Drops the debounce output too, cancelling any pending timer
        self.pump.abort();
    }
}

fn spawn_search(orchestrator: Arc<SearchOrchestrator>, ticket: SearchTicket) {
    tokio::spawn(async move {
        orchestrator.run(ticket).await;
    });
}

/// Issues a search for every settled input that differs from the last one
async fn pump_input(
    orchestrator: Arc<SearchOrchestrator>,
    mut debounced: DebounceOutput<String>,
    mut last: String,
) {
    while let Some(text) = debounced.recv().await {
        if text == last {
            tracing::trace!(query = %text, "Settled input unchanged, not searching");
            continue;
        }
        last = text.clone();

        // Tickets are issued here, in input order, even though runs overlap
        let ticket = orchestrator.begin(Query::new(text));
        spawn_search(orchestrator.clone(), ticket);
    }
}
