use std::sync::Arc;

use crate::{
    db::TrendingStore,
    error::{AppError, AppResult},
    models::{TrendingEntry, TrendingMetadata},
};

/// Records qualifying searches and reads the ranked trending list
///
/// The aggregator owns no storage; every operation is a single logical call
/// into the configured [`TrendingStore`].
#[derive(Clone)]
pub struct TrendingAggregator {
    store: Arc<dyn TrendingStore>,
}

impl TrendingAggregator {
    pub fn new(store: Arc<dyn TrendingStore>) -> Self {
        Self { store }
    }

    /// Counts one hit for `normalized_query`
    ///
    /// Store failures come back as [`AppError::Aggregation`].
    pub async fn record_hit(
        &self,
        normalized_query: &str,
        metadata: TrendingMetadata,
    ) -> AppResult<()> {
        if normalized_query.is_empty() {
            return Err(AppError::InvalidInput(
                "Trending key cannot be empty".to_string(),
            ));
        }

        self.store
            .increment_or_create(normalized_query, &metadata)
            .await
            .map_err(|e| AppError::Aggregation(e.to_string()))?;

        tracing::debug!(
            query = %normalized_query,
            title = %metadata.title,
            store = self.store.name(),
            "Trending hit recorded"
        );

        Ok(())
    }

    /// Top `limit` entries by count
    pub async fn top_entries(&self, limit: usize) -> AppResult<Vec<TrendingEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        self.store
            .top_n(limit)
            .await
            .map_err(|e| AppError::Aggregation(e.to_string()))
    }
}
