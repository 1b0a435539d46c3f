use crate::{
    error::AppResult,
    models::{TrendingEntry, TrendingMetadata},
};

/// Persisted counter store behind the trending list
///
/// Implementations must apply `increment_or_create` atomically: two
/// concurrent calls for the same key always add exactly two.
#[async_trait::async_trait]
pub trait TrendingStore: Send + Sync {
    /// Bumps the counter for `key`, creating it at 1 with `metadata` if absent
    ///
    /// Metadata of an existing entry is left as first recorded.
    async fn increment_or_create(&self, key: &str, metadata: &TrendingMetadata) -> AppResult<()>;

    /// Reads at most `limit` entries, highest count first
    ///
    /// Equal counts are ordered most recently hit first, then by key.
    async fn top_n(&self, limit: usize) -> AppResult<Vec<TrendingEntry>>;

    /// Store name for logging and debugging
    fn name(&self) -> &'static str;
}
