use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    db::TrendingStore,
    error::AppResult,
    models::{trending::rank, TrendingEntry, TrendingMetadata},
};

/// Process-local trending store, for development and tests
#[derive(Default)]
pub struct MemoryTrendingStore {
    entries: Mutex<HashMap<String, TrendingEntry>>,
}

impl MemoryTrendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for a key, if it exists
    pub async fn count(&self, key: &str) -> Option<u64> {
        self.entries.lock().await.get(key).map(|entry| entry.count)
    }
}

#[async_trait::async_trait]
impl TrendingStore for MemoryTrendingStore {
    async fn increment_or_create(&self, key: &str, metadata: &TrendingMetadata) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        let now = Utc::now();

        entries
            .entry(key.to_string())
            .and_modify(|entry| {
                entry.count += 1;
                // Wall clock may step backwards
                entry.last_hit_at = now.max(entry.last_hit_at);
            })
            .or_insert_with(|| TrendingEntry::new(key, metadata.clone(), now));

        Ok(())
    }

    async fn top_n(&self, limit: usize) -> AppResult<Vec<TrendingEntry>> {
        let entries = self.entries.lock().await;

        let mut ranked: Vec<TrendingEntry> = entries.values().cloned().collect();
        ranked.sort_by(rank);
        ranked.truncate(limit);

        Ok(ranked)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
