pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use self::memory::MemoryTrendingStore;
pub use self::postgres::{create_pool, run_migrations, PostgresTrendingStore};
pub use self::redis::{create_redis_client, RedisTrendingStore};
pub use self::store::TrendingStore;

use std::sync::Arc;

use crate::config::{Config, TrendingBackend};

/// Builds the trending store selected by `config.trending_backend`
pub async fn connect_trending_store(config: &Config) -> anyhow::Result<Arc<dyn TrendingStore>> {
    let store: Arc<dyn TrendingStore> = match config.trending_backend {
        TrendingBackend::Memory => Arc::new(MemoryTrendingStore::new()),
        TrendingBackend::Postgres => {
            let pool = create_pool(&config.database_url).await?;
            run_migrations(&pool).await?;
            Arc::new(PostgresTrendingStore::new(pool))
        }
        TrendingBackend::Redis => {
            let client = create_redis_client(&config.redis_url)?;
            Arc::new(RedisTrendingStore::new(client))
        }
    };

    tracing::info!(store = store.name(), "Trending store ready");
    Ok(store)
}
