use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::TrendingStore,
    error::{AppError, AppResult},
    models::{MovieId, TrendingEntry, TrendingMetadata},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the schema in `migrations/`
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Movie ids are stored in a signed BIGINT column
fn movie_id_column(movie_id: MovieId) -> AppResult<i64> {
    i64::try_from(movie_id.0).map_err(|e| {
        AppError::InvalidInput(format!("movie id {} out of range: {}", movie_id, e))
    })
}

#[derive(Debug, sqlx::FromRow)]
struct TrendingRow {
    search_key: String,
    title: String,
    poster_url: Option<String>,
    movie_id: i64,
    count: i64,
    last_hit_at: DateTime<Utc>,
}

impl From<TrendingRow> for TrendingEntry {
    fn from(row: TrendingRow) -> Self {
        TrendingEntry {
            key: row.search_key,
            title: row.title,
            poster_url: row.poster_url,
            movie_id: MovieId(row.movie_id.max(0) as u64),
            count: row.count.max(0) as u64,
            last_hit_at: row.last_hit_at,
        }
    }
}

/// Trending counters in the `trending_searches` table
///
/// The upsert runs as a single statement, so Postgres serializes concurrent
/// increments of the same row.
#[derive(Clone)]
pub struct PostgresTrendingStore {
    pool: PgPool,
}

impl PostgresTrendingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TrendingStore for PostgresTrendingStore {
    async fn increment_or_create(&self, key: &str, metadata: &TrendingMetadata) -> AppResult<()> {
        let movie_id = movie_id_column(metadata.movie_id)?;

        sqlx::query(
            r#"
            INSERT INTO trending_searches (search_key, title, poster_url, movie_id, count, last_hit_at)
            VALUES ($1, $2, $3, $4, 1, now())
            ON CONFLICT (search_key) DO UPDATE
            SET count = trending_searches.count + 1,
                last_hit_at = now()
            "#,
        )
        .bind(key)
        .bind(&metadata.title)
        .bind(&metadata.poster_url)
        .bind(movie_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn top_n(&self, limit: usize) -> AppResult<Vec<TrendingEntry>> {
        let rows: Vec<TrendingRow> = sqlx::query_as(
            r#"
            SELECT search_key, title, poster_url, movie_id, count, last_hit_at
            FROM trending_searches
            ORDER BY count DESC, last_hit_at DESC, search_key ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TrendingEntry::from).collect())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
