use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MovieId;

/// Display data stored with a trending counter, taken from the top search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingMetadata {
    pub title: String,
    pub poster_url: Option<String>,
    pub movie_id: MovieId,
}

/// A persisted counter of qualifying searches for one normalized query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingEntry {
    /// Normalized query text
    pub key: String,
    pub title: String,
    pub poster_url: Option<String>,
    pub movie_id: MovieId,
    pub count: u64,
    pub last_hit_at: DateTime<Utc>,
}

impl TrendingEntry {
    pub fn new(key: impl Into<String>, metadata: TrendingMetadata, hit_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            title: metadata.title,
            poster_url: metadata.poster_url,
            movie_id: metadata.movie_id,
            count: 1,
            last_hit_at: hit_at,
        }
    }
}

/// Trending order for every store: count descending, then most recently hit,
/// then key for a total order.
pub fn rank(a: &TrendingEntry, b: &TrendingEntry) -> std::cmp::Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| b.last_hit_at.cmp(&a.last_hit_at))
        .then_with(|| a.key.cmp(&b.key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(key: &str, count: u64, hit_at: DateTime<Utc>) -> TrendingEntry {
        TrendingEntry {
            key: key.to_string(),
            title: key.to_string(),
            poster_url: None,
            movie_id: MovieId(1),
            count,
            last_hit_at: hit_at,
        }
    }

    #[test]
    fn test_new_entry_starts_at_one() {
        let metadata = TrendingMetadata {
            title: "Dune".to_string(),
            poster_url: Some("https://image.tmdb.org/t/p/w500/d5NXSklXo0qyIYkgV94XAgMIckC.jpg".to_string()),
            movie_id: MovieId(438631),
        };
        let entry = TrendingEntry::new("dune", metadata, Utc::now());

        assert_eq!(entry.count, 1);
        assert_eq!(entry.title, "Dune");
        assert_eq!(entry.movie_id, MovieId(438631));
    }

    #[test]
    fn test_rank_orders_by_count_then_recency() {
        let now = Utc::now();
        let mut entries = vec![
            entry("alien", 3, now),
            entry("batman", 5, now - Duration::seconds(10)),
            entry("cars", 5, now),
            entry("dune", 1, now),
        ];

        entries.sort_by(rank);

        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["cars", "batman", "alien", "dune"]);
    }

    #[test]
    fn test_rank_falls_back_to_key() {
        let now = Utc::now();
        let mut entries = vec![entry("zodiac", 2, now), entry("amelie", 2, now)];

        entries.sort_by(rank);

        assert_eq!(entries[0].key, "amelie");
    }
}
