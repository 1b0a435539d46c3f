use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client, Script};

use crate::{
    db::TrendingStore,
    error::AppResult,
    models::{MovieId, TrendingEntry, TrendingMetadata},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrendingKey {
    /// Sorted set whose members sort lexicographically in trending order
    Rank,
    /// Hash holding the count, last hit and display metadata of one query
    Entry(String),
}

impl Display for TrendingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendingKey::Rank => write!(f, "trending:rank"),
            TrendingKey::Entry(query) => write!(f, "trending:entry:{}", query),
        }
    }
}

/// Counts are stored as `COUNT_CEILING - count`, zero-padded to 15 digits
const COUNT_CEILING: u64 = 999_999_999_999_999;
/// Hit times are stored as `MILLIS_CEILING - last_hit_ms`, zero-padded to 13 digits
const MILLIS_CEILING: i64 = 9_999_999_999_999;

/// Rank index member for one query
///
/// All members share score 0, so Redis orders them byte-wise: highest count
/// first, then most recent hit, then key ascending. Must stay in step with
/// the `member` function of [`RECORD_HIT_SCRIPT`].
fn rank_member(count: u64, last_hit_ms: i64, key: &str) -> String {
    format!(
        "{:015}:{:013}:{}",
        COUNT_CEILING - count.min(COUNT_CEILING),
        MILLIS_CEILING - last_hit_ms.clamp(0, MILLIS_CEILING),
        key
    )
}

/// Inverse of [`rank_member`]
fn parse_rank_member(member: &str) -> Option<(u64, i64, &str)> {
    let mut parts = member.splitn(3, ':');
    let count = COUNT_CEILING.checked_sub(parts.next()?.parse().ok()?)?;
    let last_hit_ms = MILLIS_CEILING - parts.next()?.parse::<i64>().ok()?;
    let key = parts.next()?;
    Some((count, last_hit_ms, key))
}

/// Increments one query atomically
///
/// KEYS: entry hash, rank index.
/// ARGV: query, now in ms, title, movie id, poster url ("" when absent).
/// Metadata is written only when the entry is created.
const RECORD_HIT_SCRIPT: &str = r#"
local entry, rank = KEYS[1], KEYS[2]
local key, now = ARGV[1], tonumber(ARGV[2])

local function member(count, ms)
  return string.format('%015d:%013d:%s', 999999999999999 - count, 9999999999999 - ms, key)
end

local count = tonumber(redis.call('HGET', entry, 'count') or '0')
local last = tonumber(redis.call('HGET', entry, 'last_hit_ms') or '0')

if count > 0 then
  redis.call('ZREM', rank, member(count, last))
else
  redis.call('HSET', entry, 'title', ARGV[3], 'movie_id', ARGV[4])
  if ARGV[5] ~= '' then
    redis.call('HSET', entry, 'poster_url', ARGV[5])
  end
end

count = count + 1
if now < last then
  now = last
end

redis.call('HSET', entry, 'count', count, 'last_hit_ms', now)
redis.call('ZADD', rank, 0, member(count, now))
return count
"#;

/// Creates a Redis client for the trending store
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Trending counters kept in Redis
///
/// Each query has a hash with its count and metadata, plus one member in the
/// rank index. A hit is a single Lua script, so the hash and the index never
/// disagree. Reading the top N touches at most N index members and N hashes,
/// plus any members whose hash has gone missing.
#[derive(Clone)]
pub struct RedisTrendingStore {
    redis_client: Client,
    record_hit: Arc<Script>,
}

impl RedisTrendingStore {
    pub fn new(redis_client: Client) -> Self {
        Self {
            redis_client,
            record_hit: Arc::new(Script::new(RECORD_HIT_SCRIPT)),
        }
    }

    fn parse_entry(member: &str, fields: HashMap<String, String>) -> Option<TrendingEntry> {
        let (count, last_hit_ms, key) = parse_rank_member(member)?;
        let title = fields.get("title")?.clone();
        let movie_id = fields.get("movie_id")?.parse().ok()?;

        Some(TrendingEntry {
            key: key.to_string(),
            title,
            poster_url: fields.get("poster_url").cloned(),
            movie_id: MovieId(movie_id),
            count,
            last_hit_at: DateTime::<Utc>::from_timestamp_millis(last_hit_ms).unwrap_or_default(),
        })
    }
}

#[async_trait::async_trait]
impl TrendingStore for RedisTrendingStore {
    async fn increment_or_create(&self, key: &str, metadata: &TrendingMetadata) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let count: u64 = self
            .record_hit
            .key(TrendingKey::Entry(key.to_string()).to_string())
            .key(TrendingKey::Rank.to_string())
            .arg(key)
            .arg(Utc::now().timestamp_millis())
            .arg(&metadata.title)
            .arg(metadata.movie_id.0)
            .arg(metadata.poster_url.as_deref().unwrap_or(""))
            .invoke_async(&mut conn)
            .await?;

        tracing::trace!(key = %key, count, "Redis trending counter bumped");
        Ok(())
    }

    async fn top_n(&self, limit: usize) -> AppResult<Vec<TrendingEntry>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let rank_key = TrendingKey::Rank.to_string();

        let mut entries = Vec::with_capacity(limit);
        let mut offset = 0;

        // Members are already in trending order; page forward only past
        // entries whose metadata cannot be read
        while entries.len() < limit {
            let wanted = limit - entries.len();
            let members: Vec<String> = conn
                .zrange(&rank_key, offset, offset + wanted as isize - 1)
                .await?;
            if members.is_empty() {
                break;
            }
            offset += members.len() as isize;

            let mut pipe = redis::pipe();
            for member in &members {
                let key = parse_rank_member(member).map_or("", |(_, _, key)| key);
                pipe.hgetall(TrendingKey::Entry(key.to_string()).to_string());
            }
            let hashes: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;

            for (member, fields) in members.iter().zip(hashes) {
                match Self::parse_entry(member, fields) {
                    Some(entry) => entries.push(entry),
                    None => tracing::warn!(member = %member, "Trending entry has no readable metadata"),
                }
            }
        }

        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
