//! Redis-backed store.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use redis::{Client, RedisError, aio::ConnectionManager};
use tokio::time::timeout;
use tracing::{info, warn};

use super::{
    config::CacheConfig,
    entry::CachedEntry,
    store::{CacheStats, CacheStore, KeyTtl, StoreError},
};

const SOURCE: &str = "markfresh::cache::redis";

/// Store adapter over a multiplexed, auto-reconnecting Redis connection.
///
/// The handle is cheap to clone; every clone shares the same connection.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect, verify the server answers `PING`, and apply the configured
    /// eviction policy. Servers that forbid `CONFIG SET` only produce a warning.
    pub async fn connect(config: &CacheConfig) -> Result<Self, StoreError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout(config.connect_timeout))??;

        let store = Self { connection };
        store.ping(config.connect_timeout).await?;

        if let Some(policy) = config.maxmemory_policy.as_deref() {
            store.apply_eviction_policy(policy).await;
        }

        info!(target: SOURCE, url = %redacted(&config.redis_url), "Connected to Redis");
        Ok(store)
    }

    async fn ping(&self, limit: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _pong: String = timeout(limit, redis::cmd("PING").query_async(&mut conn))
            .await
            .map_err(|_| StoreError::Timeout(limit))??;
        Ok(())
    }

    async fn apply_eviction_policy(&self, policy: &str) {
        let mut conn = self.connection.clone();
        let result: Result<(), RedisError> = redis::cmd("CONFIG")
            .arg("SET")
            .arg("maxmemory-policy")
            .arg(policy)
            .query_async(&mut conn)
            .await;

        if let Err(err) = result {
            warn!(
                target: SOURCE,
                policy,
                error = %err,
                "Failed to apply Redis maxmemory-policy"
            );
        }
    }
}

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        StoreError::unavailable(err.to_string())
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CachedEntry>, StoreError> {
        let mut conn = self.connection.clone();
        let payload: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        payload.as_deref().map(CachedEntry::decode).transpose()
    }

    async fn set(&self, key: &str, entry: &CachedEntry, ttl: Duration) -> Result<(), StoreError> {
        let payload = entry.encode()?;
        let mut conn = self.connection.clone();
        let () = redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _removed: u64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn scan(&self, cursor: u64, count: usize) -> Result<(u64, Vec<String>), StoreError> {
        let mut conn = self.connection.clone();
        let page: (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg("*")
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok(page)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let mut conn = self.connection.clone();
        let seconds: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;
        Ok(KeyTtl::from_redis_seconds(seconds))
    }

    async fn stats(&self) -> Result<CacheStats, StoreError> {
        let mut conn = self.connection.clone();
        let total_keys: u64 = redis::cmd("DBSIZE").query_async(&mut conn).await?;
        let info: String = redis::cmd("INFO")
            .arg("memory")
            .query_async(&mut conn)
            .await?;

        Ok(CacheStats {
            total_keys,
            memory: parse_memory_info(&info),
        })
    }
}

/// Parse an `INFO` reply into a flat map, skipping section headers.
pub fn parse_memory_info(info: &str) -> BTreeMap<String, String> {
    info.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn redacted(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
