//! Cache configuration.

use std::time::Duration;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_TTL_SECS: u64 = 12 * 60 * 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MAXMEMORY_POLICY: &str = "allkeys-lru";

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Connection URL for the Redis backend.
    pub redis_url: String,
    /// Expiry attached to every write.
    pub ttl: Duration,
    /// Eviction policy applied on connect; `None` leaves the server untouched.
    pub maxmemory_policy: Option<String>,
    /// Upper bound for connecting and the initial `PING`.
    pub connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            maxmemory_policy: Some(DEFAULT_MAXMEMORY_POLICY.to_string()),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            redis_url: settings.redis_url.clone(),
            ttl: settings.ttl,
            maxmemory_policy: settings.maxmemory_policy.clone(),
            connect_timeout: settings.connect_timeout,
        }
    }
}
