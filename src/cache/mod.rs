//! Markfresh cache store
//!
//! Key-value storage for rendered documents, keyed by the locator's canonical
//! URL. Two backends share the [`CacheStore`] contract:
//!
//! - **Redis**: the production backend, TTL enforced by the server
//! - **Memory**: a process-local map used for the `memory` backend and tests
//!
//! The [`Reaper`] sweeps either backend for keys whose expiry never fired.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//! ttl_seconds = 43200
//! ```

mod config;
mod entry;
mod memory;
mod reaper;
mod redis_store;
mod store;

pub use config::CacheConfig;
pub use entry::CachedEntry;
pub use memory::MemoryStore;
pub use reaper::{Reaper, SweepReport};
pub use redis_store::{RedisStore, parse_memory_info};
pub use store::{CacheStats, CacheStore, KeyTtl, StoreError};
