//! Store backends for the dispatch cache
//!
//! The in-process backend lives in `smsflow_core::cache::MemoryStore`; this
//! module adds the Redis backend used when several dispatcher processes share
//! one recipient's counters.

#[cfg(feature = "redis-cache")]
pub mod redis_store;

#[cfg(feature = "redis-cache")]
pub use redis_store::RedisStore;

// Re-export commonly used types
pub use smsflow_core::cache::{KeyValueStore, MemoryStore};
pub use smsflow_shared::CacheConfig;
