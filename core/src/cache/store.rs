//! Key-value store capability consumed by the cache façade

use async_trait::async_trait;
use std::time::Duration;

use crate::errors::CacheError;

/// Remote key-value store with list and atomic counter support
///
/// Implementations must make [`incr_with_expiry`](KeyValueStore::incr_with_expiry)
/// indivisible with respect to every other client of the same store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Set `key` to `value`, replacing any previous value, expiring after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Current value of `key`, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Remove `key`, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Increment the counter at `key`; the increment that creates it also sets
    /// its expiry to `window`. Returns the counter value after the increment.
    async fn incr_with_expiry(&self, key: &str, window: Duration) -> Result<i64, CacheError>;

    /// Prepend `value` to the list at `key`, so index 0 is the newest entry
    async fn list_push(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Inclusive range read; negative indices count from the end
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, CacheError>;
}
