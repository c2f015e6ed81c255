//! Redis store backend
//!
//! Implements the dispatcher's key-value capability over a multiplexed Redis
//! connection. Transient failures are retried with exponential backoff; the
//! rate-limit counter is incremented by a server-side Lua script so the
//! increment and its first-write expiry are one indivisible operation.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError, RedisResult, Script};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use smsflow_core::cache::KeyValueStore;
use smsflow_core::errors::CacheError;
use smsflow_shared::CacheConfig;

use crate::InfrastructureError;

/// INCR, set PEXPIRE on the increment that created the key, return the count
const INCR_WITH_EXPIRY: &str = r#"
local count = redis.call("INCR", KEYS[1])
if count == 1 then
    redis.call("PEXPIRE", KEYS[1], ARGV[1])
end
return count
"#;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Redis-backed [`KeyValueStore`]
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
    incr_script: Script,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl RedisStore {
    /// Connect to the Redis server named by `config.url`
    pub async fn connect(config: &CacheConfig) -> Result<Self, InfrastructureError> {
        Self::connect_with_retry(config, 3, 100).await
    }

    /// Connect with a custom retry policy for both connecting and commands
    ///
    /// # Arguments
    /// * `config` - Cache configuration carrying the Redis URL
    /// * `max_retries` - Maximum number of attempts per operation
    /// * `retry_delay_ms` - Initial backoff, doubled per attempt up to 5 seconds
    pub async fn connect_with_retry(
        config: &CacheConfig,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<Self, InfrastructureError> {
        info!(url = %mask_url(&config.url), "connecting to Redis");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!(error = %e, "invalid Redis URL");
            InfrastructureError::InvalidUrl(e.to_string())
        })?;

        let mut attempts = 0;
        let mut delay = retry_delay_ms;
        let connection = loop {
            attempts += 1;
            match client.get_multiplexed_async_connection().await {
                Ok(connection) => break connection,
                Err(e) if attempts < max_retries => {
                    warn!(attempt = attempts, max_retries, delay_ms = delay, error = %e, "Redis connect failed, retrying");
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(5000);
                }
                Err(e) => {
                    error!(attempts, error = %e, "could not connect to Redis");
                    return Err(InfrastructureError::Cache(e));
                }
            }
        };

        info!("Redis store connected");
        Ok(Self {
            connection,
            incr_script: Script::new(INCR_WITH_EXPIRY),
            max_retries: max_retries.max(1),
            retry_delay_ms,
        })
    }

    /// PING the server
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        let response = self
            .execute_with_retry(|mut conn| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            })
            .await?;
        Ok(response == "PONG")
    }

    async fn execute_with_retry<F, T>(&self, operation: F) -> RedisResult<T>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay_ms;

        loop {
            attempts += 1;
            match operation(self.connection.clone()).await {
                Ok(result) => return Ok(result),
                Err(e) if attempts < self.max_retries && is_retriable_error(&e) => {
                    warn!(attempt = attempts, max_retries = self.max_retries, delay_ms = delay, error = %e, "Redis command failed, retrying");
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(5000);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let ttl_ms = ttl.as_millis() as u64;
        self.execute_with_retry(|mut conn| {
            let key = key.to_string();
            let value = value.to_string();
            Box::pin(async move {
                let mut cmd = redis::cmd("SET");
                cmd.arg(key).arg(value);
                if ttl_ms > 0 {
                    cmd.arg("PX").arg(ttl_ms);
                }
                cmd.query_async::<_, ()>(&mut conn).await
            })
        })
        .await
        .map_err(|e| cache_error("SET", key, e))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.execute_with_retry(|mut conn| {
            let key = key.to_string();
            Box::pin(async move { conn.get::<_, Option<String>>(key).await })
        })
        .await
        .map_err(|e| cache_error("GET", key, e))
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let deleted = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();
                Box::pin(async move { conn.del::<_, u32>(key).await })
            })
            .await
            .map_err(|e| cache_error("DEL", key, e))?;
        Ok(deleted > 0)
    }

    async fn incr_with_expiry(&self, key: &str, window: Duration) -> Result<i64, CacheError> {
        let window_ms = window.as_millis() as u64;
        let count = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();
                let script = self.incr_script.clone();
                Box::pin(async move { script.key(key).arg(window_ms).invoke_async::<_, i64>(&mut conn).await })
            })
            .await
            .map_err(|e| cache_error("EVALSHA", key, e))?;
        debug!(key, count, "counter incremented");
        Ok(count)
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.execute_with_retry(|mut conn| {
            let key = key.to_string();
            let value = value.to_string();
            Box::pin(async move { conn.lpush::<_, _, ()>(key, value).await })
        })
        .await
        .map_err(|e| cache_error("LPUSH", key, e))
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, CacheError> {
        self.execute_with_retry(|mut conn| {
            let key = key.to_string();
            Box::pin(async move { conn.lrange::<_, Vec<String>>(key, start, stop).await })
        })
        .await
        .map_err(|e| cache_error("LRANGE", key, e))
    }
}

/// Translate a Redis failure into the store-level error
fn cache_error(command: &str, key: &str, error: RedisError) -> CacheError {
    error!(command, key, error = %error, "Redis command failed");
    if error.is_io_error() || error.is_connection_dropped() || error.is_connection_refusal() || error.is_timeout() {
        CacheError::Unavailable {
            message: error.to_string(),
        }
    } else {
        CacheError::Backend {
            message: format!("{} failed: {}", command, error),
        }
    }
}

pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::ClientError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Hide credentials in a Redis URL
pub(crate) fn mask_url(url: &str) -> String {
    if let (Some(at_pos), Some(proto_end)) = (url.find('@'), url.find("://")) {
        return format!("{}****{}", &url[..proto_end + 3], &url[at_pos..]);
    }
    url.to_string()
}
