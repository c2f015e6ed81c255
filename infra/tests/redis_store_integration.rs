//! Integration tests for the Redis store
//!
//! These tests require a running Redis instance to execute.
//! Run with: cargo test -p smsflow_infra --test redis_store_integration -- --ignored

use std::sync::Arc;
use std::time::Duration;

use smsflow_core::{KeyValueStore, SmsCache};
use smsflow_infra::RedisStore;
use smsflow_shared::{CacheConfig, RateLimitConfig};

fn config() -> CacheConfig {
    CacheConfig::new(std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()))
        .with_prefix(format!("smsflow-test:{}:", uuid::Uuid::new_v4()))
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_redis_connection() -> anyhow::Result<()> {
    let store = RedisStore::connect(&config()).await?;
    assert!(store.health_check().await?);
    Ok(())
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_counter_expiry_set_on_first_increment() -> anyhow::Result<()> {
    let config = config();
    let store = RedisStore::connect(&config).await?;
    let key = config.make_key("counter");

    assert_eq!(store.incr_with_expiry(&key, Duration::from_millis(300)).await?, 1);
    assert_eq!(store.incr_with_expiry(&key, Duration::from_millis(300)).await?, 2);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(store.incr_with_expiry(&key, Duration::from_millis(300)).await?, 1);
    store.delete(&key).await?;
    Ok(())
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_verification_code_roundtrip() -> anyhow::Result<()> {
    let store = Arc::new(RedisStore::connect(&config()).await?);
    let cache = SmsCache::new(store, config());
    let phone = "13800138000";

    cache.save_code(phone, "123456", Duration::from_secs(60)).await?;
    assert_eq!(cache.get_code(phone).await?, "123456");

    cache.delete_code(phone).await?;
    assert!(cache.get_code(phone).await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_rate_limit_shared_across_connections() -> anyhow::Result<()> {
    let config = config().with_rate_limit(RateLimitConfig::new(3, 60));
    let first = SmsCache::new(Arc::new(RedisStore::connect(&config).await?), config.clone());
    let second = SmsCache::new(Arc::new(RedisStore::connect(&config).await?), config.clone());
    let phone = "13800138001";

    assert!(first.check_limit(phone).await?);
    assert!(second.check_limit(phone).await?);
    assert!(first.check_limit(phone).await?);
    assert!(!second.check_limit(phone).await?);

    first.store().delete(&config.make_key(&format!("limit:{}", phone))).await?;
    Ok(())
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_failover_records_newest_first() -> anyhow::Result<()> {
    let config = config();
    let cache = SmsCache::new(Arc::new(RedisStore::connect(&config).await?), config);
    let phone = "13800138002";

    cache.save_failover_record(phone, "a", "b").await?;
    cache.save_failover_record(phone, "b", "c").await?;

    let records = cache.get_failover_records(phone, 10).await?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].failed_provider, "b");
    assert_eq!(records[1].failed_provider, "a");
    Ok(())
}
