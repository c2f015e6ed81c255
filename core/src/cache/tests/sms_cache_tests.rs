//! Unit tests for SmsCache

use std::sync::Arc;
use std::time::Duration;

use smsflow_shared::{CacheConfig, RateLimitConfig};

use crate::cache::{KeyValueStore, MemoryStore, SmsCache};
use crate::errors::CacheError;

fn cache_with(rate_limit: RateLimitConfig) -> (Arc<MemoryStore>, SmsCache<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let config = CacheConfig::default().with_rate_limit(rate_limit);
    (store.clone(), SmsCache::new(store, config))
}

#[tokio::test]
async fn test_save_and_get_code() {
    let (store, cache) = cache_with(RateLimitConfig::default());

    cache.save_code("13800138000", "123456", Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache.get_code("13800138000").await.unwrap(), "123456");
    assert!(store.contains_key("sms:verify:13800138000"));

    // a later code replaces the earlier one
    cache.save_code("13800138000", "654321", Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache.get_code("13800138000").await.unwrap(), "654321");
}

#[tokio::test(start_paused = true)]
async fn test_zero_ttl_uses_code_ttl() {
    let (_, cache) = cache_with(RateLimitConfig::default());
    cache.save_code("13800138000", "123456", Duration::ZERO).await.unwrap();

    tokio::time::advance(Duration::from_secs(299)).await;
    assert!(cache.get_code("13800138000").await.is_ok());

    tokio::time::advance(Duration::from_secs(2)).await;
    let err = cache.get_code("13800138000").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_code_is_idempotent() {
    let (_, cache) = cache_with(RateLimitConfig::default());
    cache.save_code("13800138000", "123456", Duration::from_secs(60)).await.unwrap();

    cache.delete_code("13800138000").await.unwrap();
    cache.delete_code("13800138000").await.unwrap();
    assert!(cache.get_code("13800138000").await.unwrap_err().is_not_found());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_window() {
    let (_, cache) = cache_with(RateLimitConfig::new(3, 60));

    for _ in 0..3 {
        assert!(cache.check_limit("13800138000").await.unwrap());
    }
    assert!(!cache.check_limit("13800138000").await.unwrap());

    // other recipients have their own counter
    assert!(cache.check_limit("13900139000").await.unwrap());

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(cache.check_limit("13800138000").await.unwrap());
}

#[tokio::test]
async fn test_rate_limit_disabled_skips_store() {
    let (store, cache) = cache_with(RateLimitConfig::disabled());

    for _ in 0..20 {
        assert!(cache.check_limit("13800138000").await.unwrap());
    }
    assert_eq!(store.operations(), 0);
}

#[tokio::test]
async fn test_concurrent_limit_checks_admit_exactly_max() {
    let (_, cache) = cache_with(RateLimitConfig::new(5, 3600));
    let cache = Arc::new(cache);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.check_limit("13800138000").await.unwrap() }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 5);
}

#[tokio::test]
async fn test_record_attempt_appends() {
    let (store, cache) = cache_with(RateLimitConfig::default());
    cache.record_attempt("13800138000").await.unwrap();
    cache.record_attempt("13800138000").await.unwrap();

    let attempts = store.list_range("sms:attempt:13800138000", 0, -1).await.unwrap();
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|ts| ts.parse::<i64>().is_ok()));
}

#[tokio::test]
async fn test_failover_records_newest_first() {
    let (_, cache) = cache_with(RateLimitConfig::default());
    cache.save_failover_record("13800138000", "aliyun", "tencent").await.unwrap();
    cache.save_failover_record("13800138000", "tencent", "huawei").await.unwrap();

    let records = cache.get_failover_records("13800138000", 0).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].failed_provider, "tencent");
    assert_eq!(records[0].success_provider, "huawei");
    assert_eq!(records[1].failed_provider, "aliyun");

    let latest = cache.get_failover_records("13800138000", 1).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].success_provider, "huawei");
}

#[tokio::test]
async fn test_store_outage_surfaces_unchanged() {
    let (store, cache) = cache_with(RateLimitConfig::default());
    store.set_unavailable(true);

    let err = cache.check_limit("13800138000").await.unwrap_err();
    assert!(matches!(err, CacheError::Unavailable { .. }));
}
