//! Unit tests for FailoverCoordinator

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

use smsflow_shared::{FailoverConfig, FailoverStrategy, ProviderRoster};

use crate::cancel::cancellation;
use crate::errors::SmsError;
use crate::providers::{ProviderRegistry, ScriptedProvider, SmsProvider};
use crate::services::failover::FailoverCoordinator;

fn registry(names: &[&str]) -> ProviderRegistry {
    names.iter().fold(ProviderRegistry::new(), |registry, name| {
        registry.with(Arc::new(ScriptedProvider::succeeding(name)))
    })
}

fn coordinator(strategy: FailoverStrategy) -> FailoverCoordinator {
    let roster = ProviderRoster::new("primary", ["backup1", "backup2"]);
    let config = FailoverConfig::default().with_strategy(strategy);
    FailoverCoordinator::new(&roster, &registry(&["primary", "backup1", "backup2"]), &config).unwrap()
}

async fn pick(coordinator: &FailoverCoordinator) -> String {
    coordinator.get_available_provider().await.name().to_string()
}

#[tokio::test]
async fn test_sequential_prefers_primary() {
    let coordinator = coordinator(FailoverStrategy::Sequential);
    assert_eq!(pick(&coordinator).await, "primary");
    assert_eq!(pick(&coordinator).await, "primary");
}

#[tokio::test]
async fn test_sequential_skips_unhealthy_primary() {
    let coordinator = coordinator(FailoverStrategy::Sequential);
    coordinator.mark_provider_failed("primary").await;
    assert_eq!(pick(&coordinator).await, "backup1");

    coordinator.mark_provider_failed("backup1").await;
    assert_eq!(pick(&coordinator).await, "backup2");
}

#[tokio::test]
async fn test_all_cooling_down_falls_back_to_primary() {
    for strategy in [FailoverStrategy::Sequential, FailoverStrategy::Random, FailoverStrategy::RoundRobin] {
        let coordinator = coordinator(strategy);
        for name in ["primary", "backup1", "backup2"] {
            coordinator.mark_provider_failed(name).await;
        }
        assert_eq!(pick(&coordinator).await, "primary", "strategy {:?}", strategy);
    }
}

#[tokio::test]
async fn test_cooldown_expiry_makes_primary_eligible_again() {
    let coordinator = coordinator(FailoverStrategy::Sequential).with_cooldown(Duration::from_millis(50));
    coordinator.mark_provider_failed("primary").await;
    assert_eq!(pick(&coordinator).await, "backup1");

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(pick(&coordinator).await, "primary");

    // eligible again, but still unhealthy until marked
    let status = coordinator.get_health_status().await;
    assert!(!status[0].healthy);
}

#[tokio::test]
async fn test_round_robin_rotates_and_wraps() {
    let coordinator = coordinator(FailoverStrategy::RoundRobin);
    let picks = vec![
        pick(&coordinator).await,
        pick(&coordinator).await,
        pick(&coordinator).await,
        pick(&coordinator).await,
    ];
    assert_eq!(picks, vec!["primary", "backup1", "backup2", "primary"]);
}

#[tokio::test]
async fn test_round_robin_skips_cooling_provider() {
    let coordinator = coordinator(FailoverStrategy::RoundRobin);
    coordinator.mark_provider_failed("backup1").await;

    let picks = vec![
        pick(&coordinator).await,
        pick(&coordinator).await,
        pick(&coordinator).await,
        pick(&coordinator).await,
    ];
    assert_eq!(picks, vec!["primary", "backup2", "primary", "backup2"]);
}

#[tokio::test]
async fn test_seeded_random_is_deterministic() {
    let first = coordinator(FailoverStrategy::Random).with_rng(StdRng::seed_from_u64(42));
    let second = coordinator(FailoverStrategy::Random).with_rng(StdRng::seed_from_u64(42));

    let mut a = Vec::new();
    let mut b = Vec::new();
    for _ in 0..20 {
        a.push(pick(&first).await);
        b.push(pick(&second).await);
    }
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_random_never_picks_cooling_provider() {
    let coordinator = coordinator(FailoverStrategy::Random).with_rng(StdRng::seed_from_u64(7));
    coordinator.mark_provider_failed("primary").await;

    let mut seen = std::collections::HashSet::new();
    for _ in 0..50 {
        seen.insert(pick(&coordinator).await);
    }
    assert!(!seen.contains("primary"));
    assert!(seen.contains("backup1") && seen.contains("backup2"));
}

#[tokio::test]
async fn test_mark_healthy_keeps_error_count() {
    let coordinator = coordinator(FailoverStrategy::Sequential);
    coordinator.mark_provider_failed("primary").await;
    coordinator.mark_provider_failed("primary").await;
    coordinator.mark_provider_healthy("primary").await;

    let status = coordinator.get_health_status().await;
    assert_eq!(status.len(), 3);
    assert_eq!(status[0].name, "primary");
    assert!(status[0].healthy);
    assert_eq!(status[0].error_count, 2);
    assert!(status[0].last_error_time.is_some());
    assert_eq!(pick(&coordinator).await, "primary");
}

#[tokio::test]
async fn test_missing_primary_is_configuration_error() {
    let roster = ProviderRoster::new("ghost", ["backup1"]);
    let result = FailoverCoordinator::new(&roster, &registry(&["backup1"]), &FailoverConfig::default());
    assert!(matches!(result, Err(SmsError::Configuration { .. })));
}

#[tokio::test]
async fn test_unregistered_backup_is_skipped() {
    let roster = ProviderRoster::new("primary", ["ghost", "backup1"]);
    let coordinator =
        FailoverCoordinator::new(&roster, &registry(&["primary", "backup1"]), &FailoverConfig::default()).unwrap();

    let names: Vec<String> = coordinator.get_health_status().await.into_iter().map(|h| h.name).collect();
    assert_eq!(names, vec!["primary", "backup1"]);
}

#[tokio::test]
async fn test_health_checks_restore_responsive_providers() {
    let alive = Arc::new(ScriptedProvider::succeeding("primary"));
    let dead = Arc::new(ScriptedProvider::succeeding("backup1"));
    dead.set_healthy(false);

    let registry = ProviderRegistry::new()
        .with(alive.clone() as Arc<dyn SmsProvider>)
        .with(dead.clone() as Arc<dyn SmsProvider>);
    let roster = ProviderRoster::new("primary", ["backup1"]);
    let coordinator = FailoverCoordinator::new(&roster, &registry, &FailoverConfig::default())
        .unwrap()
        .with_cooldown(Duration::ZERO);

    coordinator.mark_provider_failed("primary").await;
    coordinator.mark_provider_failed("backup1").await;

    assert_eq!(coordinator.run_health_checks().await, 1);
    let status = coordinator.get_health_status().await;
    assert!(status[0].healthy);
    assert!(!status[1].healthy);
}

#[tokio::test]
async fn test_health_checks_wait_for_cooldown() {
    let coordinator = coordinator(FailoverStrategy::Sequential);
    coordinator.mark_provider_failed("primary").await;

    assert_eq!(coordinator.run_health_checks().await, 0);
    assert!(!coordinator.get_health_status().await[0].healthy);
}

#[tokio::test(start_paused = true)]
async fn test_health_monitor_runs_until_cancelled() {
    let coordinator = Arc::new(coordinator(FailoverStrategy::Sequential).with_cooldown(Duration::ZERO));
    coordinator.mark_provider_failed("primary").await;

    let (handle, signal) = cancellation();
    let monitor = coordinator.clone().spawn_health_monitor(Duration::from_secs(1), signal);

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert!(coordinator.get_health_status().await[0].healthy);

    handle.cancel();
    monitor.await.unwrap();
}
