//! Provider health bookkeeping and failover audit records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Health of one configured provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderHealth {
    pub name: String,
    pub healthy: bool,
    /// Lifetime failure count, never reset on recovery
    pub error_count: u64,
    pub last_error_time: Option<DateTime<Utc>>,
    pub last_check_time: DateTime<Utc>,
}

impl ProviderHealth {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            healthy: true,
            error_count: 0,
            last_error_time: None,
            last_check_time: Utc::now(),
        }
    }

    /// Whether the provider is still inside its cooldown window at `now`
    pub fn in_cooldown(&self, cooldown: Duration, now: DateTime<Utc>) -> bool {
        if self.healthy {
            return false;
        }
        match self.last_error_time {
            // a window past the representable range never ends
            Some(failed_at) => chrono::Duration::from_std(cooldown)
                .ok()
                .and_then(|cooldown| failed_at.checked_add_signed(cooldown))
                .map_or(true, |until| now < until),
            None => false,
        }
    }

    pub fn record_failure(&mut self, at: DateTime<Utc>) {
        self.healthy = false;
        self.error_count += 1;
        self.last_error_time = Some(at);
    }

    pub fn record_healthy(&mut self, at: DateTime<Utc>) {
        self.healthy = true;
        self.last_check_time = at;
    }
}

/// Audit entry written when a send succeeded on a different provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverRecord {
    pub failed_provider: String,
    pub success_provider: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_provider_is_healthy() {
        let health = ProviderHealth::new("aliyun");
        assert!(health.healthy);
        assert_eq!(health.error_count, 0);
        assert!(!health.in_cooldown(Duration::from_secs(300), Utc::now()));
    }

    #[test]
    fn test_cooldown_window() {
        let mut health = ProviderHealth::new("aliyun");
        let failed_at = Utc::now();
        health.record_failure(failed_at);

        let cooldown = Duration::from_secs(60);
        assert!(health.in_cooldown(cooldown, failed_at + chrono::Duration::seconds(59)));
        assert!(!health.in_cooldown(cooldown, failed_at + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_unbounded_cooldown_never_expires() {
        let mut health = ProviderHealth::new("aliyun");
        let failed_at = Utc::now();
        health.record_failure(failed_at);

        let cooldown = Duration::from_secs(10_000_000_000_000);
        assert!(health.in_cooldown(cooldown, failed_at));
        assert!(health.in_cooldown(cooldown, failed_at + chrono::Duration::days(365 * 1000)));
        assert!(health.in_cooldown(Duration::MAX, failed_at));
    }

    #[test]
    fn test_recovery_keeps_error_count() {
        let mut health = ProviderHealth::new("aliyun");
        health.record_failure(Utc::now());
        health.record_failure(Utc::now());
        health.record_healthy(Utc::now());

        assert!(health.healthy);
        assert_eq!(health.error_count, 2);
        assert!(!health.in_cooldown(Duration::from_secs(300), Utc::now()));
    }
}
