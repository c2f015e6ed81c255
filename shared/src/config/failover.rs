//! Provider roster and failover configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Named providers the dispatcher may route through
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderRoster {
    /// Provider preferred by the sequential strategy
    pub primary: String,

    /// Backups in preference order
    #[serde(default)]
    pub backups: Vec<String>,
}

impl ProviderRoster {
    pub fn new(primary: impl Into<String>, backups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            primary: primary.into(),
            backups: backups.into_iter().map(Into::into).collect(),
        }
    }

    /// Primary followed by backups
    pub fn all(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.backups.iter().map(String::as_str))
    }
}

/// How the next provider is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailoverStrategy {
    #[default]
    Sequential,
    Random,
    RoundRobin,
}

/// Failover policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FailoverConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub strategy: FailoverStrategy,

    /// Seconds a failed provider stays out of normal selection
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Seconds between background health probes
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            strategy: FailoverStrategy::default(),
            cooldown_secs: default_cooldown_secs(),
            health_check_interval_secs: default_health_check_interval_secs(),
        }
    }
}

impl FailoverConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: FailoverStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_cooldown_secs() -> u64 {
    300 // 5 minutes
}

fn default_health_check_interval_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_order() {
        let roster = ProviderRoster::new("aliyun", ["tencent", "twilio"]);
        let names: Vec<&str> = roster.all().collect();
        assert_eq!(names, vec!["aliyun", "tencent", "twilio"]);
    }

    #[test]
    fn test_failover_strategy_names() {
        let strategy: FailoverStrategy = serde_json::from_str("\"round-robin\"").unwrap();
        assert_eq!(strategy, FailoverStrategy::RoundRobin);
    }

    #[test]
    fn test_failover_defaults() {
        let config = FailoverConfig::default();
        assert!(config.enabled);
        assert_eq!(config.strategy, FailoverStrategy::Sequential);
        assert_eq!(config.cooldown(), Duration::from_secs(300));
        assert_eq!(config.health_check_interval(), Duration::from_secs(60));
    }
}
