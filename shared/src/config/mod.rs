//! Configuration module with dispatch-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `cache` - Verification code storage and key layout
//! - `environment` - Deployment environment detection
//! - `failover` - Provider roster and failover policy
//! - `logging` - Subscriber level and format
//! - `rate_limit` - Per-recipient send limiting
//! - `retry` - Backoff policy around provider sends

pub mod cache;
pub mod environment;
pub mod failover;
pub mod logging;
pub mod rate_limit;
pub mod retry;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// Re-export commonly used types
pub use cache::CacheConfig;
pub use environment::Environment;
pub use failover::{FailoverConfig, FailoverStrategy, ProviderRoster};
pub use logging::{LogFormat, LoggingConfig};
pub use rate_limit::RateLimitConfig;
pub use retry::{RetryConfig, RetryStrategy};

/// Concurrency used by bounded batch sends when the caller passes zero
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Defaults applied to requests that leave these fields empty
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MessageDefaults {
    /// Sender signature
    #[serde(default)]
    pub sign_name: String,

    /// Template id
    #[serde(default)]
    pub template: String,
}

/// Rejected configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("primary provider is not configured")]
    MissingPrimary,

    #[error("provider {name} is listed more than once")]
    DuplicateProvider { name: String },

    #[error("rate limit window must be positive when rate limiting is enabled")]
    EmptyRateLimitWindow,

    #[error("request timeout must be positive")]
    ZeroRequestTimeout,

    #[error("max retry delay ({max_ms}ms) is smaller than the base delay ({base_ms}ms)")]
    RetryDelayInverted { base_ms: u64, max_ms: u64 },
}

/// Complete dispatcher configuration, immutable once a client is built
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub providers: ProviderRoster,

    #[serde(default)]
    pub defaults: MessageDefaults,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub failover: FailoverConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Default fan-out for concurrent batch sends
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Upper bound for a single provider call in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let environment = Environment::default();
        Self {
            environment,
            providers: ProviderRoster::default(),
            defaults: MessageDefaults::default(),
            retry: RetryConfig::default(),
            failover: FailoverConfig::default(),
            cache: CacheConfig::default(),
            concurrency: default_concurrency(),
            request_timeout_ms: default_request_timeout_ms(),
            logging: LoggingConfig::for_environment(environment),
        }
    }
}

impl DispatchConfig {
    /// Default configuration routed through the given roster
    pub fn with_providers(primary: impl Into<String>, backups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            providers: ProviderRoster::new(primary, backups),
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check invariants the client relies on
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.providers.primary.trim().is_empty() {
            return Err(ConfigValidationError::MissingPrimary);
        }

        let mut seen = std::collections::HashSet::new();
        for name in self.providers.all() {
            if !seen.insert(name) {
                return Err(ConfigValidationError::DuplicateProvider {
                    name: name.to_string(),
                });
            }
        }

        if self.cache.rate_limit.enabled && self.cache.rate_limit.window_secs == 0 {
            return Err(ConfigValidationError::EmptyRateLimitWindow);
        }

        if self.request_timeout_ms == 0 {
            return Err(ConfigValidationError::ZeroRequestTimeout);
        }

        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigValidationError::RetryDelayInverted {
                base_ms: self.retry.base_delay_ms,
                max_ms: self.retry.max_delay_ms,
            });
        }

        Ok(())
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_needs_primary() {
        let config = DispatchConfig::default();
        assert_eq!(config.validate(), Err(ConfigValidationError::MissingPrimary));
    }

    #[test]
    fn test_with_providers_is_valid() {
        let config = DispatchConfig::with_providers("primary", ["backup"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let config = DispatchConfig::with_providers("primary", ["backup", "primary"]);
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::DuplicateProvider {
                name: "primary".to_string()
            })
        );
    }

    #[test]
    fn test_inverted_retry_delay_rejected() {
        let mut config = DispatchConfig::with_providers("primary", Vec::<String>::new());
        config.retry.base_delay_ms = 5_000;
        config.retry.max_delay_ms = 100;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::RetryDelayInverted { .. })
        ));
    }

    #[test]
    fn test_zero_window_rejected_only_when_enabled() {
        let mut config = DispatchConfig::with_providers("primary", Vec::<String>::new());
        config.cache.rate_limit.window_secs = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::EmptyRateLimitWindow));

        config.cache.rate_limit.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let mut config = DispatchConfig::with_providers("primary", Vec::<String>::new());
        config.request_timeout_ms = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::ZeroRequestTimeout));

        config.request_timeout_ms = 1;
        assert!(config.validate().is_ok());
    }
}
