//! Cache configuration module

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::rate_limit::RateLimitConfig;

/// Verification/rate-limit cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis connection URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Prefix prepended to every key written by the dispatcher
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Default TTL for cache entries in seconds
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: u64,

    /// TTL for verification codes in seconds
    #[serde(default = "default_code_ttl")]
    pub code_ttl_secs: u64,

    /// Per-recipient send limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            key_prefix: default_key_prefix(),
            default_ttl_secs: default_ttl(),
            code_ttl_secs: default_code_ttl(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix for all cache keys
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Replace the rate limit policy
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Generate a cache key with prefix
    pub fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn code_ttl(&self) -> Duration {
        Duration::from_secs(self.code_ttl_secs)
    }
}

fn default_url() -> String {
    String::from("redis://localhost:6379")
}

fn default_key_prefix() -> String {
    String::from("sms:")
}

fn default_ttl() -> u64 {
    86_400 // 24 hours
}

fn default_code_ttl() -> u64 {
    300 // 5 minutes
}
