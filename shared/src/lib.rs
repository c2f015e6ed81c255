//! Shared configuration and utilities for SmsFlow
//!
//! This crate provides common functionality used across the dispatch crates:
//! - Configuration types (roster, retry, failover, cache, logging)
//! - Utility functions (phone masking and validation)

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    CacheConfig, ConfigValidationError, DispatchConfig, Environment, FailoverConfig,
    FailoverStrategy, LogFormat, LoggingConfig, MessageDefaults, ProviderRoster,
    RateLimitConfig, RetryConfig, RetryStrategy, DEFAULT_CONCURRENCY,
};
pub use utils::phone;
