//! # Infrastructure Layer
//!
//! Concrete backends for the SmsFlow dispatch engine:
//! - **Cache**: Redis implementation of the key-value store
//! - **SMS**: development mock provider with random failure injection
//! - **Config**: layered TOML and environment configuration loading
//! - **Telemetry**: tracing subscriber setup from the logging configuration
//!
//! ## Features
//!
//! - `redis-cache`: Enable the Redis store (default)

// Re-export core types for convenience
pub use smsflow_core::errors::*;

/// Cache module - Redis store backend
pub mod cache;

/// Configuration loading
pub mod config;

/// SMS provider module - mock provider
pub mod sms;

/// Tracing subscriber setup
pub mod telemetry;

pub use config::load_config;
pub use sms::MockProvider;

#[cfg(feature = "redis-cache")]
pub use cache::RedisStore;

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Malformed Redis connection URL
    #[error("Invalid cache URL: {0}")]
    InvalidUrl(String),

    /// Configuration source could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// Configuration loaded but rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] smsflow_shared::ConfigValidationError),

    /// Subscriber could not be built or installed
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}
