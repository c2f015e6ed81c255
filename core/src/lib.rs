//! # SmsFlow Core
//!
//! Multi-provider SMS dispatch engine.
//! This crate contains the domain types, the provider and store capabilities,
//! and the services that send through them:
//! - Verification code and rate-limit cache
//! - Retry executor with fixed, exponential and linear backoff
//! - Failover coordinator tracking provider health and cooldown
//! - Dispatch client composing all of the above

pub mod cache;
pub mod cancel;
pub mod domain;
pub mod errors;
pub mod providers;
pub mod services;

// Re-export commonly used types for convenience
pub use cache::{KeyValueStore, MemoryStore, SmsCache};
pub use cancel::{cancellation, CancellationHandle, CancellationSignal};
pub use domain::*;
pub use errors::*;
pub use providers::{ProviderRegistry, ScriptedProvider, SmsProvider};
pub use services::*;
