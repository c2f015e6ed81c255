//! SMS provider implementations
//!
//! Vendor backends implement [`SmsProvider`] outside this crate; the mock
//! provider here stands in for them during development.

pub mod mock_provider;

pub use mock_provider::MockProvider;
pub use smsflow_core::providers::SmsProvider;
