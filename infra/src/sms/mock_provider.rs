//! Mock SMS Provider
//!
//! Development stand-in for a vendor backend. Every send succeeds or fails at
//! random according to a configured failure rate, after an optional simulated
//! network delay.

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use smsflow_core::domain::{Balance, SendRequest, SendResponse};
use smsflow_core::errors::{DispatchError, ErrorKind};
use smsflow_core::providers::SmsProvider;
use smsflow_shared::utils::phone::mask_phone_number;

/// Error code reported for simulated failures
pub const MOCK_ERROR: &str = "MOCK_ERROR";

/// Mock provider with random failure injection
///
/// This implementation:
/// - Fails each send with probability `fail_rate`
/// - Sleeps `latency` before answering
/// - Generates `mock_<uuid>` message ids
/// - Counts successful sends
#[derive(Clone)]
pub struct MockProvider {
    name: String,
    fail_rate: f64,
    latency: Duration,
    rng: Arc<Mutex<StdRng>>,
    message_count: Arc<AtomicU64>,
}

impl MockProvider {
    /// Create a mock provider
    ///
    /// # Arguments
    /// * `name` - Provider name used in the roster
    /// * `fail_rate` - Failure probability, clamped to `0.0..=1.0`
    /// * `latency` - Simulated delay per send
    pub fn new(name: impl Into<String>, fail_rate: f64, latency: Duration) -> Self {
        Self {
            name: name.into(),
            fail_rate: fail_rate.clamp(0.0, 1.0),
            latency,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            message_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Use a seeded random source so failure sequences are reproducible
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
            ..self
        }
    }

    pub fn fail_rate(&self) -> f64 {
        self.fail_rate
    }

    /// Get the number of messages delivered
    pub fn get_message_count(&self) -> u64 {
        self.message_count.load(Ordering::SeqCst)
    }

    fn roll_failure(&self) -> bool {
        let roll: f64 = match self.rng.lock() {
            Ok(mut rng) => rng.gen(),
            Err(poisoned) => poisoned.into_inner().gen(),
        };
        roll < self.fail_rate
    }
}

#[async_trait]
impl SmsProvider for MockProvider {
    async fn send(&self, request: &SendRequest) -> Result<SendResponse, DispatchError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let phone = mask_phone_number(&request.phone);
        if self.roll_failure() {
            warn!(provider = %self.name, phone = %phone, "mock send failed");
            return Err(DispatchError::new(MOCK_ERROR, "mock send failed", ErrorKind::Provider)
                .with_retryable(true)
                .with_provider(&self.name));
        }

        let message_id = format!("mock_{}", Uuid::new_v4());
        self.message_count.fetch_add(1, Ordering::SeqCst);

        info!(
            provider = %self.name,
            phone = %phone,
            message_id = %message_id,
            template = %request.template,
            "SMS sent successfully (mock)"
        );

        Ok(SendResponse::delivered(&self.name, message_id).with_message("mock send success"))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn validate_config(&self) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn get_balance(&self) -> Result<Balance, DispatchError> {
        Ok(Balance {
            amount: 1000.0,
            currency: "CNY".to_string(),
            updated_at: Utc::now(),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SendRequest {
        SendRequest::new("13800138000").with_template("SMS_001")
    }

    #[tokio::test]
    async fn test_mock_send_success() {
        let provider = MockProvider::new("mock", 0.0, Duration::ZERO);
        let response = provider.send(&request()).await.unwrap();

        assert!(response.success);
        assert_eq!(response.provider, "mock");
        assert!(response.message_id.starts_with("mock_"));
        assert_eq!(provider.get_message_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_always_fails_at_full_rate() {
        let provider = MockProvider::new("mock", 1.0, Duration::ZERO);
        for _ in 0..5 {
            let err = provider.send(&request()).await.unwrap_err();
            assert_eq!(err.code, MOCK_ERROR);
            assert!(err.retryable);
            assert_eq!(err.provider.as_deref(), Some("mock"));
        }
        assert_eq!(provider.get_message_count(), 0);
    }

    #[tokio::test]
    async fn test_seeded_failures_are_reproducible() {
        let a = MockProvider::new("a", 0.5, Duration::ZERO).with_seed(9);
        let b = MockProvider::new("b", 0.5, Duration::ZERO).with_seed(9);

        let mut outcomes_a = Vec::new();
        let mut outcomes_b = Vec::new();
        for _ in 0..16 {
            outcomes_a.push(a.send(&request()).await.is_ok());
            outcomes_b.push(b.send(&request()).await.is_ok());
        }
        assert_eq!(outcomes_a, outcomes_b);
    }

    #[tokio::test]
    async fn test_mock_balance_and_health() {
        let provider = MockProvider::new("mock", 0.3, Duration::ZERO);
        let balance = provider.get_balance().await.unwrap();
        assert_eq!(balance.amount, 1000.0);
        assert_eq!(balance.currency, "CNY");
        assert!(provider.health_check().await);
        assert!(provider.validate_config().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_latency() {
        let provider = MockProvider::new("mock", 0.0, Duration::from_millis(200));
        let started = tokio::time::Instant::now();
        provider.send(&request()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));
    }
}
