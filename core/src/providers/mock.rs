//! Scripted provider for exercising retry and failover paths in tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::{Balance, SendRequest, SendResponse};
use crate::errors::DispatchError;

use super::SmsProvider;

/// Provider whose outcomes are queued up front
///
/// Queued outcomes are consumed one per `send`; once the queue is empty the
/// provider falls back to always succeeding or always failing.
pub struct ScriptedProvider {
    name: String,
    script: Mutex<VecDeque<Option<DispatchError>>>,
    fallback: Mutex<Option<DispatchError>>,
    healthy: AtomicBool,
    /// Answer `Ok` with an unsuccessful response instead of succeeding
    reports_failure: AtomicBool,
    latency: Duration,
    sent: Mutex<Vec<SendRequest>>,
}

impl ScriptedProvider {
    /// A provider that always succeeds
    pub fn succeeding(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            healthy: AtomicBool::new(true),
            reports_failure: AtomicBool::new(false),
            latency: Duration::ZERO,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A provider that always fails with a retryable provider error
    pub fn failing(name: &str) -> Self {
        let provider = Self::succeeding(name);
        provider.set_failing(true);
        provider.healthy.store(false, Ordering::SeqCst);
        provider
    }

    /// A provider that always fails with `error`
    pub fn failing_with(name: &str, error: DispatchError) -> Self {
        let provider = Self::succeeding(name);
        *provider.fallback.lock().unwrap() = Some(error);
        provider
    }

    /// A provider that answers every send with `Ok` but `success == false`
    pub fn reporting_failure(name: &str) -> Self {
        let provider = Self::succeeding(name);
        provider.reports_failure.store(true, Ordering::SeqCst);
        provider
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a failure behind any outcomes already queued
    pub fn push_failure(&self, error: DispatchError) -> &Self {
        self.script.lock().unwrap().push_back(Some(error));
        self
    }

    /// Queue a success behind any outcomes already queued
    pub fn push_success(&self) -> &Self {
        self.script.lock().unwrap().push_back(None);
        self
    }

    /// Switch the fallback outcome
    pub fn set_failing(&self, failing: bool) {
        let error = failing.then(|| DispatchError::provider_rejected(&self.name, "scripted failure"));
        *self.fallback.lock().unwrap() = error;
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Number of `send` invocations so far
    pub fn calls(&self) -> u32 {
        self.sent.lock().unwrap().len() as u32
    }

    pub fn sent_requests(&self) -> Vec<SendRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsProvider for ScriptedProvider {
    async fn send(&self, request: &SendRequest) -> Result<SendResponse, DispatchError> {
        let call = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(request.clone());
            sent.len()
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        let outcome = match scripted {
            Some(step) => step,
            None => self.fallback.lock().unwrap().clone(),
        };

        match outcome {
            Some(error) => Err(error),
            None if self.reports_failure.load(Ordering::SeqCst) => Ok(SendResponse {
                success: false,
                message: "quota exhausted".to_string(),
                provider: self.name.clone(),
                ..SendResponse::default()
            }),
            None => Ok(SendResponse::delivered(&self.name, format!("{}-{}", self.name, call))),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn validate_config(&self) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn get_balance(&self) -> Result<Balance, DispatchError> {
        Ok(Balance {
            amount: 100.0,
            currency: "CNY".to_string(),
            updated_at: Utc::now(),
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}
