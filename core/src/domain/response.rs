//! Outcome types produced by the dispatch client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::DispatchError;

use super::request::SendRequest;

/// Result of one logical send, whichever provider produced it
#[derive(Debug, Clone, Default)]
pub struct SendResponse {
    pub success: bool,
    /// Provider-assigned message id
    pub message_id: String,
    /// Human-readable status
    pub message: String,
    /// Provider that produced this response
    pub provider: String,
    /// Retries consumed across the whole send
    pub retry_count: u32,
    /// Wall-clock time since the send started
    pub duration: Duration,
    /// Terminal error, if delivery did not succeed
    pub error: Option<DispatchError>,
}

impl SendResponse {
    /// Successful response as reported by a provider
    pub fn delivered(provider: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: message_id.into(),
            message: "sent".to_string(),
            provider: provider.into(),
            ..Default::default()
        }
    }

    /// Failed response carrying its terminal error
    pub fn failed(provider: impl Into<String>, error: DispatchError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            provider: provider.into(),
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Aggregate outcome of a batch send
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// Index-aligned with the input; `None` where the send returned no response
    pub responses: Vec<Option<SendResponse>>,
    /// Requests that did not succeed, in input order
    pub failed_requests: Vec<SendRequest>,
}

impl BatchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A result sized for `total` requests with nothing recorded yet
    pub fn with_capacity(total: usize) -> Self {
        Self {
            total,
            responses: vec![None; total],
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total == self.success + self.failed
    }
}

/// Verification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStatus {
    Valid,
    Invalid,
    NotFound,
}

/// Result of redeeming a verification code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    pub valid: bool,
    pub status: VerifyStatus,
    pub message: String,
}

impl VerifyResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            status: VerifyStatus::Valid,
            message: "verification successful".to_string(),
        }
    }

    pub fn invalid() -> Self {
        Self {
            valid: false,
            status: VerifyStatus::Invalid,
            message: "verification code invalid".to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            valid: false,
            status: VerifyStatus::NotFound,
            message: "verification code not found or expired".to_string(),
        }
    }
}

/// Account balance reported by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub amount: f64,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}
