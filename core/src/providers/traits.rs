//! Capability every SMS vendor backend implements

use async_trait::async_trait;

use crate::domain::{Balance, SendRequest, SendResponse};
use crate::errors::{DispatchError, ErrorKind};

/// SMS provider capability
///
/// The dispatch client depends only on this trait; vendor wire protocols stay
/// behind it.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Send one message
    async fn send(&self, request: &SendRequest) -> Result<SendResponse, DispatchError>;

    /// Send several messages, stopping at the first failure
    async fn send_batch(&self, requests: &[SendRequest]) -> Result<Vec<SendResponse>, DispatchError> {
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(self.send(request).await?);
        }
        Ok(responses)
    }

    /// Stable provider name used in the roster
    fn name(&self) -> &str;

    /// Check credentials and settings without sending anything
    fn validate_config(&self) -> Result<(), DispatchError>;

    /// Remaining account balance, if the vendor reports one
    async fn get_balance(&self) -> Result<Balance, DispatchError>;

    /// Cheap liveness probe
    async fn health_check(&self) -> bool;

    /// Classify an error raised by this provider
    fn error_kind(&self, error: &DispatchError) -> ErrorKind {
        error.kind
    }

    /// Whether an error raised by this provider is worth retrying
    fn is_retryable(&self, error: &DispatchError) -> bool {
        error.retryable
    }
}
