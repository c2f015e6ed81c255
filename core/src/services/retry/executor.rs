//! Retry executor

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use smsflow_shared::{RetryConfig, RetryStrategy};

use crate::cancel::CancellationSignal;
use crate::domain::SendResponse;
use crate::errors::DispatchError;

/// Result of a retry cycle
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub result: Result<SendResponse, DispatchError>,
    /// Invocations of the operation actually made
    pub attempts: u32,
}

impl RetryOutcome {
    /// Invocations beyond the first
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Drives an operation up to `max_attempts + 1` times
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay before retry number `attempt` (0 = first retry), clamped to the max delay
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.config.base_delay();
        let delay = match self.config.strategy {
            RetryStrategy::Fixed => base,
            RetryStrategy::Exponential => 1u32
                .checked_shl(attempt)
                .and_then(|factor| base.checked_mul(factor))
                .unwrap_or(Duration::MAX),
            RetryStrategy::Linear => {
                let step = Duration::try_from_secs_f64(self.config.multiplier * f64::from(attempt))
                    .unwrap_or(Duration::ZERO);
                base.saturating_add(step)
            }
        };
        delay.min(self.config.max_delay())
    }

    /// Whether `error` seen after `attempt` retries warrants another try
    pub fn should_retry(&self, error: &DispatchError, attempt: u32) -> bool {
        error.retryable && attempt < self.config.max_attempts
    }

    /// Run `operation` until it succeeds, fails permanently, runs out of
    /// attempts or `cancel` fires
    ///
    /// `operation` receives the zero-based invocation index. On success the
    /// response's `retry_count` is set to the retries consumed.
    pub async fn execute<F, Fut>(&self, cancel: &CancellationSignal, mut operation: F) -> RetryOutcome
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<SendResponse, DispatchError>>,
    {
        let mut attempt = 0u32;
        loop {
            let result = match cancel.guard(operation(attempt)).await {
                Some(result) => result,
                None => {
                    return RetryOutcome {
                        result: Err(DispatchError::cancelled()),
                        attempts: attempt,
                    }
                }
            };
            let attempts = attempt + 1;

            let error = match result {
                Ok(mut response) => {
                    response.retry_count = attempt;
                    return RetryOutcome {
                        result: Ok(response),
                        attempts,
                    };
                }
                Err(error) => error,
            };

            if !self.should_retry(&error, attempt) {
                if error.retryable {
                    warn!(attempts, error = %error, "retry attempts exhausted");
                } else {
                    debug!(attempts, code = %error.code, "error not retryable");
                }
                return RetryOutcome {
                    result: Err(error),
                    attempts,
                };
            }

            let delay = self.delay_for(attempt);
            warn!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "send failed, retrying"
            );

            if cancel.guard(tokio::time::sleep(delay)).await.is_none() {
                debug!(attempts, "retry aborted by cancellation");
                return RetryOutcome {
                    result: Err(DispatchError::cancelled()),
                    attempts,
                };
            }
            attempt += 1;
        }
    }
}
