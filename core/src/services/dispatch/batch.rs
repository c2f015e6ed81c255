//! Sequential and bounded-concurrent batch sends

use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, Instrument};

use smsflow_shared::DEFAULT_CONCURRENCY;

use crate::cache::KeyValueStore;
use crate::cancel::CancellationSignal;
use crate::domain::{BatchResult, SendRequest, SendResponse};
use crate::errors::{SmsError, SmsResult};

use super::DispatchClient;

/// Running counts for one batch, indexed by input position
struct BatchAggregate {
    /// Counts and index-aligned responses
    result: BatchResult,
    /// Slots that received an outcome
    recorded: Vec<bool>,
    /// Slots whose outcome was a failure
    failed: Vec<bool>,
}

impl BatchAggregate {
    fn new(total: usize) -> Self {
        Self {
            result: BatchResult::with_capacity(total),
            recorded: vec![false; total],
            failed: vec![false; total],
        }
    }

    fn record(&mut self, index: usize, outcome: SmsResult<SendResponse>) {
        let (response, success) = match outcome {
            Ok(response) => {
                let success = response.success;
                (Some(response), success)
            }
            Err(err) => (err.response().cloned(), false),
        };

        self.result.responses[index] = response;
        self.recorded[index] = true;
        if success {
            self.result.success += 1;
        } else {
            self.result.failed += 1;
            self.failed[index] = true;
        }
    }

    /// Count unrecorded slots as failures and collect failed requests in input order
    fn finish(mut self, requests: &[SendRequest]) -> BatchResult {
        for index in 0..requests.len() {
            if !self.recorded[index] {
                self.result.failed += 1;
                self.failed[index] = true;
            }
        }
        self.result.failed_requests = requests
            .iter()
            .zip(&self.failed)
            .filter(|(_, failed)| **failed)
            .map(|(request, _)| request.clone())
            .collect();
        self.result
    }
}

impl<S: KeyValueStore + 'static> DispatchClient<S> {
    /// Send each request in turn
    ///
    /// A request counts as failed when its send errors or returns an
    /// unsuccessful response. Once `cancel` fires the remaining requests are
    /// failed without being sent.
    ///
    /// # Returns
    ///
    /// Totals, index-aligned responses and the failed requests in input order
    pub async fn send_batch(&self, requests: &[SendRequest], cancel: &CancellationSignal) -> BatchResult {
        if requests.is_empty() {
            return BatchResult::empty();
        }

        let mut aggregate = BatchAggregate::new(requests.len());
        for (index, request) in requests.iter().enumerate() {
            let outcome = if cancel.is_cancelled() {
                Err(SmsError::Cancelled)
            } else {
                self.send(request, cancel).await
            };
            aggregate.record(index, outcome);
        }

        let result = aggregate.finish(requests);
        self.log_batch(&result, 1);
        result
    }

    /// Send requests with at most `concurrency` in flight
    ///
    /// Zero falls back to the configured concurrency, then to
    /// [`DEFAULT_CONCURRENCY`]. The limit never exceeds the number of
    /// requests. Responses stay index-aligned with `requests`.
    ///
    /// # Arguments
    ///
    /// * `requests` - Messages to send
    /// * `concurrency` - Maximum sends in flight, zero for the configured value
    /// * `cancel` - Fails requests that have not started when fired
    pub async fn send_batch_concurrent(
        &self,
        requests: &[SendRequest],
        concurrency: usize,
        cancel: &CancellationSignal,
    ) -> BatchResult {
        if requests.is_empty() {
            return BatchResult::empty();
        }

        let limit = [concurrency, self.config().concurrency]
            .into_iter()
            .find(|&n| n > 0)
            .unwrap_or(DEFAULT_CONCURRENCY)
            .min(requests.len());

        let semaphore = Arc::new(Semaphore::new(limit));
        let aggregate = Arc::new(Mutex::new(BatchAggregate::new(requests.len())));
        let mut tasks = JoinSet::new();

        for (index, request) in requests.iter().cloned().enumerate() {
            let client = self.clone();
            let semaphore = semaphore.clone();
            let aggregate = aggregate.clone();
            let cancel = cancel.clone();

            tasks.spawn(
                async move {
                    let outcome = match semaphore.acquire_owned().await {
                        Ok(_permit) if !cancel.is_cancelled() => client.send(&request, &cancel).await,
                        _ => Err(SmsError::Cancelled),
                    };
                    aggregate
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .record(index, outcome);
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "batch send task failed");
            }
        }

        let aggregate = match Arc::try_unwrap(aggregate) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
            Err(shared) => {
                let mut guard = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                std::mem::replace(&mut *guard, BatchAggregate::new(0))
            }
        };

        let result = aggregate.finish(requests);
        self.log_batch(&result, limit);
        result
    }

    /// Re-send the requests a previous batch reported as failed
    pub async fn retry_failed(&self, failed_requests: &[SendRequest], cancel: &CancellationSignal) -> BatchResult {
        self.send_batch(failed_requests, cancel).await
    }

    fn log_batch(&self, result: &BatchResult, concurrency: usize) {
        info!(
            parent: &self.inner.span,
            total = result.total,
            success = result.success,
            failed = result.failed,
            concurrency,
            event = "batch_complete",
            "batch send finished"
        );
    }
}
