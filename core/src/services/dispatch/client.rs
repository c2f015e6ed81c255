//! Dispatch client
//!
//! Every send runs strictly in this order:
//! validate, rate-limit check, attempt record, primary delivery cycle and, on
//! exhaustion, one failover delivery cycle.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn, Instrument, Span};

use smsflow_shared::utils::phone::mask_phone_number;
use smsflow_shared::DispatchConfig;

use crate::cache::{KeyValueStore, SmsCache};
use crate::cancel::CancellationSignal;
use crate::domain::{FailoverRecord, ProviderHealth, SendRequest, SendResponse};
use crate::errors::{codes, CacheError, DispatchError, SmsError, SmsResult};
use crate::providers::{ProviderRegistry, SmsProvider};
use crate::services::failover::FailoverCoordinator;
use crate::services::retry::{RetryExecutor, RetryOutcome};

/// State shared by every clone of a [`DispatchClient`]
pub(super) struct ClientInner<S: KeyValueStore> {
    /// Validated dispatch configuration
    pub(super) config: DispatchConfig,
    /// Codes, rate limits and audit records
    pub(super) cache: SmsCache<S>,
    /// Backoff policy around each provider cycle
    pub(super) retry: RetryExecutor,
    /// Provider health and selection
    pub(super) failover: Arc<FailoverCoordinator>,
    /// Logging context for client events
    pub(super) span: Span,
}

/// Multi-provider SMS dispatch client
///
/// Cheap to clone; clones share the cache, the health map and the retry policy.
pub struct DispatchClient<S: KeyValueStore> {
    /// Shared client state
    pub(super) inner: Arc<ClientInner<S>>,
}

impl<S: KeyValueStore> Clone for DispatchClient<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: KeyValueStore + 'static> DispatchClient<S> {
    /// Build a client logging under the default `sms_dispatch` span
    ///
    /// # Arguments
    ///
    /// * `config` - Dispatch configuration, validated here
    /// * `registry` - Providers the roster names resolve against
    /// * `store` - Key-value backend for the cache
    pub fn new(config: DispatchConfig, registry: &ProviderRegistry, store: Arc<S>) -> SmsResult<Self> {
        Self::with_span(config, registry, store, tracing::info_span!("sms_dispatch"))
    }

    /// Build a client whose components log under `span`
    ///
    /// # Returns
    ///
    /// * `Ok(DispatchClient)` - Ready client
    /// * `Err(SmsError::Configuration)` - If the configuration fails validation,
    ///   the primary is unregistered or a rostered provider rejects its own settings
    pub fn with_span(config: DispatchConfig, registry: &ProviderRegistry, store: Arc<S>, span: Span) -> SmsResult<Self> {
        config.validate()?;

        let failover = FailoverCoordinator::new(&config.providers, registry, &config.failover)?.with_span(span.clone());
        Self::assemble(config, failover, store, span)
    }

    /// Build a client around an already configured coordinator
    pub fn from_parts(
        config: DispatchConfig,
        failover: FailoverCoordinator,
        store: Arc<S>,
        span: Span,
    ) -> SmsResult<Self> {
        config.validate()?;
        Self::assemble(config, failover, store, span)
    }

    fn assemble(config: DispatchConfig, failover: FailoverCoordinator, store: Arc<S>, span: Span) -> SmsResult<Self> {
        for provider in failover.providers() {
            provider.validate_config().map_err(|err| SmsError::Configuration {
                message: format!("provider '{}' misconfigured: {}", provider.name(), err),
            })?;
        }

        let cache = SmsCache::new(store, config.cache.clone()).with_span(span.clone());
        let retry = RetryExecutor::new(config.retry.clone());

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                cache,
                retry,
                failover: Arc::new(failover),
                span,
            }),
        })
    }

    /// Configuration this client was built with
    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &SmsCache<S> {
        &self.inner.cache
    }

    pub fn coordinator(&self) -> &Arc<FailoverCoordinator> {
        &self.inner.failover
    }

    /// Send one message through retry and, if needed, one failover round
    ///
    /// This method:
    /// 1. Fills configured defaults and validates the request
    /// 2. Checks the recipient's rate limit
    /// 3. Records the attempt
    /// 4. Runs a retry cycle on the selected provider
    /// 5. On exhaustion, runs one retry cycle on an alternate provider
    ///
    /// A provider answering `Ok` with an unsuccessful response counts as a
    /// failed attempt.
    ///
    /// # Arguments
    ///
    /// * `request` - Message to send
    /// * `cancel` - Aborts the send between and during attempts
    ///
    /// # Returns
    ///
    /// * `Ok(SendResponse)` - Delivered response, or an unsuccessful response
    ///   with `RATE_LIMIT_EXCEEDED` when the rate limit refuses the recipient
    /// * `Err(SmsError::InvalidRequest)` - If the phone or template is missing
    /// * `Err(SmsError::Delivery)` - If every attempt failed; carries the final response
    /// * `Err(SmsError::Cancelled)` - If `cancel` fired first
    /// * `Err(SmsError::Cache)` - If the rate-limit check could not reach the store
    pub async fn send(&self, request: &SendRequest, cancel: &CancellationSignal) -> SmsResult<SendResponse> {
        async {
            let started = Instant::now();
            let request = self.prepare(request)?;
            if let Some(refused) = self.admit(&request.phone, started, cancel).await? {
                return Ok(refused);
            }
            self.deliver(&request, started, cancel).await
        }
        .instrument(self.inner.span.clone())
        .await
    }

    /// Send a template message without building a [`SendRequest`] by hand
    pub async fn send_with_template(
        &self,
        phone: &str,
        template: &str,
        sign_name: &str,
        params: &[String],
        cancel: &CancellationSignal,
    ) -> SmsResult<SendResponse> {
        let request = SendRequest::new(phone)
            .with_template(template)
            .with_sign_name(sign_name)
            .with_params(params.iter().cloned());
        self.send(&request, cancel).await
    }

    /// Health snapshot of every rostered provider
    pub async fn get_health_status(&self) -> Vec<ProviderHealth> {
        self.inner.failover.get_health_status().await
    }

    /// Most recent failover records for `phone`, newest first
    ///
    /// # Arguments
    ///
    /// * `phone` - Recipient the records were written for
    /// * `limit` - Maximum number of records returned
    pub async fn failover_records(&self, phone: &str, limit: usize) -> SmsResult<Vec<FailoverRecord>> {
        Ok(self.inner.cache.get_failover_records(phone, limit).await?)
    }

    /// Probe recovering providers on the configured health-check interval
    /// until `cancel` fires
    pub fn spawn_health_monitor(&self, cancel: CancellationSignal) -> JoinHandle<()> {
        let interval = self.inner.config.failover.health_check_interval();
        self.inner.failover.clone().spawn_health_monitor(interval, cancel)
    }

    /// Fill configured defaults and reject requests no provider could send
    pub(super) fn prepare(&self, request: &SendRequest) -> SmsResult<SendRequest> {
        let defaults = &self.inner.config.defaults;
        let mut request = request.clone();
        if request.sign_name.is_empty() {
            request.sign_name = defaults.sign_name.clone();
        }
        if request.template.is_empty() && request.content.is_empty() {
            request.template = defaults.template.clone();
        }

        if request.phone.trim().is_empty() {
            return Err(SmsError::InvalidRequest(DispatchError::invalid_request(
                codes::INVALID_PHONE,
                "phone number is required",
            )));
        }
        if request.template.is_empty() && request.content.is_empty() {
            return Err(SmsError::InvalidRequest(DispatchError::invalid_request(
                codes::EMPTY_TEMPLATE,
                "template or content is required",
            )));
        }
        Ok(request)
    }

    /// `Some(response)` when the rate limit refuses `phone`
    pub(super) async fn admit(
        &self,
        phone: &str,
        started: Instant,
        cancel: &CancellationSignal,
    ) -> SmsResult<Option<SendResponse>> {
        if !self.inner.config.cache.rate_limit.enabled {
            return Ok(None);
        }
        if self.cached(cancel, self.inner.cache.check_limit(phone)).await? {
            return Ok(None);
        }

        let mut refused = SendResponse::failed("", DispatchError::rate_limited());
        refused.duration = started.elapsed();
        Ok(Some(refused))
    }

    /// Deliver an already admitted request
    pub(super) async fn deliver(
        &self,
        request: &SendRequest,
        started: Instant,
        cancel: &CancellationSignal,
    ) -> SmsResult<SendResponse> {
        let inner = &self.inner;
        let phone = mask_phone_number(&request.phone);

        match cancel.guard(inner.cache.record_attempt(&request.phone)).await {
            Some(Err(err)) => warn!(phone = %phone, error = %err, "failed to record send attempt"),
            None => return Err(SmsError::Cancelled),
            Some(Ok(())) => {}
        }

        let failover_enabled = inner.config.failover.enabled;
        let provider = if failover_enabled {
            inner.failover.get_available_provider().await
        } else {
            inner.failover.primary()
        };

        let first = self.attempt(&provider, request, cancel).await;
        let mut invocations = first.attempts;
        let error = match first.result {
            Ok(response) => {
                inner.failover.mark_provider_healthy(provider.name()).await;
                return Ok(self.finish(response, provider.name(), invocations, started));
            }
            Err(err) if err.is_cancelled() => return Err(SmsError::Cancelled),
            Err(err) => err,
        };

        inner.failover.mark_provider_failed(provider.name()).await;
        let mut last_provider = provider.clone();
        let mut last_error = error;

        if failover_enabled {
            let alternate = inner.failover.get_available_provider().await;
            if alternate.name() != provider.name() {
                warn!(
                    phone = %phone,
                    from = provider.name(),
                    to = alternate.name(),
                    error = %last_error,
                    event = "failover",
                    "primary delivery failed, failing over"
                );

                let second = self.attempt(&alternate, request, cancel).await;
                invocations += second.attempts;
                match second.result {
                    Ok(response) => {
                        if let Err(err) = inner
                            .cache
                            .save_failover_record(&request.phone, provider.name(), alternate.name())
                            .await
                        {
                            warn!(phone = %phone, error = %err, "failed to save failover record");
                        }
                        inner.failover.mark_provider_healthy(alternate.name()).await;
                        return Ok(self.finish(response, alternate.name(), invocations, started));
                    }
                    Err(err) if err.is_cancelled() => return Err(SmsError::Cancelled),
                    Err(err) => {
                        inner.failover.mark_provider_failed(alternate.name()).await;
                        last_provider = alternate;
                        last_error = err;
                    }
                }
            }
        }

        let error = last_error.with_provider(last_provider.name());
        let mut response = SendResponse::failed(last_provider.name(), error.clone());
        response.retry_count = invocations.saturating_sub(1);
        response.duration = started.elapsed();

        error!(
            phone = %phone,
            provider = last_provider.name(),
            code = %error.code,
            retry_count = response.retry_count,
            event = "sms_failed",
            "SMS delivery failed"
        );
        Err(SmsError::Delivery {
            error,
            response: Box::new(response),
        })
    }

    /// One retry cycle against `provider`, each call bounded by the request timeout
    async fn attempt(
        &self,
        provider: &Arc<dyn SmsProvider>,
        request: &SendRequest,
        cancel: &CancellationSignal,
    ) -> RetryOutcome {
        let timeout = self.inner.config.request_timeout();
        self.inner
            .retry
            .execute(cancel, |_| {
                let provider = provider.clone();
                async move {
                    let outcome = match tokio::time::timeout(timeout, provider.send(request)).await {
                        Ok(outcome) => outcome.and_then(|response| unsuccessful(provider.name(), response)),
                        Err(_) => return Err(DispatchError::timeout(provider.name())),
                    };
                    match outcome {
                        Ok(response) => Ok(response),
                        Err(mut err) => {
                            err.kind = provider.error_kind(&err);
                            err.retryable = provider.is_retryable(&err);
                            if err.provider.is_none() {
                                err.provider = Some(provider.name().to_string());
                            }
                            Err(err)
                        }
                    }
                }
            })
            .await
    }

    fn finish(&self, mut response: SendResponse, provider: &str, invocations: u32, started: Instant) -> SendResponse {
        response.provider = provider.to_string();
        response.retry_count = invocations.saturating_sub(1);
        response.duration = started.elapsed();
        info!(
            provider,
            message_id = %response.message_id,
            retry_count = response.retry_count,
            duration_ms = response.duration.as_millis() as u64,
            event = "sms_sent",
            "SMS delivered"
        );
        response
    }

    /// Run a cache call unless `cancel` fires first
    pub(super) async fn cached<T, F>(&self, cancel: &CancellationSignal, fut: F) -> SmsResult<T>
    where
        F: std::future::Future<Output = Result<T, CacheError>>,
    {
        match cancel.guard(fut).await {
            Some(result) => Ok(result?),
            None => Err(SmsError::Cancelled),
        }
    }
}

/// A provider answering `Ok` with `success == false` failed the attempt
fn unsuccessful(provider: &str, response: SendResponse) -> Result<SendResponse, DispatchError> {
    if response.success {
        return Ok(response);
    }
    Err(match response.error {
        Some(error) => error,
        None if response.message.is_empty() => DispatchError::provider_rejected(provider, "provider reported failure"),
        None => DispatchError::provider_rejected(provider, response.message),
    })
}
