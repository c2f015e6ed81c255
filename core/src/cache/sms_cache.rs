//! Verification code and rate-limit cache
//!
//! Key layout under the configured prefix:
//! - `verify:{phone}` - current verification code
//! - `limit:{phone}` - fixed-window send counter
//! - `attempt:{phone}` - send attempt timestamps
//! - `failover:{phone}` - JSON failover audit records

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn, Span};

use smsflow_shared::utils::phone::mask_phone_number;
use smsflow_shared::CacheConfig;

use crate::domain::FailoverRecord;
use crate::errors::CacheError;

use super::KeyValueStore;

/// Records returned by [`SmsCache::get_failover_records`] when no limit is given
pub const DEFAULT_FAILOVER_RECORD_LIMIT: usize = 10;

/// Cache façade used by the dispatch client
pub struct SmsCache<S: KeyValueStore> {
    store: Arc<S>,
    config: CacheConfig,
    span: Span,
}

impl<S: KeyValueStore> SmsCache<S> {
    pub fn new(store: Arc<S>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            span: tracing::info_span!("sms_cache"),
        }
    }

    /// Attach the logging context events are recorded under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Store `code` for `phone`, replacing any previous code
    ///
    /// A zero `ttl` uses the configured code TTL.
    pub async fn save_code(&self, phone: &str, code: &str, ttl: Duration) -> Result<(), CacheError> {
        let ttl = if ttl.is_zero() { self.config.code_ttl() } else { ttl };
        self.store.set(&self.code_key(phone), code, ttl).await?;
        debug!(
            parent: &self.span,
            phone = %mask_phone_number(phone),
            ttl_secs = ttl.as_secs(),
            "verification code stored"
        );
        Ok(())
    }

    /// Stored code for `phone`; [`CacheError::NotFound`] when absent or expired
    pub async fn get_code(&self, phone: &str) -> Result<String, CacheError> {
        let key = self.code_key(phone);
        self.store
            .get(&key)
            .await?
            .ok_or(CacheError::NotFound { key })
    }

    /// Remove the code for `phone`; absent codes are not an error
    pub async fn delete_code(&self, phone: &str) -> Result<(), CacheError> {
        self.store.delete(&self.code_key(phone)).await?;
        Ok(())
    }

    /// Count one send against `phone`'s window and report admission
    pub async fn check_limit(&self, phone: &str) -> Result<bool, CacheError> {
        let limit = &self.config.rate_limit;
        if !limit.enabled {
            return Ok(true);
        }

        let key = self.config.make_key(&format!("limit:{}", phone));
        let count = self.store.incr_with_expiry(&key, limit.window()).await?;
        let admitted = count <= i64::from(limit.max_requests);

        if !admitted {
            warn!(
                parent: &self.span,
                phone = %mask_phone_number(phone),
                count,
                max_requests = limit.max_requests,
                event = "rate_limit_exceeded",
                "send refused by rate limit"
            );
        }
        Ok(admitted)
    }

    /// Append the current unix time to `phone`'s attempt log
    pub async fn record_attempt(&self, phone: &str) -> Result<(), CacheError> {
        let key = self.config.make_key(&format!("attempt:{}", phone));
        self.store.list_push(&key, &Utc::now().timestamp().to_string()).await
    }

    /// Append a provider switch to `phone`'s failover log
    pub async fn save_failover_record(
        &self,
        phone: &str,
        failed_provider: &str,
        success_provider: &str,
    ) -> Result<(), CacheError> {
        let record = FailoverRecord {
            failed_provider: failed_provider.to_string(),
            success_provider: success_provider.to_string(),
            timestamp: Utc::now(),
        };
        let payload = serde_json::to_string(&record)?;
        self.store.list_push(&self.failover_key(phone), &payload).await?;

        debug!(
            parent: &self.span,
            phone = %mask_phone_number(phone),
            failed_provider,
            success_provider,
            "failover record saved"
        );
        Ok(())
    }

    /// Most recent failover records for `phone`, newest first
    ///
    /// A `limit` of zero uses [`DEFAULT_FAILOVER_RECORD_LIMIT`].
    pub async fn get_failover_records(&self, phone: &str, limit: usize) -> Result<Vec<FailoverRecord>, CacheError> {
        let limit = if limit == 0 { DEFAULT_FAILOVER_RECORD_LIMIT } else { limit };
        let stop = isize::try_from(limit - 1).unwrap_or(isize::MAX);

        self.store
            .list_range(&self.failover_key(phone), 0, stop)
            .await?
            .iter()
            .map(|raw| serde_json::from_str(raw).map_err(CacheError::from))
            .collect()
    }

    fn code_key(&self, phone: &str) -> String {
        self.config.make_key(&format!("verify:{}", phone))
    }

    fn failover_key(&self, phone: &str) -> String {
        self.config.make_key(&format!("failover:{}", phone))
    }
}
