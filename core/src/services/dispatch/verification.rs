//! Verification code issuance and redemption

use constant_time_eq::constant_time_eq;
use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};

use smsflow_shared::utils::phone::mask_phone_number;

use crate::cache::KeyValueStore;
use crate::cancel::CancellationSignal;
use crate::domain::{
    MessageCategory, SendRequest, SendResponse, VerificationCodeRequest, VerifyCodeRequest, VerifyResult,
    DEFAULT_CODE_LENGTH,
};
use crate::errors::{SmsError, SmsResult};

use super::DispatchClient;

/// Numeric code of `length` digits drawn uniformly from the OS random source
pub(crate) fn generate_code(length: usize) -> String {
    let length = if length == 0 { DEFAULT_CODE_LENGTH } else { length };
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

impl<S: KeyValueStore + 'static> DispatchClient<S> {
    /// Issue a verification code and send it as a verification message
    ///
    /// This method:
    /// 1. Validates the request and checks the rate limit once
    /// 2. Generates a numeric code from the OS random source
    /// 3. Stores the code under the recipient, replacing any previous one
    /// 4. Delivers the code as the message's only template parameter
    ///
    /// # Arguments
    ///
    /// * `request` - Recipient, template, code length and optional TTL
    /// * `cancel` - Aborts before the store write or during delivery
    ///
    /// # Returns
    ///
    /// * `Ok(SendResponse)` - Delivered, or a rate-limit refusal
    /// * `Err(SmsError)` - Same failure modes as [`send`](Self::send), plus a
    ///   cache error if the code could not be stored
    pub async fn send_verification_code(
        &self,
        request: &VerificationCodeRequest,
        cancel: &CancellationSignal,
    ) -> SmsResult<SendResponse> {
        async {
            let started = Instant::now();
            let mut outbound = self.prepare(
                &SendRequest::new(&request.phone)
                    .with_template(&request.template)
                    .with_sign_name(&request.sign_name)
                    .with_category(MessageCategory::Verification),
            )?;

            if let Some(refused) = self.admit(&outbound.phone, started, cancel).await? {
                return Ok(refused);
            }

            let code = generate_code(request.code_length);
            let ttl = request.ttl.unwrap_or(Duration::ZERO);
            self.cached(cancel, self.inner.cache.save_code(&outbound.phone, &code, ttl))
                .await?;

            info!(
                phone = %mask_phone_number(&outbound.phone),
                event = "verification_code_issued",
                "verification code generated"
            );

            outbound.params = vec![code];
            self.deliver(&outbound, started, cancel).await
        }
        .instrument(self.inner.span.clone())
        .await
    }

    /// Redeem a verification code
    ///
    /// Codes are compared in constant time. With `clean_once` set a matched
    /// code is deleted, so it redeems once.
    ///
    /// # Returns
    ///
    /// * `Ok(VerifyResult)` - Valid, invalid or not found; a missing or
    ///   expired code is a normal outcome
    /// * `Err(SmsError)` - Only when the store fails or `cancel` fires
    pub async fn verify_code(&self, request: &VerifyCodeRequest, cancel: &CancellationSignal) -> SmsResult<VerifyResult> {
        async {
            let phone = mask_phone_number(&request.phone);
            let stored = match self.cached(cancel, self.inner.cache.get_code(&request.phone)).await {
                Ok(code) => code,
                Err(SmsError::Cache(err)) if err.is_not_found() => {
                    debug!(phone = %phone, "no verification code stored");
                    return Ok(VerifyResult::not_found());
                }
                Err(err) => return Err(err),
            };

            if stored.is_empty() {
                return Ok(VerifyResult::not_found());
            }

            if !constant_time_eq(stored.as_bytes(), request.code.as_bytes()) {
                warn!(phone = %phone, event = "verification_failed", "verification code mismatch");
                return Ok(VerifyResult::invalid());
            }

            if request.clean_once {
                if let Err(err) = self.inner.cache.delete_code(&request.phone).await {
                    warn!(phone = %phone, error = %err, "failed to delete redeemed verification code");
                }
            }

            info!(phone = %phone, event = "verification_succeeded", "verification code accepted");
            Ok(VerifyResult::valid())
        }
        .instrument(self.inner.span.clone())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_length_and_digits() {
        for length in [1, 4, 6, 8] {
            let code = generate_code(length);
            assert_eq!(code.len(), length);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
        assert_eq!(generate_code(0).len(), DEFAULT_CODE_LENGTH);
    }

    #[test]
    fn test_generate_code_covers_every_digit() {
        let sample: String = (0..200).map(|_| generate_code(6)).collect();
        for digit in '0'..='9' {
            assert!(sample.contains(digit), "digit {} never generated", digit);
        }
    }
}
