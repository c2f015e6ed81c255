//! Inbound request types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Message category, forwarded to providers that price or route by it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageCategory {
    Verification,
    #[default]
    Notification,
    Marketing,
}

/// A single message to deliver
///
/// Re-sent verbatim on every retry and failover attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SendRequest {
    /// Recipient phone number
    pub phone: String,
    /// Provider template id
    #[serde(default)]
    pub template: String,
    /// Inline content for providers without templates
    #[serde(default)]
    pub content: String,
    /// Template parameters, in template order
    #[serde(default)]
    pub params: Vec<String>,
    /// Sender signature
    #[serde(default)]
    pub sign_name: String,
    #[serde(default)]
    pub category: MessageCategory,
    /// Caller id used to match delivery callbacks
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl SendRequest {
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            ..Default::default()
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sign_name(mut self, sign_name: impl Into<String>) -> Self {
        self.sign_name = sign_name.into();
        self
    }

    pub fn with_category(mut self, category: MessageCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Request to issue a verification code
#[derive(Debug, Clone, Default)]
pub struct VerificationCodeRequest {
    pub phone: String,
    /// Code lifetime; `None` or zero uses the configured code TTL
    pub ttl: Option<Duration>,
    /// Number of digits; zero uses [`DEFAULT_CODE_LENGTH`]
    pub code_length: usize,
    pub template: String,
    pub sign_name: String,
}

/// Digits in a verification code when the request does not say
pub const DEFAULT_CODE_LENGTH: usize = 6;

impl VerificationCodeRequest {
    pub fn new(phone: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            template: template.into(),
            ..Default::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    pub fn with_sign_name(mut self, sign_name: impl Into<String>) -> Self {
        self.sign_name = sign_name.into();
        self
    }
}

/// Request to redeem a verification code
#[derive(Debug, Clone, Default)]
pub struct VerifyCodeRequest {
    pub phone: String,
    pub code: String,
    /// Delete the stored code after a successful match
    pub clean_once: bool,
}

impl VerifyCodeRequest {
    pub fn new(phone: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            code: code.into(),
            clean_once: true,
        }
    }

    pub fn keep_code(mut self) -> Self {
        self.clean_once = false;
        self
    }
}
