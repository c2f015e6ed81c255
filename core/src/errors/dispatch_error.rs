//! Delivery-level error carried through retry and failover

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Machine-readable error codes
pub mod codes {
    pub const INVALID_PHONE: &str = "INVALID_PHONE";
    pub const EMPTY_TEMPLATE: &str = "EMPTY_TEMPLATE";
    pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
    pub const SEND_FAILED: &str = "SEND_FAILED";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const AUTH_FAILED: &str = "AUTH_FAILED";
    pub const CANCELLED: &str = "CANCELLED";
    pub const UNKNOWN: &str = "UNKNOWN";
}

/// Error category used by the retry predicate and providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Timeout,
    /// The provider rejected the message
    Provider,
    RateLimit,
    Auth,
    InvalidRequest,
    /// The caller's cancellation signal fired
    Cancelled,
    Unknown,
}

impl ErrorKind {
    /// Retryability assumed when a provider does not say otherwise
    pub fn default_retryable(self) -> bool {
        !matches!(
            self,
            ErrorKind::InvalidRequest | ErrorKind::Auth | ErrorKind::RateLimit | ErrorKind::Cancelled
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Provider => "provider",
            ErrorKind::RateLimit => "rate-limit",
            ErrorKind::Auth => "auth",
            ErrorKind::InvalidRequest => "invalid-request",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

type Source = Arc<dyn StdError + Send + Sync + 'static>;

/// Tagged delivery error
///
/// Cloneable so the terminal error can travel inside a [`SendResponse`](crate::domain::SendResponse)
/// as well as in the returned `Err`.
#[derive(Debug, Clone)]
pub struct DispatchError {
    pub code: String,
    pub message: String,
    pub kind: ErrorKind,
    pub retryable: bool,
    pub provider: Option<String>,
    source: Option<Source>,
}

impl DispatchError {
    /// Create an error whose retryability follows its kind
    pub fn new(code: impl Into<String>, message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            kind,
            retryable: kind.default_retryable(),
            provider: None,
            source: None,
        }
    }

    pub fn invalid_request(code: &str, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::InvalidRequest)
    }

    pub fn rate_limited() -> Self {
        Self::new(codes::RATE_LIMIT_EXCEEDED, "rate limit exceeded", ErrorKind::RateLimit)
    }

    pub fn timeout(provider: &str) -> Self {
        Self::new(codes::TIMEOUT, "request timeout", ErrorKind::Timeout).with_provider(provider)
    }

    pub fn cancelled() -> Self {
        Self::new(codes::CANCELLED, "operation cancelled", ErrorKind::Cancelled)
    }

    pub fn provider_rejected(provider: &str, message: impl Into<String>) -> Self {
        Self::new(codes::SEND_FAILED, message, ErrorKind::Provider).with_provider(provider)
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.message.is_empty() {
            f.write_str(&self.message)
        } else if let Some(source) = &self.source {
            write!(f, "{}", source)
        } else {
            f.write_str("unknown SMS error")
        }
    }
}

impl StdError for DispatchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}
