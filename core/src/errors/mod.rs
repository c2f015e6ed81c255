//! Error types for dispatch, cache access and configuration.

mod dispatch_error;

pub use dispatch_error::{codes, DispatchError, ErrorKind};

use thiserror::Error;

use crate::domain::SendResponse;

/// Key-value store failures, surfaced to callers without reinterpretation
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("key not found: {key}")]
    NotFound { key: String },

    #[error("cache store unavailable: {message}")]
    Unavailable { message: String },

    #[error("cache store error: {message}")]
    Backend { message: String },

    #[error("cache record could not be decoded: {message}")]
    Serialization { message: String },
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound { .. })
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Errors returned by the dispatch client
#[derive(Error, Debug, Clone)]
pub enum SmsError {
    /// The request was rejected before any provider or cache call
    #[error("invalid request: {0}")]
    InvalidRequest(DispatchError),

    /// Every attempt failed; `response` describes the last one
    #[error("delivery failed: {error}")]
    Delivery {
        error: DispatchError,
        response: Box<SendResponse>,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl SmsError {
    /// Response produced before the failure, if any
    pub fn response(&self) -> Option<&SendResponse> {
        match self {
            SmsError::Delivery { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Delivery-level error, if this failure has one
    pub fn dispatch_error(&self) -> Option<&DispatchError> {
        match self {
            SmsError::InvalidRequest(error) | SmsError::Delivery { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<smsflow_shared::ConfigValidationError> for SmsError {
    fn from(err: smsflow_shared::ConfigValidationError) -> Self {
        SmsError::Configuration {
            message: err.to_string(),
        }
    }
}

pub type SmsResult<T> = Result<T, SmsError>;
