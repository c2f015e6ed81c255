//! Domain types exchanged with the dispatch client.

pub mod health;
pub mod request;
pub mod response;

pub use health::{FailoverRecord, ProviderHealth};
pub use request::{
    MessageCategory, SendRequest, VerificationCodeRequest, VerifyCodeRequest, DEFAULT_CODE_LENGTH,
};
pub use response::{Balance, BatchResult, SendResponse, VerifyResult, VerifyStatus};
