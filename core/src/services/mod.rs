//! Dispatch services: retry, failover and the client that composes them.

pub mod dispatch;
pub mod failover;
pub mod retry;

pub use dispatch::DispatchClient;
pub use failover::FailoverCoordinator;
pub use retry::{RetryExecutor, RetryOutcome};
