//! Bounded retry loop with fixed, exponential or linear backoff.

mod executor;

#[cfg(test)]
mod tests;

pub use executor::{RetryExecutor, RetryOutcome};
