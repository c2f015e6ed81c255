//! Dispatch client: single sends, batches and the verification code flow.

mod batch;
mod client;
mod verification;

#[cfg(test)]
mod tests;

pub use client::DispatchClient;
