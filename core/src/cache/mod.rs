//! Verification code, rate-limit and audit-log persistence.

mod memory;
mod sms_cache;
mod store;

#[cfg(test)]
mod tests;

pub use memory::MemoryStore;
pub use sms_cache::{SmsCache, DEFAULT_FAILOVER_RECORD_LIMIT};
pub use store::KeyValueStore;
