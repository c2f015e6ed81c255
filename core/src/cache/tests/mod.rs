//! Tests for the cache façade

#[cfg(test)]
mod sms_cache_tests;
