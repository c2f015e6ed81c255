//! Tests for the failover coordinator

#[cfg(test)]
mod coordinator_tests;
