//! Tests for the retry executor
