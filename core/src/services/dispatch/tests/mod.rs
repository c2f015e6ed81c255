//! Tests for the dispatch client
