//! Integration tests for tiercoord
//!
//! These tests drive the public API and verify real component interaction
//! without mocking.

pub mod cache_tests;
pub mod coordinator_tests;
pub mod engine_tests;
pub mod resolver_tests;
