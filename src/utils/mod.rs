//! Utility modules for the engine
//!
//! ## Module Organization
//!
//! - **error**: Error taxonomy, timeout with cancellation, and backoff
//! - **logging**: Tracing subscriber setup
//! - **sys**: Best-effort result handling and background task lifecycle

pub mod error; // Error handling
pub mod logging; // Logging
pub mod sys; // System utilities
