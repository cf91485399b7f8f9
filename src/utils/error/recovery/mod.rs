//! Error recovery and resilience utilities
//!
//! Timeout enforcement with cooperative cancellation and the backoff
//! strategies used between allocation retries.

mod resilience;
mod retry;

pub use resilience::TimeoutWrapper;
pub use retry::BackoffStrategy;
