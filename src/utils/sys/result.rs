//! Result extension utilities for best-effort error handling
//!
//! Remediation work must never abort the caller it runs on behalf of;
//! this helper logs the failure and carries on without a value.

use crate::utils::error::Result;
use tracing::warn;

/// Extension trait for Result types
pub trait ResultExt<T> {
    /// Log the error and continue without a value
    fn log_and_continue(self, context: &str) -> Option<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn log_and_continue(self, context: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Non-fatal error in {}: {}. Continuing...", context, e);
                None
            }
        }
    }
}
