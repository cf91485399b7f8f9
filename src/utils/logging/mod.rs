//! Logging setup
//!
//! Every component logs through `tracing`; this module installs the
//! subscriber that formats those events.

mod subscriber;
mod types;

pub use subscriber::init_logging;
pub use types::LogLevel;
