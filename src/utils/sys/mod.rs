//! System utilities
//!
//! Best-effort result handling and lifecycle management for background tasks.

pub mod result;
pub mod tasks;

pub use result::ResultExt;
pub use tasks::BackgroundTasks;
