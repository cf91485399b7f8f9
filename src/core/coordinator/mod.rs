//! Resource allocation coordinator
//!
//! Registers competing systems, each with a priority and a concurrency limit,
//! and runs caller operations through shared-cache lookup, conflict
//! detection and priority-queued admission control.

pub mod background;
pub mod conflicts;
pub mod coordinator;
mod queue;
pub mod types;


pub use coordinator::Coordinator;
pub use types::{
    Alert, AlertKind, CoordinatedRequest, CoordinationAnalytics, RegisteredSystem, SystemHealth,
    SystemSnapshot,
};
