//! Resource conflict resolution
//!
//! A resource-type-agnostic allocator (database connections, memory, cache
//! bytes, API calls, sockets) with bounded backoff-and-retry, plus periodic
//! detection and automatic remediation of cross-component contention.
//!
//! # Module Structure
//!
//! - `types` - Resource types, priorities, allocations and stats snapshots
//! - `conflict` - Conflict records and their retention log (shared with the coordinator)
//! - `telemetry` - External signals and the cache pressure seam
//! - `window` - Trailing-window call accounting
//! - `resolver` - Allocation and release
//! - `detection` - Conflict heuristics, remediation and the monitoring loop

pub mod conflict;
pub mod detection;
pub mod resolver;
pub mod telemetry;
pub mod types;
mod window;

pub use conflict::{Conflict, ConflictKind, ConflictLog, ConflictSeverity, RemediationAction};
pub use detection::DetectionReport;
pub use resolver::{AllocationHandle, ConflictResolver};
pub use telemetry::{CachePressure, LeakRisk, ResourceTelemetry, ResourceUsage, StaticTelemetry};
pub use types::{
    AllocationPriority, ResourceAllocation, ResourceStats, ResourceType, ResourceTypeStats,
};
