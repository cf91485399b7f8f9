//! Layered cache engine
//!
//! Named tiers (fastest first) with independent capacity and eviction
//! policies, read-through lookups with promotion, tag and pattern
//! invalidation with cycle-safe cascading, and periodic maintenance.

mod layer;
pub mod maintenance;
pub mod manager;
pub mod size;
pub mod types;

#[cfg(test)]
mod tests;

pub use manager::LayeredCache;
pub use size::{FixedSizeEstimator, JsonSizeEstimator, SizeEstimator};
pub use types::{
    CacheEntry, CacheStats, GetOptions, Invalidation, InvalidationRule, KeyPattern, LayerStats,
    SetOptions, WarmupItem, WarmupReport,
};
