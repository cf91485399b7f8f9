//! Configuration data models
//!
//! This module defines all configuration structures used throughout the engine.

#![allow(missing_docs)]

pub mod cache;
pub mod coordinator;
pub mod engine;
pub mod logging;
pub mod resolver;

// Re-export all configuration types
pub use cache::*;
pub use coordinator::*;
pub use engine::*;
pub use logging::*;
pub use resolver::*;

pub fn default_true() -> bool {
    true
}

/// Smoothing factor shared by every exponential moving average
pub fn default_ema_alpha() -> f64 {
    0.1
}

pub fn default_promotion_threshold() -> u64 {
    3
}

pub fn default_low_value_idle_secs() -> u64 {
    300 // 5 minutes
}

pub fn default_pressure_relief_ratio() -> f64 {
    0.7
}

pub fn default_rebalance_access_threshold() -> u64 {
    10
}

pub fn default_expire_interval_secs() -> u64 {
    60
}

pub fn default_low_value_interval_secs() -> u64 {
    300
}

pub fn default_rebalance_interval_secs() -> u64 {
    120
}

pub fn default_global_active_ops_threshold() -> usize {
    50
}

pub fn default_dependency_error_threshold() -> f64 {
    0.05
}

pub fn default_dependency_poll_interval_ms() -> u64 {
    100
}

pub fn default_dependency_max_wait_ms() -> u64 {
    2000
}

pub fn default_cache_entry_threshold() -> usize {
    10_000
}

pub fn default_timing_threshold_ms() -> f64 {
    5000.0
}

pub fn default_alert_error_rate() -> f64 {
    0.10
}

pub fn default_alert_response_time_ms() -> f64 {
    10_000.0
}

pub fn default_alert_interval_secs() -> u64 {
    30
}

pub fn default_cache_expiry_interval_secs() -> u64 {
    300 // 5 minutes
}

pub fn default_dispatch_interval_secs() -> u64 {
    5
}

pub fn default_conflict_retention_secs() -> u64 {
    3600 // 1 hour
}

pub fn default_operation_timeout_ms() -> u64 {
    30_000
}

pub fn default_system_priority() -> u8 {
    5
}

pub fn default_max_concurrent_ops() -> usize {
    4
}

pub fn default_refresh_interval_secs() -> u64 {
    300
}

pub fn default_base_delay_ms() -> u64 {
    50
}

pub fn default_max_delay_ms() -> u64 {
    5000
}

pub fn default_monitor_interval_secs() -> u64 {
    30
}

pub fn default_usage_threshold() -> f64 {
    0.8
}

pub fn default_api_calls_per_minute() -> usize {
    1000
}

pub fn default_api_throttle_secs() -> u64 {
    60
}

pub fn default_stale_allocation_secs() -> u64 {
    300
}
