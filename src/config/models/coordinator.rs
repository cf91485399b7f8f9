//! Coordinator configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a system's results are cached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    /// Keys are shared with every other system
    #[default]
    Shared,
    /// Keys are namespaced by system id
    Isolated,
    /// Results are never cached
    None,
}

/// A system registered at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// 1 (lowest) to 10 (highest)
    #[serde(default = "default_system_priority")]
    pub priority: u8,
    #[serde(default = "default_max_concurrent_ops")]
    pub max_concurrent_ops: usize,
    #[serde(default)]
    pub cache_strategy: CacheStrategy,
    /// TTL for results cached on behalf of this system
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Coordinator thresholds and loop intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Total active operations across all systems before a resource conflict is raised
    #[serde(default = "default_global_active_ops_threshold")]
    pub global_active_ops_threshold: usize,
    /// Dependency error rate above which callers wait for the dependency
    #[serde(default = "default_dependency_error_threshold")]
    pub dependency_error_threshold: f64,
    #[serde(default = "default_dependency_poll_interval_ms")]
    pub dependency_poll_interval_ms: u64,
    #[serde(default = "default_dependency_max_wait_ms")]
    pub dependency_max_wait_ms: u64,
    /// Shared cache entry count above which an optimization pass runs
    #[serde(default = "default_cache_entry_threshold")]
    pub cache_entry_threshold: usize,
    /// Average response time above which a timing conflict is raised
    #[serde(default = "default_timing_threshold_ms")]
    pub timing_threshold_ms: f64,
    #[serde(default = "default_alert_error_rate")]
    pub alert_error_rate: f64,
    #[serde(default = "default_alert_response_time_ms")]
    pub alert_response_time_ms: f64,
    /// Smoothing factor for system health metrics
    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f64,
    #[serde(default = "default_alert_interval_secs")]
    pub alert_interval_secs: u64,
    #[serde(default = "default_cache_expiry_interval_secs")]
    pub cache_expiry_interval_secs: u64,
    #[serde(default = "default_dispatch_interval_secs")]
    pub dispatch_interval_secs: u64,
    #[serde(default = "default_conflict_retention_secs")]
    pub conflict_retention_secs: u64,
    /// Timeout used by callers that do not pick one
    #[serde(default = "default_operation_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default)]
    pub systems: Vec<SystemConfig>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            global_active_ops_threshold: default_global_active_ops_threshold(),
            dependency_error_threshold: default_dependency_error_threshold(),
            dependency_poll_interval_ms: default_dependency_poll_interval_ms(),
            dependency_max_wait_ms: default_dependency_max_wait_ms(),
            cache_entry_threshold: default_cache_entry_threshold(),
            timing_threshold_ms: default_timing_threshold_ms(),
            alert_error_rate: default_alert_error_rate(),
            alert_response_time_ms: default_alert_response_time_ms(),
            ema_alpha: default_ema_alpha(),
            alert_interval_secs: default_alert_interval_secs(),
            cache_expiry_interval_secs: default_cache_expiry_interval_secs(),
            dispatch_interval_secs: default_dispatch_interval_secs(),
            conflict_retention_secs: default_conflict_retention_secs(),
            default_timeout_ms: default_operation_timeout_ms(),
            systems: Vec::new(),
        }
    }
}

impl CoordinatorConfig {
    pub fn dependency_poll_interval(&self) -> Duration {
        Duration::from_millis(self.dependency_poll_interval_ms)
    }

    pub fn dependency_max_wait(&self) -> Duration {
        Duration::from_millis(self.dependency_max_wait_ms)
    }

    pub fn conflict_retention(&self) -> Duration {
        Duration::from_secs(self.conflict_retention_secs)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}
