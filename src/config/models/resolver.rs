//! Conflict resolver configuration

use super::*;
use crate::core::resource_resolver::types::{AllocationPriority, ResourceType};
use crate::utils::error::recovery::BackoffStrategy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Allocation limits and retry policy for one resource type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationStrategyConfig {
    pub max_concurrent: usize,
    /// Higher weight shortens the computed wait
    #[serde(default = "default_priority_weights")]
    pub priority_weights: HashMap<AllocationPriority, f64>,
    #[serde(default)]
    pub backoff: BackoffStrategy,
    #[serde(default)]
    pub retry_attempts: u32,
}

impl AllocationStrategyConfig {
    pub fn new(max_concurrent: usize, backoff: BackoffStrategy, retry_attempts: u32) -> Self {
        Self {
            max_concurrent,
            priority_weights: default_priority_weights(),
            backoff,
            retry_attempts,
        }
    }

    /// Weight for `priority`, falling back to 1.0
    pub fn weight(&self, priority: AllocationPriority) -> f64 {
        self.priority_weights
            .get(&priority)
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(1.0)
    }
}

pub fn default_priority_weights() -> HashMap<AllocationPriority, f64> {
    HashMap::from([
        (AllocationPriority::Low, 0.5),
        (AllocationPriority::Normal, 1.0),
        (AllocationPriority::High, 1.5),
        (AllocationPriority::Critical, 2.0),
    ])
}

pub fn default_allocation_strategies() -> HashMap<ResourceType, AllocationStrategyConfig> {
    HashMap::from([
        (
            ResourceType::DatabaseConnection,
            AllocationStrategyConfig::new(20, BackoffStrategy::Exponential, 3),
        ),
        (
            ResourceType::Memory,
            AllocationStrategyConfig::new(100, BackoffStrategy::Linear, 3),
        ),
        (
            ResourceType::Cache,
            AllocationStrategyConfig::new(50, BackoffStrategy::Linear, 2),
        ),
        (
            ResourceType::ApiCall,
            AllocationStrategyConfig::new(100, BackoffStrategy::Exponential, 5),
        ),
        (
            ResourceType::Socket,
            AllocationStrategyConfig::new(200, BackoffStrategy::Immediate, 1),
        ),
    ])
}

/// Conflict resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_allocation_strategies")]
    pub strategies: HashMap<ResourceType, AllocationStrategyConfig>,
    /// Base unit for computed waits and backoff delays
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
    /// Fraction of the database pool in use that counts as a conflict
    #[serde(default = "default_usage_threshold")]
    pub database_threshold: f64,
    /// Fraction of the cache byte budget in use that counts as a conflict
    #[serde(default = "default_usage_threshold")]
    pub cache_bytes_threshold: f64,
    /// Ceiling on API calls in the trailing minute
    #[serde(default = "default_api_calls_per_minute")]
    pub api_calls_per_minute: usize,
    #[serde(default = "default_api_throttle_secs")]
    pub api_throttle_secs: u64,
    /// Allocations held longer than this are reclaimed during remediation
    #[serde(default = "default_stale_allocation_secs")]
    pub stale_allocation_secs: u64,
    #[serde(default = "default_conflict_retention_secs")]
    pub conflict_retention_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strategies: default_allocation_strategies(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            monitor_interval_secs: default_monitor_interval_secs(),
            database_threshold: default_usage_threshold(),
            cache_bytes_threshold: default_usage_threshold(),
            api_calls_per_minute: default_api_calls_per_minute(),
            api_throttle_secs: default_api_throttle_secs(),
            stale_allocation_secs: default_stale_allocation_secs(),
            conflict_retention_secs: default_conflict_retention_secs(),
        }
    }
}

impl ResolverConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn stale_allocation_age(&self) -> Duration {
        Duration::from_secs(self.stale_allocation_secs)
    }

    pub fn api_throttle(&self) -> Duration {
        Duration::from_secs(self.api_throttle_secs)
    }

    pub fn conflict_retention(&self) -> Duration {
        Duration::from_secs(self.conflict_retention_secs)
    }

    /// Replace the strategy for one resource type
    pub fn with_strategy(mut self, resource_type: ResourceType, strategy: AllocationStrategyConfig) -> Self {
        self.strategies.insert(resource_type, strategy);
        self
    }
}
