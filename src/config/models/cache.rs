//! Cache engine configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rule selecting a victim entry when a layer is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Least recently accessed entry
    #[default]
    Lru,
    /// Least frequently accessed entry
    Lfu,
    /// Entry closest to expiry
    Ttl,
    /// Entry with the lowest priority
    Priority,
}

/// One cache tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheLayerConfig {
    /// Layer name, referenced by callers
    pub name: String,
    /// Maximum number of entries
    pub max_entries: usize,
    /// Maximum total estimated size in bytes
    pub max_bytes: u64,
    /// TTL applied when a write does not specify one
    pub default_ttl_secs: u64,
    /// Victim selection when the layer is full
    #[serde(default)]
    pub eviction_policy: EvictionPolicy,
    /// Disabled layers are never read or written
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CacheLayerConfig {
    pub fn new(name: impl Into<String>, max_entries: usize, max_bytes: u64) -> Self {
        Self {
            name: name.into(),
            max_entries,
            max_bytes,
            default_ttl_secs: 300,
            eviction_policy: EvictionPolicy::default(),
            enabled: true,
        }
    }

    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_secs = ttl.as_secs();
        self
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// Invalidation rule loaded from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationRuleConfig {
    /// Literal substring, or a regular expression when `regex` is set
    pub pattern: String,
    #[serde(default)]
    pub regex: bool,
    /// Event names that trigger the rule
    pub events: Vec<String>,
    #[serde(default)]
    pub cascade: bool,
    /// Delay before the rule is applied
    #[serde(default)]
    pub delay_ms: u64,
}

/// Layered cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Layers, fastest first
    #[serde(default = "default_cache_layers")]
    pub layers: Vec<CacheLayerConfig>,
    /// Access count at which a hit is copied into faster layers
    #[serde(default = "default_promotion_threshold")]
    pub promotion_threshold: u64,
    /// Idle time after which an entry read at most once is considered low value
    #[serde(default = "default_low_value_idle_secs")]
    pub low_value_idle_secs: u64,
    /// Entries accessed more often than this are rebalanced into the fastest layer
    #[serde(default = "default_rebalance_access_threshold")]
    pub rebalance_access_threshold: u64,
    #[serde(default = "default_expire_interval_secs")]
    pub expire_interval_secs: u64,
    #[serde(default = "default_low_value_interval_secs")]
    pub low_value_interval_secs: u64,
    #[serde(default = "default_rebalance_interval_secs")]
    pub rebalance_interval_secs: u64,
    /// Smoothing factor for per-layer response time
    #[serde(default = "default_ema_alpha")]
    pub response_time_alpha: f64,
    /// Fraction of each layer's byte budget kept after a pressure relief pass
    #[serde(default = "default_pressure_relief_ratio")]
    pub pressure_relief_ratio: f64,
    #[serde(default)]
    pub invalidation_rules: Vec<InvalidationRuleConfig>,
}

pub fn default_cache_layers() -> Vec<CacheLayerConfig> {
    vec![
        CacheLayerConfig::new("fast", 1_000, 16 * 1024 * 1024)
            .with_policy(EvictionPolicy::Lru)
            .with_default_ttl(Duration::from_secs(300)),
        CacheLayerConfig::new("medium", 10_000, 128 * 1024 * 1024)
            .with_policy(EvictionPolicy::Lfu)
            .with_default_ttl(Duration::from_secs(1800)),
        CacheLayerConfig::new("slow", 100_000, 512 * 1024 * 1024)
            .with_policy(EvictionPolicy::Ttl)
            .with_default_ttl(Duration::from_secs(7200)),
    ]
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            layers: default_cache_layers(),
            promotion_threshold: default_promotion_threshold(),
            low_value_idle_secs: default_low_value_idle_secs(),
            rebalance_access_threshold: default_rebalance_access_threshold(),
            expire_interval_secs: default_expire_interval_secs(),
            low_value_interval_secs: default_low_value_interval_secs(),
            rebalance_interval_secs: default_rebalance_interval_secs(),
            response_time_alpha: default_ema_alpha(),
            pressure_relief_ratio: default_pressure_relief_ratio(),
            invalidation_rules: Vec::new(),
        }
    }
}

impl CacheConfig {
    /// Configuration with the given layers and default tuning
    pub fn with_layers(layers: Vec<CacheLayerConfig>) -> Self {
        Self {
            layers,
            ..Self::default()
        }
    }

    pub fn low_value_idle(&self) -> Duration {
        Duration::from_secs(self.low_value_idle_secs)
    }

    /// Sum of every enabled layer's byte budget
    pub fn total_max_bytes(&self) -> u64 {
        self.layers
            .iter()
            .filter(|l| l.enabled)
            .map(|l| l.max_bytes)
            .sum()
    }
}
