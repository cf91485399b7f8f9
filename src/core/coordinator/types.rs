//! Coordinator type definitions

use crate::config::models::coordinator::{CacheStrategy, SystemConfig};
use crate::core::cache_manager::CacheStats;
use crate::core::resource_resolver::{Conflict, ConflictKind};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// A logical subsystem competing for execution slots
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredSystem {
    pub id: String,
    pub name: String,
    /// 1 (lowest) to 10 (highest)
    pub priority: u8,
    pub max_concurrent_ops: usize,
    pub cache_strategy: CacheStrategy,
    /// TTL of results cached for this system
    pub refresh_interval: Duration,
    pub depends_on: Vec<String>,
}

impl RegisteredSystem {
    pub fn new(id: impl Into<String>, priority: u8, max_concurrent_ops: usize) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            priority,
            max_concurrent_ops,
            cache_strategy: CacheStrategy::Shared,
            refresh_interval: Duration::from_secs(300),
            depends_on: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_cache_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.cache_strategy = strategy;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn depends_on<I, S>(mut self, systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = systems.into_iter().map(Into::into).collect();
        self
    }

    /// Key under which a result is cached, or `None` when the system never caches
    pub fn cache_key(&self, key: &str) -> Option<String> {
        match self.cache_strategy {
            CacheStrategy::Shared => Some(key.to_string()),
            CacheStrategy::Isolated => Some(format!("{}:{}", self.id, key)),
            CacheStrategy::None => None,
        }
    }
}

impl From<&SystemConfig> for RegisteredSystem {
    fn from(config: &SystemConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone().unwrap_or_else(|| config.id.clone()),
            priority: config.priority,
            max_concurrent_ops: config.max_concurrent_ops,
            cache_strategy: config.cache_strategy,
            refresh_interval: Duration::from_secs(config.refresh_interval_secs),
            depends_on: config.depends_on.clone(),
        }
    }
}

/// Rolling health of one system
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemHealth {
    pub active_ops: usize,
    pub queued_ops: usize,
    /// Exponential moving average, milliseconds
    pub avg_response_time_ms: f64,
    pub error_rate: f64,
    pub cache_hit_rate: f64,
    pub last_activity: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_ops: u64,
}

impl SystemHealth {
    /// Fold one finished operation into the moving averages
    ///
    /// The first sample seeds every average directly.
    pub fn record(&mut self, response_time: Duration, success: bool, cache_hit: bool, alpha: f64) {
        let response_ms = response_time.as_secs_f64() * 1000.0;
        let error = if success { 0.0 } else { 1.0 };
        let hit = if cache_hit { 1.0 } else { 0.0 };

        if self.completed_ops == 0 {
            self.avg_response_time_ms = response_ms;
            self.error_rate = error;
            self.cache_hit_rate = hit;
        } else {
            self.avg_response_time_ms = ema(self.avg_response_time_ms, response_ms, alpha);
            self.error_rate = ema(self.error_rate, error, alpha);
            self.cache_hit_rate = ema(self.cache_hit_rate, hit, alpha);
        }
        self.completed_ops += 1;
        self.last_activity = Some(chrono::Utc::now());
    }
}

fn ema(current: f64, sample: f64, alpha: f64) -> f64 {
    alpha * sample + (1.0 - alpha) * current
}

/// One call to [`Coordinator::execute_coordinated`](super::Coordinator::execute_coordinated)
#[derive(Debug, Clone)]
pub struct CoordinatedRequest {
    pub system_id: String,
    pub request_id: String,
    /// Queue priority; the system's priority when unset
    pub priority: Option<u8>,
    pub use_shared_cache: bool,
    pub cache_key: Option<String>,
    /// The coordinator's default when unset
    pub timeout: Option<Duration>,
}

impl CoordinatedRequest {
    pub fn new(system_id: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            request_id: request_id.into(),
            priority: None,
            use_shared_cache: false,
            cache_key: None,
            timeout: None,
        }
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Read from and write to the shared cache under `key`
    pub fn cached(mut self, key: impl Into<String>) -> Self {
        self.use_shared_cache = true;
        self.cache_key = Some(key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ErrorRate,
    ResponseTime,
}

/// Threshold breach raised by the coordination loop
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub system_id: String,
    pub kind: AlertKind,
    pub value: f64,
    pub threshold: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// A system with its current health
#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    pub system: RegisteredSystem,
    pub health: SystemHealth,
}

/// Read-only view for dashboards and alerting
#[derive(Debug, Clone, Serialize)]
pub struct CoordinationAnalytics {
    pub systems: Vec<SystemSnapshot>,
    pub total_systems: usize,
    pub total_active_ops: usize,
    pub total_queued_ops: usize,
    pub conflicts_by_kind: HashMap<ConflictKind, usize>,
    pub recent_conflicts: Vec<Conflict>,
    pub recent_alerts: Vec<Alert>,
    pub cache: CacheStats,
}

impl CoordinationAnalytics {
    pub fn system(&self, id: &str) -> Option<&SystemSnapshot> {
        self.systems.iter().find(|s| s.system.id == id)
    }
}
