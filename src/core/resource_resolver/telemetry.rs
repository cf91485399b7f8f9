//! External signals consumed by the conflict heuristics

use serde::{Deserialize, Serialize};

/// Memory-leak risk reported by a telemetry source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakRisk {
    #[default]
    Low,
    Medium,
    High,
}

/// Host resource usage, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub memory_percent: f64,
    pub cpu_percent: f64,
    pub network_percent: f64,
}

/// Source of host-level telemetry
#[cfg_attr(test, mockall::automock)]
pub trait ResourceTelemetry: Send + Sync {
    fn leak_risk(&self) -> LeakRisk;

    fn usage(&self) -> ResourceUsage;
}

/// Telemetry source returning fixed values
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticTelemetry {
    pub leak_risk: LeakRisk,
    pub usage: ResourceUsage,
}

impl ResourceTelemetry for StaticTelemetry {
    fn leak_risk(&self) -> LeakRisk {
        self.leak_risk
    }

    fn usage(&self) -> ResourceUsage {
        self.usage
    }
}

/// Cache footprint and relief hooks used by cache and memory remediation
pub trait CachePressure: Send + Sync {
    /// Estimated bytes currently held
    fn usage_bytes(&self) -> u64;

    /// Configured byte budget
    fn capacity_bytes(&self) -> u64;

    /// Evict entries until usage drops under the budget; returns evicted count
    fn relieve_pressure(&self) -> usize;

    /// Drop expired and low-value entries; returns removed count
    fn cleanup(&self) -> usize;
}
