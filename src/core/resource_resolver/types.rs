//! Resource allocation types

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

/// Kinds of contended resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    DatabaseConnection,
    Memory,
    Cache,
    ApiCall,
    Socket,
}

impl ResourceType {
    pub const ALL: [ResourceType; 5] = [
        ResourceType::DatabaseConnection,
        ResourceType::Memory,
        ResourceType::Cache,
        ResourceType::ApiCall,
        ResourceType::Socket,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::DatabaseConnection => "database_connection",
            ResourceType::Memory => "memory",
            ResourceType::Cache => "cache",
            ResourceType::ApiCall => "api_call",
            ResourceType::Socket => "socket",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority of an allocation request
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// A granted allocation
#[derive(Debug, Clone, Serialize)]
pub struct ResourceAllocation {
    pub id: String,
    pub resource_type: ResourceType,
    /// Component holding the allocation
    pub component: String,
    pub allocated_at: chrono::DateTime<chrono::Utc>,
    pub released: bool,
    pub priority: AllocationPriority,
    #[serde(skip)]
    pub(crate) acquired: Instant,
}

impl ResourceAllocation {
    pub(crate) fn new(
        resource_type: ResourceType,
        component: &str,
        priority: AllocationPriority,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            resource_type,
            component: component.to_string(),
            allocated_at: chrono::Utc::now(),
            released: false,
            priority,
            acquired: Instant::now(),
        }
    }

    /// How long the allocation has been held
    pub fn held_for(&self) -> std::time::Duration {
        Instant::now().duration_since(self.acquired)
    }
}

/// Lifetime counters for one resource type
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AllocationCounters {
    pub granted: u64,
    pub denied: u64,
    pub released: u64,
    pub reclaimed: u64,
}

/// Snapshot for one resource type
#[derive(Debug, Clone, Serialize)]
pub struct ResourceTypeStats {
    pub resource_type: ResourceType,
    pub active: usize,
    /// Limit currently enforced (lowered while throttled)
    pub max_concurrent: usize,
    pub utilization: f64,
    #[serde(flatten)]
    pub counters: AllocationCounters,
}

/// Read-only snapshot of the resolver
#[derive(Debug, Clone, Serialize)]
pub struct ResourceStats {
    pub resources: Vec<ResourceTypeStats>,
    pub api_calls_last_minute: usize,
    pub api_throttled: bool,
    pub active_conflicts: usize,
    pub resolved_conflicts: usize,
    pub memory_percent: f64,
    pub cpu_percent: f64,
    pub network_percent: f64,
}

impl ResourceStats {
    /// Stats for one resource type
    pub fn get(&self, resource_type: ResourceType) -> Option<&ResourceTypeStats> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type)
    }
}
