//! Resource allocation and release

use super::conflict::{Conflict, ConflictLog};
use super::telemetry::{CachePressure, ResourceTelemetry, StaticTelemetry};
use super::types::{
    AllocationCounters, AllocationPriority, ResourceAllocation, ResourceStats, ResourceType,
    ResourceTypeStats,
};
use super::window::CallWindow;
use crate::config::models::resolver::{AllocationStrategyConfig, ResolverConfig};
use crate::utils::error::{EngineError, Result};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

const API_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct Pool {
    allocations: HashMap<String, ResourceAllocation>,
    counters: AllocationCounters,
}

/// Live allocations, shared with outstanding handles
#[derive(Debug, Default)]
pub(crate) struct AllocationTable {
    pools: DashMap<ResourceType, Pool>,
}

impl AllocationTable {
    fn release(&self, resource_type: ResourceType, id: &str) -> bool {
        let Some(mut pool) = self.pools.get_mut(&resource_type) else {
            return false;
        };
        if pool.allocations.remove(id).is_some() {
            pool.counters.released += 1;
            true
        } else {
            false
        }
    }

    fn active(&self, resource_type: ResourceType) -> usize {
        self.pools
            .get(&resource_type)
            .map(|pool| pool.allocations.len())
            .unwrap_or(0)
    }
}

/// Granted allocation; released when dropped
#[derive(Debug)]
pub struct AllocationHandle {
    table: Arc<AllocationTable>,
    allocation: ResourceAllocation,
    released: bool,
}

impl AllocationHandle {
    pub fn id(&self) -> &str {
        &self.allocation.id
    }

    pub fn resource_type(&self) -> ResourceType {
        self.allocation.resource_type
    }

    pub fn allocation(&self) -> &ResourceAllocation {
        &self.allocation
    }

    /// Release now; false when the allocation was already reclaimed
    pub fn release(mut self) -> bool {
        self.released = true;
        self.table
            .release(self.allocation.resource_type, &self.allocation.id)
    }
}

impl Drop for AllocationHandle {
    fn drop(&mut self) {
        if !self.released {
            self.table
                .release(self.allocation.resource_type, &self.allocation.id);
        }
    }
}

/// Resource-type-agnostic allocator with conflict detection
pub struct ConflictResolver {
    pub(super) config: ResolverConfig,
    pub(super) table: Arc<AllocationTable>,
    pub(super) conflicts: ConflictLog,
    pub(super) api_window: Mutex<CallWindow>,
    pub(super) throttled_until: Mutex<Option<Instant>>,
    pub(super) telemetry: Arc<dyn ResourceTelemetry>,
    pub(super) cache: RwLock<Option<Arc<dyn CachePressure>>>,
}

impl std::fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictResolver")
            .field("table", &self.table)
            .field("conflicts", &self.conflicts.len())
            .finish()
    }
}

impl ConflictResolver {
    /// Create a resolver with static (all-clear) telemetry and no cache attached
    pub fn new(config: ResolverConfig) -> Self {
        let retention = config.conflict_retention();
        Self {
            config,
            table: Arc::new(AllocationTable::default()),
            conflicts: ConflictLog::new(retention),
            api_window: Mutex::new(CallWindow::new(API_WINDOW)),
            throttled_until: Mutex::new(None),
            telemetry: Arc::new(StaticTelemetry::default()),
            cache: RwLock::new(None),
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn ResourceTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_cache(self, cache: Arc<dyn CachePressure>) -> Self {
        self.attach_cache(cache);
        self
    }

    /// Attach the cache whose footprint feeds the cache heuristic
    pub fn attach_cache(&self, cache: Arc<dyn CachePressure>) {
        *self.cache.write() = Some(cache);
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn strategy(&self, resource_type: ResourceType) -> Result<&AllocationStrategyConfig> {
        self.config.strategies.get(&resource_type).ok_or_else(|| {
            EngineError::validation(format!("No allocation strategy for {}", resource_type))
        })
    }

    /// Whether API calls are currently throttled
    pub fn is_api_throttled(&self) -> bool {
        self.throttled_until
            .lock()
            .is_some_and(|until| Instant::now() < until)
    }

    /// Concurrency limit currently enforced for `resource_type`
    pub fn effective_limit(&self, resource_type: ResourceType) -> Option<usize> {
        let limit = self.config.strategies.get(&resource_type)?.max_concurrent;
        if resource_type == ResourceType::ApiCall && self.is_api_throttled() {
            Some((limit / 2).max(1))
        } else {
            Some(limit)
        }
    }

    /// Active allocations for `resource_type`
    pub fn active_allocations(&self, resource_type: ResourceType) -> usize {
        self.table.active(resource_type)
    }

    /// Snapshot of the live allocations for `resource_type`
    pub fn allocations(&self, resource_type: ResourceType) -> Vec<ResourceAllocation> {
        self.table
            .pools
            .get(&resource_type)
            .map(|pool| pool.allocations.values().cloned().collect())
            .unwrap_or_default()
    }

    fn try_allocate(
        &self,
        resource_type: ResourceType,
        component: &str,
        priority: AllocationPriority,
        limit: usize,
    ) -> Option<ResourceAllocation> {
        let allocation = {
            let mut pool = self.table.pools.entry(resource_type).or_default();
            if pool.allocations.len() >= limit {
                return None;
            }
            let allocation = ResourceAllocation::new(resource_type, component, priority);
            pool.allocations
                .insert(allocation.id.clone(), allocation.clone());
            pool.counters.granted += 1;
            allocation
        };

        if resource_type == ResourceType::ApiCall {
            self.record_api_call();
        }
        Some(allocation)
    }

    /// Wait suggested to a requester, scaled by load and priority weight
    pub fn compute_wait(&self, resource_type: ResourceType, priority: AllocationPriority) -> Duration {
        let Ok(strategy) = self.strategy(resource_type) else {
            return self.config.max_delay();
        };
        let limit = self
            .effective_limit(resource_type)
            .unwrap_or(strategy.max_concurrent)
            .max(1);
        let load_factor = self.active_allocations(resource_type) as f64 / limit as f64;
        let max_delay = self.config.max_delay();
        let secs =
            self.config.base_delay().as_secs_f64() * load_factor / strategy.weight(priority);
        // Tiny weights push the ratio to infinity
        Duration::try_from_secs_f64(secs.max(0.0))
            .map_or(max_delay, |wait| wait.min(max_delay))
    }

    /// Allocate one unit of `resource_type` for `component`
    ///
    /// Retries up to the strategy's `retry_attempts` with its backoff before
    /// returning [`EngineError::AllocationDenied`] carrying the last computed
    /// wait time. Never blocks beyond the retry budget.
    pub async fn request_allocation(
        &self,
        resource_type: ResourceType,
        component: &str,
        priority: AllocationPriority,
    ) -> Result<AllocationHandle> {
        let strategy = self.strategy(resource_type)?;
        let (backoff, retry_attempts) = (strategy.backoff, strategy.retry_attempts);

        let mut attempt = 0;
        let mut wait_time = Duration::ZERO;
        loop {
            let limit = self.effective_limit(resource_type).unwrap_or(0);
            if let Some(allocation) = self.try_allocate(resource_type, component, priority, limit)
            {
                debug!(
                    resource_type = %resource_type,
                    component = component,
                    allocation_id = %allocation.id,
                    attempt = attempt,
                    "Allocation granted"
                );
                return Ok(AllocationHandle {
                    table: self.table.clone(),
                    allocation,
                    released: false,
                });
            }

            wait_time = self.compute_wait(resource_type, priority);
            if attempt >= retry_attempts {
                break;
            }
            let delay = backoff.delay(attempt, wait_time, self.config.max_delay());
            debug!(
                resource_type = %resource_type,
                component = component,
                attempt = attempt,
                "Resource at capacity, retrying in {:?}",
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }

        if let Some(mut pool) = self.table.pools.get_mut(&resource_type) {
            pool.counters.denied += 1;
        }
        warn!(
            resource_type = %resource_type,
            component = component,
            "Allocation denied after {} retries, suggested wait {:?}",
            retry_attempts,
            wait_time
        );
        Err(EngineError::allocation_denied(resource_type, wait_time))
    }

    /// Release by id; false when no such allocation is live
    pub fn release_allocation(&self, resource_type: ResourceType, id: &str) -> bool {
        let released = self.table.release(resource_type, id);
        if released {
            debug!(resource_type = %resource_type, allocation_id = id, "Allocation released");
        }
        released
    }

    /// Record an API call made outside an allocation
    pub fn record_api_call(&self) {
        self.api_window.lock().record(Instant::now());
    }

    /// API calls in the trailing minute
    pub fn api_calls_last_minute(&self) -> usize {
        self.api_window.lock().count(Instant::now())
    }

    /// Remove allocations of `resource_type` held longer than the stale age
    pub fn reclaim_stale(&self, resource_type: ResourceType) -> Vec<ResourceAllocation> {
        let max_age = self.config.stale_allocation_age();
        let Some(mut pool) = self.table.pools.get_mut(&resource_type) else {
            return Vec::new();
        };
        let stale: Vec<String> = pool
            .allocations
            .values()
            .filter(|a| a.held_for() >= max_age)
            .map(|a| a.id.clone())
            .collect();

        let mut reclaimed = Vec::with_capacity(stale.len());
        for id in stale {
            if let Some(mut allocation) = pool.allocations.remove(&id) {
                allocation.released = true;
                reclaimed.push(allocation);
            }
        }
        pool.counters.reclaimed += reclaimed.len() as u64;
        reclaimed
    }

    /// Unresolved conflicts
    pub fn active_conflicts(&self) -> Vec<Conflict> {
        self.conflicts.active()
    }

    pub fn conflict_log(&self) -> &ConflictLog {
        &self.conflicts
    }

    /// Read-only snapshot for dashboards
    pub fn get_resource_stats(&self) -> ResourceStats {
        let resources = ResourceType::ALL
            .iter()
            .filter_map(|&resource_type| {
                let max_concurrent = self.effective_limit(resource_type)?;
                let (active, counters) = self
                    .table
                    .pools
                    .get(&resource_type)
                    .map(|pool| (pool.allocations.len(), pool.counters))
                    .unwrap_or_default();
                Some(ResourceTypeStats {
                    resource_type,
                    active,
                    max_concurrent,
                    utilization: if max_concurrent == 0 {
                        0.0
                    } else {
                        active as f64 / max_concurrent as f64
                    },
                    counters,
                })
            })
            .collect();

        let (active_conflicts, resolved_conflicts) = self.conflicts.counts();
        let usage = self.telemetry.usage();
        ResourceStats {
            resources,
            api_calls_last_minute: self.api_calls_last_minute(),
            api_throttled: self.is_api_throttled(),
            active_conflicts,
            resolved_conflicts,
            memory_percent: usage.memory_percent,
            cpu_percent: usage.cpu_percent,
            network_percent: usage.network_percent,
        }
    }
}
