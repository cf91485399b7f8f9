//! Conflict heuristics, remediation and the monitoring loop

use super::conflict::{Conflict, ConflictKind, ConflictSeverity, RemediationAction};
use super::resolver::ConflictResolver;
use super::telemetry::LeakRisk;
use super::types::ResourceType;
use crate::utils::error::{EngineError, Result};
use crate::utils::sys::BackgroundTasks;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Outcome of one detection cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectionReport {
    pub detected: usize,
    pub resolved: usize,
    pub purged: usize,
}

impl ConflictResolver {
    /// Run every type-specific heuristic once
    pub fn detect_conflicts(&self) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        conflicts.extend(self.detect_database_conflict());
        conflicts.extend(self.detect_memory_conflict());
        conflicts.extend(self.detect_cache_conflict());
        conflicts.extend(self.detect_api_conflict());
        conflicts
    }

    fn detect_database_conflict(&self) -> Option<Conflict> {
        let rt = ResourceType::DatabaseConnection;
        let pool_size = self.config.strategies.get(&rt)?.max_concurrent;
        if pool_size == 0 {
            return None;
        }
        let allocations = self.allocations(rt);
        let ratio = allocations.len() as f64 / pool_size as f64;
        if ratio <= self.config.database_threshold {
            return None;
        }
        let components: BTreeSet<String> =
            allocations.into_iter().map(|a| a.component).collect();
        Some(
            Conflict::new(
                ConflictKind::Resource,
                ConflictSeverity::from_ratio(ratio),
                RemediationAction::OptimizeConnectionPool,
                format!(
                    "Database connections at {:.0}% of a {}-connection pool",
                    ratio * 100.0,
                    pool_size
                ),
            )
            .with_resource(rt)
            .with_affected(components),
        )
    }

    fn detect_memory_conflict(&self) -> Option<Conflict> {
        if self.telemetry.leak_risk() != LeakRisk::High {
            return None;
        }
        let usage = self.telemetry.usage();
        let components: BTreeSet<String> = self
            .allocations(ResourceType::Memory)
            .into_iter()
            .map(|a| a.component)
            .collect();
        Some(
            Conflict::new(
                ConflictKind::Resource,
                ConflictSeverity::High,
                RemediationAction::ForcedCleanup,
                format!(
                    "High memory leak risk reported at {:.1}% memory usage",
                    usage.memory_percent
                ),
            )
            .with_resource(ResourceType::Memory)
            .with_affected(components),
        )
    }

    fn detect_cache_conflict(&self) -> Option<Conflict> {
        let cache = self.cache.read().clone()?;
        let capacity = cache.capacity_bytes();
        if capacity == 0 {
            return None;
        }
        let usage = cache.usage_bytes();
        let ratio = usage as f64 / capacity as f64;
        if ratio <= self.config.cache_bytes_threshold {
            return None;
        }
        Some(
            Conflict::new(
                ConflictKind::Cache,
                ConflictSeverity::from_ratio(ratio),
                RemediationAction::CacheEviction,
                format!("Cache holds {} of {} bytes", usage, capacity),
            )
            .with_resource(ResourceType::Cache),
        )
    }

    fn detect_api_conflict(&self) -> Option<Conflict> {
        let calls = self.api_calls_last_minute();
        let ceiling = self.config.api_calls_per_minute;
        if calls <= ceiling {
            return None;
        }
        let components: BTreeSet<String> = self
            .allocations(ResourceType::ApiCall)
            .into_iter()
            .map(|a| a.component)
            .collect();
        Some(
            Conflict::new(
                ConflictKind::Resource,
                ConflictSeverity::from_ratio(calls as f64 / ceiling.max(1) as f64),
                RemediationAction::ThrottleRequests,
                format!("{} API calls in the last minute (ceiling {})", calls, ceiling),
            )
            .with_resource(ResourceType::ApiCall)
            .with_affected(components),
        )
    }

    /// Apply the remediation attached to `conflict`
    pub fn remediate(&self, conflict: &Conflict) -> Result<()> {
        match conflict.remediation {
            RemediationAction::OptimizeConnectionPool => {
                let reclaimed = self.reclaim_stale(ResourceType::DatabaseConnection);
                info!(
                    conflict_id = %conflict.id,
                    reclaimed = reclaimed.len(),
                    "Optimized database connection pool"
                );
                Ok(())
            }
            RemediationAction::ForcedCleanup => {
                let reclaimed = self.reclaim_stale(ResourceType::Memory);
                let removed = self
                    .cache
                    .read()
                    .clone()
                    .map(|cache| cache.cleanup())
                    .unwrap_or(0);
                info!(
                    conflict_id = %conflict.id,
                    reclaimed = reclaimed.len(),
                    cache_entries_removed = removed,
                    "Forced memory cleanup"
                );
                Ok(())
            }
            RemediationAction::CacheEviction => {
                let cache = self.cache.read().clone().ok_or_else(|| {
                    EngineError::remediation("No cache attached for eviction pass")
                })?;
                let evicted = cache.relieve_pressure();
                info!(conflict_id = %conflict.id, evicted = evicted, "Cache eviction pass");
                Ok(())
            }
            RemediationAction::ThrottleRequests => {
                let until = Instant::now() + self.config.api_throttle();
                *self.throttled_until.lock() = Some(until);
                warn!(
                    conflict_id = %conflict.id,
                    limit = ?self.effective_limit(ResourceType::ApiCall),
                    "Throttling API calls for {:?}",
                    self.config.api_throttle()
                );
                Ok(())
            }
            other => Err(EngineError::remediation(format!(
                "{:?} is not handled by the resolver",
                other
            ))),
        }
    }

    /// Record and remediate `conflicts`; returns how many were resolved
    pub fn resolve_conflicts(&self, conflicts: Vec<Conflict>) -> usize {
        let mut resolved = 0;
        for conflict in conflicts {
            warn!(
                conflict_id = %conflict.id,
                kind = ?conflict.kind,
                severity = ?conflict.severity,
                "{}",
                conflict.description
            );
            let remediated = match self.remediate(&conflict) {
                Ok(()) => true,
                Err(e) => {
                    error!(conflict_id = %conflict.id, "Conflict remediation failed: {}", e);
                    false
                }
            };
            let id = self.conflicts.record(conflict);
            if remediated && self.conflicts.mark_resolved(&id) {
                resolved += 1;
            }
        }
        resolved
    }

    /// Purge old conflicts, then detect and remediate new ones
    pub fn run_detection_cycle(&self) -> DetectionReport {
        let purged = self.conflicts.purge_expired();
        let conflicts = self.detect_conflicts();
        let detected = conflicts.len();
        let resolved = self.resolve_conflicts(conflicts);
        if detected > 0 || purged > 0 {
            debug!(detected, resolved, purged, "Conflict detection cycle finished");
        }
        DetectionReport {
            detected,
            resolved,
            purged,
        }
    }

    /// Spawn the periodic detection loop
    pub fn start_monitoring(self: &Arc<Self>) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();
        let period = Duration::from_secs(self.config.monitor_interval_secs.max(1));
        let resolver = Arc::clone(self);
        tasks.spawn_periodic("conflict_monitor", period, move || {
            let resolver = resolver.clone();
            async move {
                resolver.run_detection_cycle();
            }
        });
        info!("Conflict monitoring started every {:?}", period);
        tasks
    }
}
