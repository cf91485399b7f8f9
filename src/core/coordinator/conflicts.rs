//! Per-request conflict detection and inline remediation
//!
//! Every remediation is best effort: failures are logged and the caller's
//! operation proceeds regardless.

use super::coordinator::Coordinator;
use super::types::RegisteredSystem;
use crate::core::resource_resolver::{
    Conflict, ConflictKind, ConflictSeverity, RemediationAction,
};
use crate::utils::error::{EngineError, Result};
use crate::utils::sys::ResultExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

impl<V> Coordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Detect and remediate conflicts relevant to `system`; returns how many were found
    pub(super) async fn resolve_conflicts_for(&self, system: &RegisteredSystem) -> usize {
        let conflicts = self.detect_conflicts_for(system);
        let detected = conflicts.len();
        for conflict in conflicts {
            warn!(
                system_id = %system.id,
                kind = ?conflict.kind,
                severity = ?conflict.severity,
                "{}",
                conflict.description
            );
            let resolved = self
                .remediate(system, &conflict)
                .await
                .log_and_continue("coordinator remediation")
                .is_some();
            let id = self.conflicts.record(conflict);
            if resolved {
                self.conflicts.mark_resolved(&id);
            }
        }
        detected
    }

    /// Run the four checks for `system` without remediating
    pub fn detect_conflicts_for(&self, system: &RegisteredSystem) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        let total_active = self.total_active_ops();
        if total_active > self.config.global_active_ops_threshold {
            conflicts.push(
                Conflict::new(
                    ConflictKind::Resource,
                    ConflictSeverity::from_ratio(
                        total_active as f64 / self.config.global_active_ops_threshold.max(1) as f64,
                    ),
                    RemediationAction::DeferLowPriority,
                    format!(
                        "{} active operations across systems (threshold {})",
                        total_active, self.config.global_active_ops_threshold
                    ),
                )
                .with_affected([system.id.clone()]),
            );
        }

        for dependency in &system.depends_on {
            let Some(health) = self.get_system_health(dependency) else {
                debug!(system_id = %system.id, dependency = %dependency, "Dependency not registered");
                continue;
            };
            if health.error_rate > self.config.dependency_error_threshold {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::Dependency,
                        ConflictSeverity::High,
                        RemediationAction::WaitForDependency,
                        format!(
                            "Dependency {} error rate {:.1}%",
                            dependency,
                            health.error_rate * 100.0
                        ),
                    )
                    .with_affected([system.id.clone(), dependency.clone()]),
                );
            }
        }

        let cached = self.cache.len();
        if cached > self.config.cache_entry_threshold {
            conflicts.push(Conflict::new(
                ConflictKind::Cache,
                ConflictSeverity::Medium,
                RemediationAction::OptimizeCache,
                format!(
                    "Shared cache holds {} entries (threshold {})",
                    cached, self.config.cache_entry_threshold
                ),
            ));
        }

        if let Some(health) = self.get_system_health(&system.id) {
            if health.completed_ops > 0
                && health.avg_response_time_ms > self.config.timing_threshold_ms
            {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::Timing,
                        ConflictSeverity::Low,
                        RemediationAction::QueryOptimizationHint,
                        format!(
                            "Average response time {:.0}ms exceeds {:.0}ms",
                            health.avg_response_time_ms, self.config.timing_threshold_ms
                        ),
                    )
                    .with_affected([system.id.clone()]),
                );
            }
        }

        conflicts
    }

    async fn remediate(&self, system: &RegisteredSystem, conflict: &Conflict) -> Result<()> {
        match conflict.remediation {
            RemediationAction::DeferLowPriority => {
                self.defer_if_outranked(system).await;
                Ok(())
            }
            RemediationAction::WaitForDependency => {
                for dependency in conflict.affected_systems.iter().skip(1) {
                    self.wait_for_dependency(dependency).await?;
                }
                Ok(())
            }
            RemediationAction::OptimizeCache => {
                let expired = self.cache.expire_sweep();
                let reclaimed = self.cache.low_value_sweep();
                info!(expired = expired, reclaimed = reclaimed, "Shared cache optimized");
                Ok(())
            }
            RemediationAction::QueryOptimizationHint => {
                info!(
                    system_id = %system.id,
                    "Slow responses: consider narrowing queries or raising refresh_interval"
                );
                Ok(())
            }
            other => Err(EngineError::remediation(format!(
                "{:?} is not handled by the coordinator",
                other
            ))),
        }
    }

    /// Yield one poll interval when a higher-priority system is busy
    async fn defer_if_outranked(&self, system: &RegisteredSystem) {
        let outranked = self
            .snapshots()
            .iter()
            .any(|s| s.health.active_ops > 0 && s.system.priority > system.priority);
        if outranked {
            debug!(system_id = %system.id, "Deferring for higher-priority systems");
            tokio::time::sleep(self.config.dependency_poll_interval()).await;
        }
    }

    /// Poll a dependency's health until it recovers or the wait budget runs out
    async fn wait_for_dependency(&self, dependency: &str) -> Result<()> {
        let deadline = Instant::now() + self.config.dependency_max_wait();
        loop {
            let error_rate = self
                .get_system_health(dependency)
                .map(|h| h.error_rate)
                .unwrap_or(0.0);
            if error_rate <= self.config.dependency_error_threshold {
                debug!(dependency = dependency, "Dependency recovered");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(EngineError::DependencyDegraded {
                    system_id: dependency.to_string(),
                    error_rate,
                });
            }
            tokio::time::sleep(self.config.dependency_poll_interval()).await;
        }
    }
}
