//! Coordination loop: alerts, shared-cache expiry and queue dispatch

use super::coordinator::Coordinator;
use super::types::{Alert, AlertKind, CoordinationAnalytics};
use crate::utils::sys::BackgroundTasks;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Alerts kept for analytics
const MAX_ALERTS: usize = 100;

/// Conflicts included in analytics
const RECENT_CONFLICTS: usize = 20;

impl<V> Coordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Raise alerts for systems over the error-rate or response-time thresholds
    pub fn check_alerts(&self) -> Vec<Alert> {
        let mut raised = Vec::new();
        for snapshot in self.snapshots() {
            let health = &snapshot.health;
            if health.completed_ops == 0 {
                continue;
            }
            let checks = [
                (
                    AlertKind::ErrorRate,
                    health.error_rate,
                    self.config.alert_error_rate,
                ),
                (
                    AlertKind::ResponseTime,
                    health.avg_response_time_ms,
                    self.config.alert_response_time_ms,
                ),
            ];
            for (kind, value, threshold) in checks {
                if value > threshold {
                    warn!(
                        system_id = %snapshot.system.id,
                        kind = ?kind,
                        value = value,
                        threshold = threshold,
                        "System health alert"
                    );
                    raised.push(Alert {
                        system_id: snapshot.system.id.clone(),
                        kind,
                        value,
                        threshold,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
        }

        if !raised.is_empty() {
            let mut alerts = self.alerts.lock();
            alerts.extend(raised.iter().cloned());
            while alerts.len() > MAX_ALERTS {
                alerts.pop_front();
            }
        }
        raised
    }

    /// Latest alerts, oldest first
    pub fn recent_alerts(&self) -> Vec<Alert> {
        self.alerts.lock().iter().cloned().collect()
    }

    /// Expire stale shared-cache entries and purge old conflicts
    pub fn expire_shared_cache(&self) -> usize {
        let expired = self.cache.expire_sweep();
        let purged = self.conflicts.purge_expired();
        debug!(expired = expired, purged_conflicts = purged, "Coordinator cache expiry");
        expired
    }

    /// Read-only view for dashboards
    pub fn get_coordination_analytics(&self) -> CoordinationAnalytics {
        let systems = self.snapshots();
        CoordinationAnalytics {
            total_systems: systems.len(),
            total_active_ops: systems.iter().map(|s| s.health.active_ops).sum(),
            total_queued_ops: systems.iter().map(|s| s.health.queued_ops).sum(),
            systems,
            conflicts_by_kind: self.conflicts.counts_by_kind(),
            recent_conflicts: self.conflicts.recent(RECENT_CONFLICTS),
            recent_alerts: self.recent_alerts(),
            cache: self.cache.get_stats(),
        }
    }

    /// Spawn the alert, cache-expiry and dispatch loops
    pub fn start(self: &Arc<Self>) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let coordinator = Arc::clone(self);
        tasks.spawn_periodic(
            "coordinator_alerts",
            Duration::from_secs(self.config.alert_interval_secs),
            move || {
                let coordinator = coordinator.clone();
                async move {
                    coordinator.check_alerts();
                }
            },
        );

        let coordinator = Arc::clone(self);
        tasks.spawn_periodic(
            "coordinator_cache_expiry",
            Duration::from_secs(self.config.cache_expiry_interval_secs),
            move || {
                let coordinator = coordinator.clone();
                async move {
                    coordinator.expire_shared_cache();
                }
            },
        );

        let coordinator = Arc::clone(self);
        tasks.spawn_periodic(
            "coordinator_dispatch",
            Duration::from_secs(self.config.dispatch_interval_secs),
            move || {
                let coordinator = coordinator.clone();
                async move {
                    let dispatched = coordinator.dispatch_pending();
                    if dispatched > 0 {
                        debug!(dispatched = dispatched, "Dispatched pending requests");
                    }
                }
            },
        );

        info!("Coordination loop started");
        tasks
    }
}
