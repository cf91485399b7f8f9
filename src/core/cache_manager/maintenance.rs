//! Periodic cache maintenance
//!
//! Three independent sweeps, each on its own interval: expiry, low-value
//! reclamation and rebalancing of hot entries into the fastest layer.

use super::manager::LayeredCache;
use crate::core::resource_resolver::telemetry::CachePressure;
use crate::utils::sys::BackgroundTasks;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

impl<V> LayeredCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Remove expired entries and prune dependency edges that lead to no cached key
    pub fn expire_sweep(&self) -> usize {
        let now = Instant::now();
        let removed: usize = self
            .layers
            .iter()
            .map(|layer| layer.remove_where(|e| e.is_expired_at(now)).len())
            .sum();

        let pruned = self.prune_dependency_edges();
        if pruned > 0 {
            debug!(pruned = pruned, "Pruned dead dependency edges");
        }
        if removed > 0 {
            info!(removed = removed, "Expired cache entries swept");
        }
        removed
    }

    /// Drop edges whose dependent is uncached and has no cached key downstream
    ///
    /// An uncached key stays in the graph while a cascade through it can
    /// still reach a cached entry. Returns how many edges were dropped.
    fn prune_dependency_edges(&self) -> usize {
        let _exclusive = self.gate.write();

        let mut reachable: HashSet<String> = self.layers.iter().flat_map(|l| l.keys()).collect();
        loop {
            let upstream: Vec<String> = self
                .dependents
                .iter()
                .filter(|edges| {
                    !reachable.contains(edges.key())
                        && edges.value().iter().any(|k| reachable.contains(k))
                })
                .map(|edges| edges.key().clone())
                .collect();
            if upstream.is_empty() {
                break;
            }
            reachable.extend(upstream);
        }

        let mut pruned = 0;
        self.dependents.retain(|_, dependents| {
            let before = dependents.len();
            dependents.retain(|key| reachable.contains(key));
            pruned += before - dependents.len();
            !dependents.is_empty()
        });
        pruned
    }

    /// Remove entries read at most once and idle past the low-value threshold
    pub fn low_value_sweep(&self) -> usize {
        let now = Instant::now();
        let idle = self.config.low_value_idle();
        let removed: usize = self
            .layers
            .iter()
            .map(|layer| {
                layer
                    .remove_where(|e| e.access_count <= 1 && e.idle(now) > idle)
                    .len()
            })
            .sum();
        if removed > 0 {
            info!(removed = removed, "Low-value cache entries reclaimed");
        }
        removed
    }

    /// Copy frequently read entries from slower layers into the fastest enabled one
    pub fn rebalance_sweep(&self) -> usize {
        let now = Instant::now();
        let Some(fastest) = self.layers.iter().position(|l| l.is_enabled()) else {
            return 0;
        };
        let target = &self.layers[fastest];
        let threshold = self.config.rebalance_access_threshold;

        let _gate = self.gate.read();
        let mut promoted = 0;
        for layer in self.layers.iter().skip(fastest + 1) {
            for entry in layer.hot_entries(threshold, now) {
                if layer.contains(&entry.key, now) && !target.contains(&entry.key, now) {
                    debug!(from = layer.name(), to = target.name(), key = %entry.key, "Rebalancing hot entry");
                    target.insert(entry);
                    promoted += 1;
                }
            }
        }
        if promoted > 0 {
            info!(promoted = promoted, layer = target.name(), "Cache rebalanced");
        }
        promoted
    }

    /// Run each sweep on its configured interval until the returned tasks are shut down
    pub fn start_maintenance(self: &Arc<Self>) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let cache = Arc::clone(self);
        tasks.spawn_periodic(
            "cache_expire",
            Duration::from_secs(self.config.expire_interval_secs),
            move || {
                let cache = cache.clone();
                async move {
                    cache.expire_sweep();
                }
            },
        );

        let cache = Arc::clone(self);
        tasks.spawn_periodic(
            "cache_low_value",
            Duration::from_secs(self.config.low_value_interval_secs),
            move || {
                let cache = cache.clone();
                async move {
                    cache.low_value_sweep();
                }
            },
        );

        let cache = Arc::clone(self);
        tasks.spawn_periodic(
            "cache_rebalance",
            Duration::from_secs(self.config.rebalance_interval_secs),
            move || {
                let cache = cache.clone();
                async move {
                    cache.rebalance_sweep();
                }
            },
        );

        info!("Cache maintenance started");
        tasks
    }
}

impl<V> CachePressure for LayeredCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn usage_bytes(&self) -> u64 {
        self.layers
            .iter()
            .filter(|l| l.is_enabled())
            .map(|l| l.bytes())
            .sum()
    }

    fn capacity_bytes(&self) -> u64 {
        self.config.total_max_bytes()
    }

    fn relieve_pressure(&self) -> usize {
        let ratio = self.config.pressure_relief_ratio;
        let evicted: usize = self
            .layers
            .iter()
            .map(|layer| layer.evict_to((layer.max_bytes() as f64 * ratio) as u64))
            .sum();
        info!(evicted = evicted, "Cache pressure relieved");
        evicted
    }

    fn cleanup(&self) -> usize {
        self.expire_sweep() + self.low_value_sweep()
    }
}
