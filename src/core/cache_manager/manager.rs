//! Layered cache implementation
//!
//! `LayeredCache` owns the configured tiers and the dependency graph used for
//! cascading invalidation. Reads scan layers in the caller's order and promote
//! frequently read entries into the layers scanned before them.

use super::layer::{CacheLayer, Lookup};
use super::size::{JsonSizeEstimator, SizeEstimator};
use super::types::{
    CacheEntry, CacheStats, GetOptions, Invalidation, InvalidationRule, SetOptions,
    WarmupItem, WarmupReport,
};
use crate::config::models::cache::CacheConfig;
use crate::utils::error::{EngineError, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Multi-tier cache with per-layer eviction policies
pub struct LayeredCache<V> {
    pub(super) layers: Vec<CacheLayer<V>>,
    /// key -> keys that depend on it
    pub(super) dependents: DashMap<String, HashSet<String>>,
    rules: RwLock<Vec<InvalidationRule>>,
    /// Shared by writes, exclusive for cascading invalidation
    pub(super) gate: RwLock<()>,
    estimator: Arc<dyn SizeEstimator<V>>,
    pub(super) config: CacheConfig,
}

impl<V> std::fmt::Debug for LayeredCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredCache")
            .field(
                "layers",
                &self.config.layers.iter().map(|l| &l.name).collect::<Vec<_>>(),
            )
            .field("dependents", &self.dependents.len())
            .finish()
    }
}

impl<V> LayeredCache<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    /// Create a cache that sizes entries by their JSON encoding
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_estimator(config, Arc::new(JsonSizeEstimator))
    }
}

impl<V> LayeredCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache with a custom size estimator
    pub fn with_estimator(config: CacheConfig, estimator: Arc<dyn SizeEstimator<V>>) -> Result<Self> {
        if config.layers.is_empty() {
            return Err(EngineError::config("At least one cache layer is required"));
        }
        let mut seen = HashSet::new();
        for layer in &config.layers {
            if !seen.insert(layer.name.as_str()) {
                return Err(EngineError::config(format!(
                    "Duplicate cache layer name: {}",
                    layer.name
                )));
            }
        }

        let rules = config
            .invalidation_rules
            .iter()
            .map(InvalidationRule::try_from)
            .collect::<Result<Vec<_>>>()?;

        let layers = config.layers.iter().cloned().map(CacheLayer::new).collect();
        info!(
            layers = config.layers.len(),
            rules = rules.len(),
            "Layered cache initialized"
        );

        Ok(Self {
            layers,
            dependents: DashMap::new(),
            rules: RwLock::new(rules),
            gate: RwLock::new(()),
            estimator,
            config,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub(super) fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name() == name)
    }

    /// Layer indices for a read or invalidation; unknown names are skipped
    fn scan_order(&self, names: &[String]) -> Vec<usize> {
        if names.is_empty() {
            return (0..self.layers.len()).collect();
        }
        names
            .iter()
            .filter_map(|name| {
                let index = self.layer_index(name);
                if index.is_none() {
                    warn!(layer = %name, "Ignoring unknown cache layer");
                }
                index
            })
            .collect()
    }

    /// Layer indices for a write; unknown names are an error
    fn write_targets(&self, names: &[String]) -> Result<Vec<usize>> {
        if names.is_empty() {
            return Ok((0..self.layers.len()).collect());
        }
        names
            .iter()
            .map(|name| {
                self.layer_index(name)
                    .ok_or_else(|| EngineError::UnknownLayer(name.clone()))
            })
            .collect()
    }

    /// Look `key` up across layers, fastest first
    ///
    /// Returns `None` on a full miss. Disabled layers are skipped.
    pub fn get(&self, key: &str, options: &GetOptions) -> Option<V> {
        let order = self.scan_order(&options.layers);
        let alpha = self.config.response_time_alpha;

        for (position, &index) in order.iter().enumerate() {
            let layer = &self.layers[index];
            if !layer.is_enabled() {
                continue;
            }

            let started = Instant::now();
            let lookup = layer.lookup(key, started);
            match lookup {
                Lookup::Hit(entry) => {
                    layer.stats.record_hit();
                    layer.stats.record_response_time(started.elapsed(), alpha);
                    debug!(layer = layer.name(), key = key, "Cache hit");

                    if entry.access_count >= self.config.promotion_threshold {
                        self.promote(&entry, index, &order[..position]);
                    }
                    return Some(entry.value);
                }
                Lookup::Expired | Lookup::Miss => {
                    layer.stats.record_miss();
                    layer.stats.record_response_time(started.elapsed(), alpha);
                }
            }
        }

        debug!(key = key, "Cache miss");
        None
    }

    /// Copy `entry` from layer `source` into each of `faster` that does not already hold it
    ///
    /// Nothing is copied once the entry has left its source layer, so a
    /// concurrent invalidation is never undone.
    pub(super) fn promote(&self, entry: &CacheEntry<V>, source: usize, faster: &[usize]) {
        let _gate = self.gate.read();
        let now = Instant::now();
        if !self.layers[source].contains(&entry.key, now) {
            return;
        }
        for &index in faster {
            let layer = &self.layers[index];
            if layer.is_enabled() && !layer.contains(&entry.key, now) {
                layer.insert(entry.clone());
                debug!(layer = layer.name(), key = %entry.key, "Promoted cache entry");
            }
        }
    }

    /// Read-through form of [`get`](Self::get)
    ///
    /// On a miss the fallback runs and its value is stored in the scanned
    /// layers (unless `options.cache_result` is false). A fallback error is
    /// returned as-is and nothing is cached.
    pub async fn get_with<F, Fut>(&self, key: &str, options: &GetOptions, fallback: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(key, options) {
            return Ok(value);
        }

        let value = fallback().await?;
        if options.cache_result {
            let layers = self
                .scan_order(&options.layers)
                .into_iter()
                .map(|i| self.layers[i].name().to_string())
                .collect::<Vec<_>>();
            let mut set_options = SetOptions::new().layers(layers).tags(options.tags.clone());
            set_options.ttl = options.ttl;
            self.set(key, value.clone(), &set_options)?;
        }
        Ok(value)
    }

    /// Store `value` under `key` in the target layers
    ///
    /// A full layer evicts exactly one victim, chosen by its policy, before
    /// the insert. Dependency edges are recorded once regardless of layers.
    pub fn set(&self, key: &str, value: V, options: &SetOptions) -> Result<()> {
        let _gate = self.gate.read();
        let targets = self.write_targets(&options.layers)?;
        let size_bytes = key.len() as u64 + self.estimator.estimate(&value);

        for index in targets {
            let layer = &self.layers[index];
            if !layer.is_enabled() {
                continue;
            }
            let ttl = options.ttl.unwrap_or_else(|| layer.default_ttl());
            let entry = CacheEntry::new(key.to_string(), value.clone(), ttl, size_bytes)
                .with_tags(options.tags.iter().cloned())
                .with_priority(options.priority);
            let evicted = layer.insert(entry);
            if evicted > 0 {
                debug!(layer = layer.name(), key = key, "Evicted entry to make room");
            }
        }

        for dependency in &options.dependencies {
            self.dependents
                .entry(dependency.clone())
                .or_default()
                .insert(key.to_string());
        }
        Ok(())
    }

    /// Remove matching entries; returns how many live entries were removed
    ///
    /// With `cascade`, every transitive dependent of a removed key is removed
    /// from the same layers. Each key is visited once, so cycles terminate.
    /// Expired entries are dropped along the way but not counted.
    pub fn invalidate(&self, invalidation: &Invalidation) -> usize {
        let _exclusive = invalidation.cascade.then(|| self.gate.write());
        let _shared = (!invalidation.cascade).then(|| self.gate.read());

        let now = Instant::now();
        let targets: Vec<usize> = self.scan_order(&invalidation.layers);
        let mut removed = 0;
        let mut visited = HashSet::new();
        let mut pending = VecDeque::new();

        for &index in &targets {
            let entries = self.layers[index].remove_where(|entry| invalidation.matches(entry));
            removed += entries.iter().filter(|e| !e.is_expired_at(now)).count();
            for entry in entries {
                if visited.insert(entry.key.clone()) {
                    pending.push_back(entry.key);
                }
            }
        }

        if invalidation.cascade {
            while let Some(key) = pending.pop_front() {
                let Some((_, dependents)) = self.dependents.remove(&key) else {
                    continue;
                };
                for dependent in dependents {
                    if !visited.insert(dependent.clone()) {
                        continue;
                    }
                    for &index in &targets {
                        if self.layers[index]
                            .remove(&dependent)
                            .is_some_and(|e| !e.is_expired_at(now))
                        {
                            removed += 1;
                        }
                    }
                    pending.push_back(dependent);
                }
            }
        }

        if removed > 0 {
            info!(
                removed = removed,
                cascade = invalidation.cascade,
                "Invalidated cache entries"
            );
        }
        removed
    }

    /// Register an event-driven invalidation rule
    pub fn add_invalidation_rule(&self, rule: InvalidationRule) {
        self.rules.write().push(rule);
    }

    /// Drop rules whose pattern text equals `pattern`; returns how many were removed
    pub fn remove_invalidation_rule(&self, pattern: &str) -> usize {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.pattern.as_str() != pattern);
        before - rules.len()
    }

    pub fn invalidation_rules(&self) -> Vec<InvalidationRule> {
        self.rules.read().clone()
    }

    /// Apply every rule triggered by `event`
    ///
    /// Rules without a delay run now and their removals are returned; delayed
    /// rules run from a spawned task.
    pub fn on_event(self: &Arc<Self>, event: &str) -> usize {
        let triggered: Vec<InvalidationRule> = self
            .rules
            .read()
            .iter()
            .filter(|r| r.triggered_by(event))
            .cloned()
            .collect();

        let mut removed = 0;
        for rule in triggered {
            if rule.delay.is_zero() {
                removed += self.invalidate(&rule.invalidation());
                continue;
            }
            let cache = Arc::clone(self);
            let event = event.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(rule.delay).await;
                let removed = cache.invalidate(&rule.invalidation());
                debug!(event = %event, removed = removed, "Applied delayed invalidation rule");
            });
        }
        removed
    }

    /// Preload `items` through `loader`, concurrently
    ///
    /// Keys already cached in every target layer are skipped; loader
    /// failures are counted and logged.
    pub async fn warm_up<F, Fut>(&self, items: Vec<WarmupItem>, loader: F) -> WarmupReport
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let mut report = WarmupReport::default();
        let now = Instant::now();

        let mut pending = Vec::new();
        for item in items {
            let cached_everywhere = match self.write_targets(&item.options.layers) {
                Ok(targets) => targets
                    .iter()
                    .map(|&i| &self.layers[i])
                    .filter(|l| l.is_enabled())
                    .all(|l| l.contains(&item.key, now)),
                Err(e) => {
                    warn!(key = %item.key, "Skipping warm-up item: {}", e);
                    report.failed += 1;
                    continue;
                }
            };
            if cached_everywhere {
                report.skipped += 1;
            } else {
                pending.push(item);
            }
        }

        let loads = pending.iter().map(|item| loader(item.key.clone()));
        let results = futures::future::join_all(loads).await;

        for (item, result) in pending.iter().zip(results) {
            match result.and_then(|value| self.set(&item.key, value, &item.options)) {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    warn!(key = %item.key, "Cache warm-up failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        info!(
            loaded = report.loaded,
            skipped = report.skipped,
            failed = report.failed,
            "Cache warm-up finished"
        );
        report
    }

    /// Enable or disable a layer; disabled layers are neither read nor written
    pub fn set_layer_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let index = self
            .layer_index(name)
            .ok_or_else(|| EngineError::UnknownLayer(name.to_string()))?;
        self.layers[index].set_enabled(enabled);
        info!(layer = name, enabled = enabled, "Cache layer toggled");
        Ok(())
    }

    /// Whether `layer` holds a live entry for `key`
    pub fn contains(&self, key: &str, layer: &str) -> bool {
        self.layer_index(layer)
            .is_some_and(|i| self.layers[i].contains(key, Instant::now()))
    }

    /// Remove `key` from every layer; returns how many copies were removed
    pub fn remove(&self, key: &str) -> usize {
        let _gate = self.gate.read();
        self.layers
            .iter()
            .filter(|l| l.remove(key).is_some())
            .count()
    }

    /// Remove every entry, dependency edge and statistic
    pub fn clear(&self) {
        let _gate = self.gate.write();
        for layer in &self.layers {
            layer.clear();
            layer.stats.reset();
        }
        self.dependents.clear();
        info!("All cache layers cleared");
    }

    /// Entries across all layers (a key held by two layers counts twice)
    pub fn len(&self) -> usize {
        self.layers.iter().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|l| l.is_empty())
    }

    /// Read-only statistics snapshot
    pub fn get_stats(&self) -> CacheStats {
        let layers: Vec<_> = self.layers.iter().map(|l| l.stats()).collect();
        CacheStats {
            total_entries: layers.iter().map(|l| l.entry_count).sum(),
            total_memory: layers.iter().map(|l| l.memory_usage).sum(),
            hits: layers.iter().map(|l| l.hits).sum(),
            misses: layers.iter().map(|l| l.misses).sum(),
            dependency_edges: self.dependents.iter().map(|e| e.value().len()).sum(),
            layers,
        }
    }
}
