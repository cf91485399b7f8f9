//! A single cache tier

use super::types::{AtomicLayerStats, CacheEntry, LayerStats};
use crate::config::models::cache::{CacheLayerConfig, EvictionPolicy};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Result of looking a key up in one layer
#[derive(Debug)]
pub(crate) enum Lookup<V> {
    Hit(CacheEntry<V>),
    Expired,
    Miss,
}

#[derive(Debug)]
struct LayerState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    bytes: u64,
}

impl<V> LayerState<V> {
    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.bytes = self.bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    fn retain<F>(&mut self, mut keep: F) -> Vec<CacheEntry<V>>
    where
        F: FnMut(&CacheEntry<V>) -> bool,
    {
        let keys: Vec<String> = self
            .entries
            .values()
            .filter(|e| !keep(e))
            .map(|e| e.key.clone())
            .collect();
        keys.iter().filter_map(|key| self.remove(key)).collect()
    }

    fn evict_one(&mut self, policy: EvictionPolicy) -> Option<CacheEntry<V>> {
        let victim = select_victim(self.entries.values(), policy)?;
        self.remove(&victim)
    }
}

/// Key of the entry `policy` would evict first
pub(crate) fn select_victim<'a, V: 'a, I>(entries: I, policy: EvictionPolicy) -> Option<String>
where
    I: Iterator<Item = &'a CacheEntry<V>>,
{
    let victim = match policy {
        EvictionPolicy::Lru => entries.min_by_key(|e| e.last_accessed),
        EvictionPolicy::Lfu => entries.min_by_key(|e| (e.access_count, e.last_accessed)),
        EvictionPolicy::Ttl => entries.min_by_key(|e| e.expires_at()),
        EvictionPolicy::Priority => entries.min_by_key(|e| (e.priority, e.last_accessed)),
    };
    victim.map(|e| e.key.clone())
}

/// One named tier with its own capacity and eviction policy
#[derive(Debug)]
pub struct CacheLayer<V> {
    config: CacheLayerConfig,
    enabled: AtomicBool,
    state: Mutex<LayerState<V>>,
    pub(crate) stats: AtomicLayerStats,
}

impl<V: Clone> CacheLayer<V> {
    pub fn new(config: CacheLayerConfig) -> Self {
        Self {
            enabled: AtomicBool::new(config.enabled),
            config,
            state: Mutex::new(LayerState {
                entries: HashMap::new(),
                bytes: 0,
            }),
            stats: AtomicLayerStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.config.eviction_policy
    }

    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl()
    }

    pub fn max_bytes(&self) -> u64 {
        self.config.max_bytes
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(&self) -> u64 {
        self.state.lock().bytes
    }

    /// Look `key` up, updating access stats on a hit and dropping it when expired
    pub(crate) fn lookup(&self, key: &str, now: Instant) -> Lookup<V> {
        let mut state = self.state.lock();
        match state.entries.get_mut(key) {
            None => return Lookup::Miss,
            Some(entry) if !entry.is_expired_at(now) => {
                entry.mark_accessed(now);
                return Lookup::Hit(entry.clone());
            }
            Some(_) => {}
        }
        state.remove(key);
        Lookup::Expired
    }

    /// Whether a live entry for `key` is present
    pub fn contains(&self, key: &str, now: Instant) -> bool {
        self.state
            .lock()
            .entries
            .get(key)
            .is_some_and(|e| !e.is_expired_at(now))
    }

    /// Insert `entry`, evicting exactly one victim first when full; returns evicted count
    pub(crate) fn insert(&self, entry: CacheEntry<V>) -> usize {
        let mut state = self.state.lock();
        let mut evicted = 0;

        // Overwrites never evict; the newest write wins
        if state.remove(&entry.key).is_none() {
            let at_entries = state.entries.len() >= self.config.max_entries;
            let over_bytes = state.bytes + entry.size_bytes > self.config.max_bytes;
            if (at_entries || over_bytes) && state.evict_one(self.config.eviction_policy).is_some()
            {
                evicted = 1;
            }
        }

        state.bytes += entry.size_bytes;
        state.entries.insert(entry.key.clone(), entry);
        drop(state);

        self.stats.record_evictions(evicted as u64);
        evicted
    }

    pub(crate) fn remove(&self, key: &str) -> Option<CacheEntry<V>> {
        self.state.lock().remove(key)
    }

    /// Remove every entry for which `remove` returns true; returns the removed entries
    pub(crate) fn remove_where<F>(&self, mut remove: F) -> Vec<CacheEntry<V>>
    where
        F: FnMut(&CacheEntry<V>) -> bool,
    {
        self.state.lock().retain(|e| !remove(e))
    }

    /// Evict by policy until usage is within `target_bytes` and under `max_entries`
    pub(crate) fn evict_to(&self, target_bytes: u64) -> usize {
        let mut state = self.state.lock();
        let mut evicted = 0;
        while (state.bytes > target_bytes || state.entries.len() > self.config.max_entries)
            && state.evict_one(self.config.eviction_policy).is_some()
        {
            evicted += 1;
        }
        drop(state);
        self.stats.record_evictions(evicted as u64);
        evicted
    }

    /// Clones of entries accessed more than `threshold` times
    pub(crate) fn hot_entries(&self, threshold: u64, now: Instant) -> Vec<CacheEntry<V>> {
        self.state
            .lock()
            .entries
            .values()
            .filter(|e| e.access_count > threshold && !e.is_expired_at(now))
            .cloned()
            .collect()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.state.lock().entries.keys().cloned().collect()
    }

    pub(crate) fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.entries.len();
        state.entries.clear();
        state.bytes = 0;
        count
    }

    pub fn stats(&self) -> LayerStats {
        let (entry_count, memory_usage) = {
            let state = self.state.lock();
            (state.entries.len(), state.bytes)
        };
        let hits = self.stats.hits.load(Ordering::Relaxed);
        let misses = self.stats.misses.load(Ordering::Relaxed);
        let total_requests = hits + misses;
        LayerStats {
            name: self.config.name.clone(),
            eviction_policy: self.config.eviction_policy,
            enabled: self.is_enabled(),
            hits,
            misses,
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            total_requests,
            hit_rate: if total_requests == 0 {
                0.0
            } else {
                hits as f64 / total_requests as f64
            },
            avg_response_time_us: self.stats.avg_response_us(),
            memory_usage,
            entry_count,
            max_entries: self.config.max_entries,
            max_bytes: self.config.max_bytes,
        }
    }
}
