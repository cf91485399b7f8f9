//! Layered cache type definitions
//!
//! Entries, per-call options, invalidation targets and statistics snapshots.

use crate::config::models::cache::{EvictionPolicy, InvalidationRuleConfig};
use crate::utils::error::Result;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Lowest and highest entry priority
pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;

/// Cache entry with metadata
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    /// The cached value
    pub value: V,
    /// When the entry was created
    pub created_at: Instant,
    pub ttl: Duration,
    /// Reads served since the entry was written
    pub access_count: u64,
    /// Last access time
    pub last_accessed: Instant,
    pub tags: HashSet<String>,
    /// Size in bytes (estimated)
    pub size_bytes: u64,
    /// 1 (evicted first) to 10
    pub priority: u8,
}

impl<V> CacheEntry<V> {
    /// Create a new cache entry
    pub fn new(key: String, value: V, ttl: Duration, size_bytes: u64) -> Self {
        let now = Instant::now();
        Self {
            key,
            value,
            created_at: now,
            ttl,
            access_count: 0,
            last_accessed: now,
            tags: HashSet::new(),
            size_bytes,
            priority: 5,
        }
    }

    pub fn with_tags<I: IntoIterator<Item = String>>(mut self, tags: I) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(MIN_PRIORITY, MAX_PRIORITY);
        self
    }

    pub fn expires_at(&self) -> Instant {
        self.created_at + self.ttl
    }

    /// Check if the entry is expired at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) >= self.ttl
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Mark the entry as accessed
    pub fn mark_accessed(&mut self, now: Instant) {
        self.access_count += 1;
        self.last_accessed = now;
    }

    /// Time since the last access
    pub fn idle(&self, now: Instant) -> Duration {
        now.duration_since(self.last_accessed)
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.tags.contains(t))
    }
}

/// Options for [`LayeredCache::get`](super::LayeredCache::get) and its fallback form
#[derive(Debug, Clone)]
pub struct GetOptions {
    /// Layers to scan, fastest first; empty scans every layer in configured order
    pub layers: Vec<String>,
    /// Tags attached to a fallback result when it is cached
    pub tags: Vec<String>,
    /// TTL for a cached fallback result; each layer's default when unset
    pub ttl: Option<Duration>,
    /// Store the fallback result
    pub cache_result: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            tags: Vec::new(),
            ttl: None,
            cache_result: true,
        }
    }
}

impl GetOptions {
    pub fn layers<I, S>(layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            layers: layers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn without_caching(mut self) -> Self {
        self.cache_result = false;
        self
    }
}

/// Options for [`LayeredCache::set`](super::LayeredCache::set)
#[derive(Debug, Clone)]
pub struct SetOptions {
    /// Each layer's default when unset
    pub ttl: Option<Duration>,
    /// Target layers; empty writes every enabled layer
    pub layers: Vec<String>,
    pub tags: Vec<String>,
    pub priority: u8,
    /// Keys this entry depends on; invalidating one of them cascades here
    pub dependencies: Vec<String>,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            layers: Vec::new(),
            tags: Vec::new(),
            priority: 5,
            dependencies: Vec::new(),
        }
    }
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers = layers.into_iter().map(Into::into).collect();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn depends_on<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = keys.into_iter().map(Into::into).collect();
        self
    }
}

/// Key pattern used by invalidation
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Key contains the literal
    Contains(String),
    Regex(Regex),
}

impl KeyPattern {
    pub fn contains(literal: impl Into<String>) -> Self {
        KeyPattern::Contains(literal.into())
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        Ok(KeyPattern::Regex(Regex::new(pattern)?))
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Contains(literal) => key.contains(literal.as_str()),
            KeyPattern::Regex(regex) => regex.is_match(key),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            KeyPattern::Contains(literal) => literal,
            KeyPattern::Regex(regex) => regex.as_str(),
        }
    }
}

/// What to invalidate
#[derive(Debug, Clone, Default)]
pub struct Invalidation {
    pub patterns: Vec<KeyPattern>,
    pub tags: Vec<String>,
    /// Also remove every transitive dependent of a removed key
    pub cascade: bool,
    /// Layers to sweep; empty sweeps every layer
    pub layers: Vec<String>,
}

impl Invalidation {
    pub fn pattern(pattern: KeyPattern) -> Self {
        Self {
            patterns: vec![pattern],
            ..Self::default()
        }
    }

    pub fn key_contains(literal: impl Into<String>) -> Self {
        Self::pattern(KeyPattern::contains(literal))
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tags: vec![tag.into()],
            ..Self::default()
        }
    }

    pub fn with_pattern(mut self, pattern: KeyPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }

    pub fn in_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers = layers.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn matches<V>(&self, entry: &CacheEntry<V>) -> bool {
        self.patterns.iter().any(|p| p.matches(&entry.key)) || entry.has_any_tag(&self.tags)
    }
}

/// Event-driven invalidation
#[derive(Debug, Clone)]
pub struct InvalidationRule {
    pub pattern: KeyPattern,
    pub events: Vec<String>,
    pub cascade: bool,
    pub delay: Duration,
}

impl InvalidationRule {
    pub fn new<I, S>(pattern: KeyPattern, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pattern,
            events: events.into_iter().map(Into::into).collect(),
            cascade: false,
            delay: Duration::ZERO,
        }
    }

    pub fn with_cascade(mut self) -> Self {
        self.cascade = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn triggered_by(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }

    pub(crate) fn invalidation(&self) -> Invalidation {
        Invalidation {
            patterns: vec![self.pattern.clone()],
            tags: Vec::new(),
            cascade: self.cascade,
            layers: Vec::new(),
        }
    }
}

impl TryFrom<&InvalidationRuleConfig> for InvalidationRule {
    type Error = crate::utils::error::EngineError;

    fn try_from(config: &InvalidationRuleConfig) -> Result<Self> {
        let pattern = if config.regex {
            KeyPattern::regex(&config.pattern)?
        } else {
            KeyPattern::contains(config.pattern.clone())
        };
        Ok(Self {
            pattern,
            events: config.events.clone(),
            cascade: config.cascade,
            delay: Duration::from_millis(config.delay_ms),
        })
    }
}

/// Item for [`LayeredCache::warm_up`](super::LayeredCache::warm_up)
#[derive(Debug, Clone)]
pub struct WarmupItem {
    pub key: String,
    pub options: SetOptions,
}

impl WarmupItem {
    pub fn new(key: impl Into<String>, options: SetOptions) -> Self {
        Self {
            key: key.into(),
            options,
        }
    }
}

/// Outcome of a warm-up pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarmupReport {
    pub loaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Atomic layer statistics for lock-free hot path updates
#[derive(Debug, Default)]
pub struct AtomicLayerStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    /// EMA of lookup time in microseconds, stored as f64 bits
    avg_response_us: AtomicU64,
}

impl AtomicLayerStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        if count > 0 {
            self.evictions.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Fold a lookup time into the moving average
    pub fn record_response_time(&self, elapsed: Duration, alpha: f64) {
        let sample = elapsed.as_secs_f64() * 1_000_000.0;
        let first = self.hits.load(Ordering::Relaxed) + self.misses.load(Ordering::Relaxed) <= 1;
        let _ = self
            .avg_response_us
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                let current = f64::from_bits(bits);
                let next = if first {
                    sample
                } else {
                    alpha * sample + (1.0 - alpha) * current
                };
                Some(next.to_bits())
            });
    }

    pub fn avg_response_us(&self) -> f64 {
        f64::from_bits(self.avg_response_us.load(Ordering::Relaxed))
    }

    /// Reset all stats to zero
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.avg_response_us.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of one layer
#[derive(Debug, Clone, Serialize)]
pub struct LayerStats {
    pub name: String,
    pub eviction_policy: EvictionPolicy,
    pub enabled: bool,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_requests: u64,
    pub hit_rate: f64,
    pub avg_response_time_us: f64,
    /// Sum of estimated entry sizes
    pub memory_usage: u64,
    pub entry_count: usize,
    pub max_entries: usize,
    pub max_bytes: u64,
}

/// Cache statistics snapshot (returned to callers)
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub layers: Vec<LayerStats>,
    pub total_entries: usize,
    pub total_memory: u64,
    pub hits: u64,
    pub misses: u64,
    pub dependency_edges: usize,
}

impl CacheStats {
    /// Calculate hit rate across layers
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn layer(&self, name: &str) -> Option<&LayerStats> {
        self.layers.iter().find(|l| l.name == name)
    }
}
