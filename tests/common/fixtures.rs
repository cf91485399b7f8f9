//! Test fixtures and configuration factories
//!
//! All factories create real objects, not mocks.

use std::sync::Arc;
use std::time::Duration;
use tiercoord::config::models::{
    AllocationStrategyConfig, CacheConfig, CacheLayerConfig, CoordinatorConfig, EvictionPolicy,
    ResolverConfig,
};
use tiercoord::core::cache_manager::FixedSizeEstimator;
use tiercoord::utils::error::BackoffStrategy;
use tiercoord::{Coordinator, LayeredCache, ResourceType};

/// Factory for engine configurations
pub struct ConfigFactory;

impl ConfigFactory {
    /// Two LRU layers, `l1` then `l2`, with a ten second default TTL
    pub fn two_layer_cache(l1_entries: usize, l2_entries: usize) -> CacheConfig {
        CacheConfig::with_layers(vec![
            CacheLayerConfig::new("l1", l1_entries, 1024 * 1024)
                .with_default_ttl(Duration::from_secs(10)),
            CacheLayerConfig::new("l2", l2_entries, 1024 * 1024)
                .with_default_ttl(Duration::from_secs(10)),
        ])
    }

    /// Single layer using the given policy
    pub fn single_layer(policy: EvictionPolicy, max_entries: usize) -> CacheConfig {
        CacheConfig::with_layers(vec![
            CacheLayerConfig::new("only", max_entries, 1024 * 1024)
                .with_policy(policy)
                .with_default_ttl(Duration::from_secs(60)),
        ])
    }

    /// Resolver with a small database pool and linear backoff
    pub fn small_db_resolver(pool: usize, retries: u32) -> ResolverConfig {
        ResolverConfig::default().with_strategy(
            ResourceType::DatabaseConnection,
            AllocationStrategyConfig::new(pool, BackoffStrategy::Linear, retries),
        )
    }
}

/// Cache where every entry weighs one byte
pub fn unit_cache<V>(config: CacheConfig) -> Arc<LayeredCache<V>>
where
    V: Clone + Send + Sync + 'static,
{
    Arc::new(
        LayeredCache::with_estimator(config, Arc::new(FixedSizeEstimator(1)))
            .expect("valid cache config"),
    )
}

/// Coordinator over a default unit-size cache
pub fn coordinator(config: CoordinatorConfig) -> Arc<Coordinator<String>> {
    Arc::new(Coordinator::new(config, unit_cache(CacheConfig::default())))
}

/// Let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
