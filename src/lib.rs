//! # tiercoord
//!
//! A layered cache plus coordinated resource-allocation engine.
//!
//! ## Features
//!
//! - **Layered Cache**: named tiers with LRU, LFU, TTL or priority eviction,
//!   read-through lookups with promotion, tag/pattern invalidation with
//!   cycle-safe cascading, event rules and warm-up
//! - **Admission Control**: per-system concurrency limits with priority
//!   queuing, shared-cache short-circuiting and rolling health metrics
//! - **Conflict Resolution**: bounded allocation with backoff for database
//!   connections, memory, cache bytes, API calls and sockets, plus periodic
//!   detection and remediation of contention
//! - **Cancellation**: every coordinated operation receives a token that is
//!   cancelled when its deadline passes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tiercoord::{Config, CoordinatedRequest, RegisteredSystem, ResourceEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine: ResourceEngine<String> = ResourceEngine::new(Config::default())?;
//!     let tasks = engine.start();
//!
//!     engine
//!         .coordinator()
//!         .register_system(RegisteredSystem::new("metrics", 7, 2))?;
//!
//!     let value = engine
//!         .coordinator()
//!         .execute_coordinated(
//!             CoordinatedRequest::new("metrics", "daily-totals").cached("totals:today"),
//!             |_cancel| async { Ok("42".to_string()) },
//!         )
//!         .await?;
//!     println!("{}", value);
//!
//!     tasks.shutdown().await;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use utils::error::{EngineError, Result};

pub use core::cache_manager::{
    CacheStats, GetOptions, Invalidation, InvalidationRule, KeyPattern, LayeredCache, SetOptions,
    SizeEstimator, WarmupItem, WarmupReport,
};
pub use core::coordinator::{
    CoordinatedRequest, CoordinationAnalytics, Coordinator, RegisteredSystem, SystemHealth,
};
pub use core::resource_resolver::{
    AllocationHandle, AllocationPriority, ConflictResolver, ResourceStats, ResourceTelemetry,
    ResourceType, StaticTelemetry,
};
pub use utils::sys::BackgroundTasks;

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// The three engine services, built once from one [`Config`]
///
/// The cache is shared with the coordinator and reported to the resolver as
/// its cache-pressure source.
pub struct ResourceEngine<V> {
    config: Config,
    cache: Arc<LayeredCache<V>>,
    coordinator: Arc<Coordinator<V>>,
    resolver: Arc<ConflictResolver>,
}

impl<V> ResourceEngine<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    /// Build every service with static telemetry
    pub fn new(config: Config) -> Result<Self> {
        Self::with_telemetry(config, Arc::new(StaticTelemetry::default()))
    }

    /// Build every service, feeding `telemetry` to the resolver
    pub fn with_telemetry(config: Config, telemetry: Arc<dyn ResourceTelemetry>) -> Result<Self> {
        config.validate()?;

        let cache = Arc::new(LayeredCache::new(config.cache().clone())?);
        let coordinator = Arc::new(Coordinator::new(
            config.coordinator().clone(),
            cache.clone(),
        ));
        for system in &config.coordinator().systems {
            coordinator.register_system(RegisteredSystem::from(system))?;
        }
        let resolver = Arc::new(
            ConflictResolver::new(config.resolver().clone())
                .with_telemetry(telemetry)
                .with_cache(cache.clone()),
        );

        info!(
            layers = config.cache().layers.len(),
            systems = config.coordinator().systems.len(),
            "Resource engine created"
        );
        Ok(Self {
            config,
            cache,
            coordinator,
            resolver,
        })
    }

    /// Start cache maintenance, the coordination loop and conflict monitoring
    pub fn start(&self) -> BackgroundTasks {
        let mut tasks = self.cache.start_maintenance();
        tasks.absorb(self.coordinator.start());
        tasks.absorb(self.resolver.start_monitoring());
        info!("Resource engine started");
        tasks
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<LayeredCache<V>> {
        &self.cache
    }

    pub fn coordinator(&self) -> &Arc<Coordinator<V>> {
        &self.coordinator
    }

    pub fn resolver(&self) -> &Arc<ConflictResolver> {
        &self.resolver
    }
}

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
