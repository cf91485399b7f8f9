//! Resource allocation coordinator
//!
//! Wraps caller operations with a shared-cache lookup, a conflict pass and
//! per-system admission control, then folds the outcome into the system's
//! rolling health.

use super::queue::{Slot, SystemState};
use super::types::{Alert, CoordinatedRequest, RegisteredSystem, SystemHealth, SystemSnapshot};
use crate::config::models::coordinator::CoordinatorConfig;
use crate::core::cache_manager::{GetOptions, LayeredCache, SetOptions};
use crate::core::resource_resolver::ConflictLog;
use crate::utils::error::{EngineError, Result, TimeoutWrapper};
use crate::utils::sys::ResultExt;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Coordinates expensive operations across registered systems
pub struct Coordinator<V> {
    pub(super) config: CoordinatorConfig,
    pub(super) systems: DashMap<String, Slot>,
    pub(super) cache: Arc<LayeredCache<V>>,
    pub(super) conflicts: ConflictLog,
    pub(super) alerts: Mutex<VecDeque<Alert>>,
}

impl<V> std::fmt::Debug for Coordinator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("systems", &self.systems.len())
            .field("conflicts", &self.conflicts.len())
            .finish()
    }
}

impl<V> Coordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a coordinator over a shared cache
    pub fn new(config: CoordinatorConfig, cache: Arc<LayeredCache<V>>) -> Self {
        let retention = config.conflict_retention();
        Self {
            config,
            systems: DashMap::new(),
            cache,
            conflicts: ConflictLog::new(retention),
            alerts: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<LayeredCache<V>> {
        &self.cache
    }

    pub fn conflict_log(&self) -> &ConflictLog {
        &self.conflicts
    }

    /// Register a system; ids are unique
    pub fn register_system(&self, system: RegisteredSystem) -> Result<()> {
        if system.id.trim().is_empty() {
            return Err(EngineError::validation("System id cannot be empty"));
        }
        if !(1..=10).contains(&system.priority) {
            return Err(EngineError::validation(format!(
                "System '{}' priority must be between 1 and 10, got {}",
                system.id, system.priority
            )));
        }
        if system.max_concurrent_ops == 0 {
            return Err(EngineError::validation(format!(
                "System '{}' max_concurrent_ops must be at least 1",
                system.id
            )));
        }

        match self.systems.entry(system.id.clone()) {
            Entry::Occupied(_) => Err(EngineError::SystemAlreadyRegistered(system.id)),
            Entry::Vacant(vacant) => {
                info!(
                    system_id = %system.id,
                    priority = system.priority,
                    max_concurrent_ops = system.max_concurrent_ops,
                    "System registered"
                );
                vacant.insert(Arc::new(Mutex::new(SystemState::new(system))));
                Ok(())
            }
        }
    }

    /// Remove a system; its queued callers receive [`EngineError::Cancelled`]
    pub fn unregister_system(&self, system_id: &str) -> Result<RegisteredSystem> {
        let (_, slot) = self
            .systems
            .remove(system_id)
            .ok_or_else(|| EngineError::system_not_found(system_id))?;
        let mut state = slot.lock();
        let dropped = state.queue.clear();
        state.health.queued_ops = 0;
        info!(system_id = system_id, dropped_requests = dropped, "System unregistered");
        Ok(state.system.clone())
    }

    pub(super) fn slot(&self, system_id: &str) -> Result<Slot> {
        self.systems
            .get(system_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::system_not_found(system_id))
    }

    pub fn get_system_health(&self, system_id: &str) -> Option<SystemHealth> {
        self.systems
            .get(system_id)
            .map(|entry| entry.value().lock().current_health())
    }

    /// Every system with its current health
    pub fn snapshots(&self) -> Vec<SystemSnapshot> {
        let mut snapshots: Vec<SystemSnapshot> = self
            .systems
            .iter()
            .map(|entry| {
                let mut state = entry.value().lock();
                SystemSnapshot {
                    health: state.current_health(),
                    system: state.system.clone(),
                }
            })
            .collect();
        snapshots.sort_by(|a, b| a.system.id.cmp(&b.system.id));
        snapshots
    }

    /// Run `operation` on behalf of a system
    ///
    /// Returns the cached value when the request opts into the shared cache
    /// and the key is present. Otherwise the operation runs once a slot is
    /// free, racing the request timeout; on timeout its cancellation token is
    /// cancelled and the future dropped. Queued requests resolve once
    /// dispatched and completed.
    pub async fn execute_coordinated<F, Fut>(
        &self,
        request: CoordinatedRequest,
        operation: F,
    ) -> Result<V>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let slot = self.slot(&request.system_id)?;
        let system = slot.lock().system.clone();
        let cache_key = if request.use_shared_cache {
            request
                .cache_key
                .as_deref()
                .and_then(|key| system.cache_key(key))
        } else {
            None
        };

        if let Some(key) = &cache_key {
            if let Some(value) = self.cache.get(key, &GetOptions::default()) {
                slot.lock()
                    .health
                    .record(Duration::ZERO, true, true, self.config.ema_alpha);
                debug!(
                    system_id = %system.id,
                    request_id = %request.request_id,
                    "Served from shared cache"
                );
                return Ok(value);
            }
        }

        self.resolve_conflicts_for(&system).await;

        let priority = request.priority.unwrap_or(system.priority).clamp(1, 10);
        let acquired = {
            let mut state = slot.lock();
            match state.try_acquire(&slot) {
                Some(guard) => Ok(guard),
                None => Err(state.enqueue(request.request_id.clone(), priority)),
            }
        };
        let guard = match acquired {
            Ok(guard) => guard,
            Err(receiver) => {
                debug!(
                    system_id = %system.id,
                    request_id = %request.request_id,
                    priority = priority,
                    "System at capacity, request queued"
                );
                receiver.await.map_err(|_| {
                    EngineError::cancelled(format!(
                        "request {} dropped: system {} unregistered",
                        request.request_id, system.id
                    ))
                })?
            }
        };

        let timeout = request.timeout.unwrap_or_else(|| self.config.default_timeout());
        let started = Instant::now();
        let result = TimeoutWrapper::new(timeout)
            .call(&request.request_id, operation)
            .await;
        let elapsed = started.elapsed();

        slot.lock()
            .health
            .record(elapsed, result.is_ok(), false, self.config.ema_alpha);

        match &result {
            Ok(value) => {
                if let Some(key) = &cache_key {
                    let options = SetOptions::new().ttl(system.refresh_interval);
                    self.cache
                        .set(key, value.clone(), &options)
                        .log_and_continue("caching coordinated result");
                }
            }
            Err(e) => warn!(
                system_id = %system.id,
                request_id = %request.request_id,
                "Coordinated operation failed: {}",
                e
            ),
        }

        // Frees the slot and dispatches the next waiter
        drop(guard);
        result
    }

    /// Give free slots to queued requests in every system
    pub fn dispatch_pending(&self) -> usize {
        self.systems
            .iter()
            .map(|entry| {
                let slot = entry.value().clone();
                let mut state = slot.lock();
                state.dispatch(&slot)
            })
            .sum()
    }

    /// Sum of active operations across systems
    pub fn total_active_ops(&self) -> usize {
        self.systems
            .iter()
            .map(|entry| entry.value().lock().health.active_ops)
            .sum()
    }
}
