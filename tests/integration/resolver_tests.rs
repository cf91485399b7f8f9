//! Resource allocation and conflict remediation integration tests

#[cfg(test)]
mod tests {
    use crate::common::ConfigFactory;
    use crate::common::fixtures::unit_cache;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tiercoord::config::models::{CacheConfig, CacheLayerConfig, ResolverConfig};
    use tiercoord::core::resource_resolver::{CachePressure, ConflictKind, RemediationAction};
    use tiercoord::{AllocationPriority, ConflictResolver, ResourceType, SetOptions};

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_respect_pool_size() {
        let resolver = Arc::new(ConflictResolver::new(ConfigFactory::small_db_resolver(3, 5)));
        let in_use = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..10 {
            let resolver = resolver.clone();
            let in_use = in_use.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let handle = resolver
                    .request_allocation(
                        ResourceType::DatabaseConnection,
                        &format!("worker-{}", i),
                        AllocationPriority::Normal,
                    )
                    .await?;
                let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_use.fetch_sub(1, Ordering::SeqCst);
                drop(handle);
                tiercoord::Result::Ok(())
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(resolver.active_allocations(ResourceType::DatabaseConnection), 0);

        let stats = resolver.get_resource_stats();
        let db = stats.get(ResourceType::DatabaseConnection).unwrap();
        assert_eq!(db.counters.granted, 10);
        assert_eq!(db.counters.denied, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_pool_reports_retry_hint() {
        let resolver = ConflictResolver::new(ConfigFactory::small_db_resolver(2, 0));
        let first = resolver
            .request_allocation(ResourceType::DatabaseConnection, "a", AllocationPriority::Normal)
            .await
            .unwrap();
        let _second = resolver
            .request_allocation(ResourceType::DatabaseConnection, "b", AllocationPriority::Normal)
            .await
            .unwrap();

        let denied = resolver
            .request_allocation(ResourceType::DatabaseConnection, "c", AllocationPriority::Normal)
            .await
            .unwrap_err();
        assert!(denied.is_capacity_error());
        // Base 50 ms at full load with unit weight
        assert_eq!(denied.retry_after(), Some(Duration::from_millis(50)));

        assert!(first.release());
        assert!(
            resolver
                .request_allocation(ResourceType::DatabaseConnection, "c", AllocationPriority::Normal)
                .await
                .is_ok()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_pressure_is_detected_and_relieved() {
        let cache = unit_cache::<String>(CacheConfig::with_layers(vec![CacheLayerConfig::new(
            "only", 100, 100,
        )]));
        // Three-byte keys plus one byte per value
        for i in 0..22 {
            cache
                .set(&format!("k{:02}", i), "v".to_string(), &SetOptions::new())
                .unwrap();
        }
        assert_eq!(cache.usage_bytes(), 88);

        let resolver = ConflictResolver::new(ResolverConfig::default()).with_cache(cache.clone());
        let conflicts = resolver.detect_conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::Cache);
        assert_eq!(conflicts[0].remediation, RemediationAction::CacheEviction);

        let report = resolver.run_detection_cycle();
        assert_eq!((report.detected, report.resolved), (1, 1));
        assert!(cache.usage_bytes() <= 70);
        assert!(resolver.active_conflicts().is_empty());
        assert!(resolver.detect_conflicts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_burst_throttles_allocations() {
        let config = ResolverConfig {
            api_calls_per_minute: 4,
            ..ResolverConfig::default()
        };
        let resolver = ConflictResolver::new(config);
        for _ in 0..5 {
            resolver.record_api_call();
        }

        let report = resolver.run_detection_cycle();
        assert_eq!(report.resolved, 1);
        assert!(resolver.is_api_throttled());
        assert_eq!(resolver.effective_limit(ResourceType::ApiCall), Some(50));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!resolver.is_api_throttled());
        assert_eq!(resolver.api_calls_last_minute(), 0);
    }
}
