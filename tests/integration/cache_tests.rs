//! Layered cache integration tests
//!
//! Exercises the cache through its public API only: reads across layers,
//! promotion, eviction, invalidation and maintenance.

#[cfg(test)]
mod tests {
    use crate::common::ConfigFactory;
    use crate::common::fixtures::unit_cache;
    use std::sync::Arc;
    use std::time::Duration;
    use tiercoord::config::models::EvictionPolicy;
    use tiercoord::core::resource_resolver::CachePressure;
    use tiercoord::{EngineError, GetOptions, Invalidation, InvalidationRule, KeyPattern, SetOptions};
    use tokio_test::{assert_err, assert_ok};

    // ==================== Reads and promotion ====================

    #[tokio::test(start_paused = true)]
    async fn test_hot_entry_is_promoted_to_faster_layer() {
        let cache = unit_cache::<String>(ConfigFactory::two_layer_cache(10, 10));
        assert_ok!(cache.set("report:7", "v".to_string(), &SetOptions::new().layers(["l2"])));
        assert!(!cache.contains("report:7", "l1"));

        for _ in 0..2 {
            assert_eq!(cache.get("report:7", &GetOptions::default()), Some("v".to_string()));
        }
        assert!(!cache.contains("report:7", "l1"));

        // Third read reaches the promotion threshold
        assert_eq!(cache.get("report:7", &GetOptions::default()), Some("v".to_string()));
        assert!(cache.contains("report:7", "l1"));

        let stats = cache.get_stats();
        assert_eq!(stats.layer("l1").unwrap().misses, 3);
        assert_eq!(stats.layer("l2").unwrap().hits, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_order_follows_requested_layers() {
        let cache = unit_cache::<String>(ConfigFactory::two_layer_cache(10, 10));
        cache
            .set("k", "fast".to_string(), &SetOptions::new().layers(["l1"]))
            .unwrap();
        cache
            .set("k", "slow".to_string(), &SetOptions::new().layers(["l2"]))
            .unwrap();

        assert_eq!(cache.get("k", &GetOptions::default()), Some("fast".to_string()));
        assert_eq!(cache.get("k", &GetOptions::layers(["l2", "l1"])), Some("slow".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_misses() {
        let cache = unit_cache::<String>(ConfigFactory::two_layer_cache(10, 10));
        let options = SetOptions::new().ttl(Duration::from_secs(2));
        cache.set("session", "s".to_string(), &options).unwrap();

        tokio::time::advance(Duration::from_millis(1_999)).await;
        assert!(cache.get("session", &GetOptions::default()).is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get("session", &GetOptions::default()).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_through_stores_result_once() {
        let cache = unit_cache::<String>(ConfigFactory::two_layer_cache(10, 10));
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value = cache
                .get_with("user:1", &GetOptions::default(), || async move {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok("alice".to_string())
                })
                .await;
            assert_eq!(assert_ok!(value), "alice");
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_to_unknown_layer_fails() {
        let cache = unit_cache::<String>(ConfigFactory::two_layer_cache(10, 10));
        let result = cache.set("k", "v".to_string(), &SetOptions::new().layers(["l9"]));
        assert!(matches!(assert_err!(result), EngineError::UnknownLayer(name) if name == "l9"));
        assert!(cache.is_empty());
    }

    // ==================== Eviction ====================

    #[tokio::test(start_paused = true)]
    async fn test_lfu_layer_keeps_frequently_read_keys() {
        let cache = unit_cache::<u32>(ConfigFactory::single_layer(EvictionPolicy::Lfu, 3));
        for (i, key) in ["a", "b", "c"].into_iter().enumerate() {
            cache.set(key, i as u32, &SetOptions::new()).unwrap();
            tokio::time::advance(Duration::from_millis(10)).await;
        }
        cache.get("a", &GetOptions::default());
        cache.get("c", &GetOptions::default());

        cache.set("d", 3, &SetOptions::new()).unwrap();
        assert!(!cache.contains("b", "only"));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get_stats().layer("only").unwrap().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_priority_layer_evicts_lowest_priority() {
        let cache = unit_cache::<u32>(ConfigFactory::single_layer(EvictionPolicy::Priority, 2));
        cache.set("keep", 1, &SetOptions::new().priority(9)).unwrap();
        cache.set("drop", 2, &SetOptions::new().priority(2)).unwrap();
        cache.set("new", 3, &SetOptions::new()).unwrap();

        assert!(cache.contains("keep", "only"));
        assert!(!cache.contains("drop", "only"));
    }

    // ==================== Invalidation ====================

    #[tokio::test(start_paused = true)]
    async fn test_cascade_follows_dependency_chain() {
        let cache = unit_cache::<String>(ConfigFactory::two_layer_cache(10, 10));
        cache.set("user:1", "u".to_string(), &SetOptions::new()).unwrap();
        cache
            .set("orders:1", "o".to_string(), &SetOptions::new().depends_on(["user:1"]))
            .unwrap();
        cache
            .set("invoice:1", "i".to_string(), &SetOptions::new().depends_on(["orders:1"]))
            .unwrap();
        cache.set("user:2", "u2".to_string(), &SetOptions::new()).unwrap();

        let removed = cache.invalidate(&Invalidation::key_contains("user:1").cascade());
        // Three keys in two layers each
        assert_eq!(removed, 6);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains("user:2", "l1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_and_regex_invalidation() {
        let cache = unit_cache::<String>(ConfigFactory::two_layer_cache(10, 10));
        let tagged = SetOptions::new().layers(["l1"]).tags(["pricing"]);
        cache.set("price:eu", "1".to_string(), &tagged).unwrap();
        cache.set("price:us", "2".to_string(), &SetOptions::new().layers(["l1"])).unwrap();
        cache.set("stock:us", "3".to_string(), &SetOptions::new().layers(["l1"])).unwrap();

        assert_eq!(cache.invalidate(&Invalidation::tag("pricing")), 1);
        let pattern = KeyPattern::regex(r"^\w+:us$").unwrap();
        assert_eq!(cache.invalidate(&Invalidation::pattern(pattern)), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_rule_fires_after_delay() {
        let cache = unit_cache::<String>(ConfigFactory::two_layer_cache(10, 10));
        cache.set("catalog:1", "c".to_string(), &SetOptions::new()).unwrap();
        cache.add_invalidation_rule(
            InvalidationRule::new(KeyPattern::contains("catalog"), ["catalog.updated"])
                .with_delay(Duration::from_millis(500)),
        );

        // Delayed rules report nothing up front
        assert_eq!(cache.on_event("catalog.updated"), 0);
        tokio::task::yield_now().await;
        assert_eq!(cache.len(), 2);

        tokio::time::sleep(Duration::from_millis(501)).await;
        assert!(cache.is_empty());

        assert_eq!(cache.remove_invalidation_rule("catalog"), 1);
        cache.set("catalog:1", "c".to_string(), &SetOptions::new()).unwrap();
        cache.on_event("catalog.updated");
        tokio::time::sleep(Duration::from_millis(501)).await;
        assert_eq!(cache.len(), 2);
    }

    // ==================== Maintenance ====================

    #[tokio::test(start_paused = true)]
    async fn test_pressure_cleanup_drops_expired_and_idle_entries() {
        let cache = unit_cache::<String>(ConfigFactory::two_layer_cache(10, 10));
        cache
            .set("short", "s".to_string(), &SetOptions::new().ttl(Duration::from_secs(1)))
            .unwrap();
        let long = SetOptions::new().layers(["l2"]).ttl(Duration::from_secs(3_600));
        cache.set("idle", "i".to_string(), &long).unwrap();
        cache.set("busy", "b".to_string(), &long).unwrap();

        tokio::time::advance(Duration::from_secs(301)).await;
        cache.get("busy", &GetOptions::layers(["l2"]));

        // Two expired copies of "short" plus the never-read "idle"
        assert_eq!(cache.cleanup(), 3);
        assert!(cache.contains("busy", "l2"));
    }
}
