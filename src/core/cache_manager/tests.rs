//! Layered cache tests

#[cfg(test)]
mod tests {
    use crate::config::models::cache::{
        CacheConfig, CacheLayerConfig, EvictionPolicy, InvalidationRuleConfig,
    };
    use crate::core::cache_manager::*;
    use crate::core::resource_resolver::CachePressure;
    use crate::utils::error::{EngineError, Result};
    use std::sync::Arc;
    use std::time::Duration;

    fn layer(name: &str, max_entries: usize, policy: EvictionPolicy) -> CacheLayerConfig {
        CacheLayerConfig::new(name, max_entries, 1_000_000)
            .with_policy(policy)
            .with_default_ttl(Duration::from_secs(60))
    }

    fn cache(layers: Vec<CacheLayerConfig>) -> LayeredCache<String> {
        LayeredCache::with_estimator(
            CacheConfig::with_layers(layers),
            Arc::new(FixedSizeEstimator(10)),
        )
        .unwrap()
    }

    fn two_tier() -> LayeredCache<String> {
        cache(vec![
            layer("fast", 100, EvictionPolicy::Lru),
            layer("slow", 1_000, EvictionPolicy::Ttl),
        ])
    }

    fn only(name: &str) -> SetOptions {
        SetOptions::new().layers([name])
    }

    async fn tick() {
        tokio::time::advance(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_then_get_round_trip() {
        let cache = two_tier();
        cache
            .set("query:1", "rows".to_string(), &SetOptions::new())
            .unwrap();

        assert_eq!(
            cache.get("query:1", &GetOptions::layers(["fast"])),
            Some("rows".to_string())
        );
        assert!(cache.contains("query:1", "slow"));
        assert_eq!(cache.get("missing", &GetOptions::default()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_at_ttl() {
        let cache = two_tier();
        let options = SetOptions::new().ttl(Duration::from_secs(10));
        cache.set("k", "v".to_string(), &options).unwrap();

        tokio::time::advance(Duration::from_millis(9_999)).await;
        assert!(cache.get("k", &GetOptions::default()).is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get("k", &GetOptions::default()).is_none());
        // Expired entries are dropped when read
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lru_evicts_least_recently_accessed() {
        let cache = cache(vec![layer("l", 3, EvictionPolicy::Lru)]);
        for key in ["a", "b", "c"] {
            cache.set(key, key.to_string(), &SetOptions::new()).unwrap();
            tick().await;
        }
        cache.get("a", &GetOptions::default());
        tick().await;

        cache.set("d", "d".to_string(), &SetOptions::new()).unwrap();
        assert!(!cache.contains("b", "l"));
        for key in ["a", "c", "d"] {
            assert!(cache.contains(key, "l"), "{} should remain", key);
        }
        assert_eq!(cache.get_stats().layer("l").unwrap().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lfu_evicts_least_frequently_accessed() {
        let cache = cache(vec![layer("l", 3, EvictionPolicy::Lfu)]);
        for key in ["a", "b", "c"] {
            cache.set(key, key.to_string(), &SetOptions::new()).unwrap();
        }
        tick().await;
        cache.get("a", &GetOptions::default());
        cache.get("a", &GetOptions::default());
        cache.get("c", &GetOptions::default());

        cache.set("d", "d".to_string(), &SetOptions::new()).unwrap();
        assert!(!cache.contains("b", "l"));
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_evicts_soonest_expiry() {
        let cache = cache(vec![layer("l", 3, EvictionPolicy::Ttl)]);
        for (key, secs) in [("a", 100), ("b", 10), ("c", 50)] {
            cache
                .set(key, key.to_string(), &SetOptions::new().ttl(Duration::from_secs(secs)))
                .unwrap();
        }

        cache.set("d", "d".to_string(), &SetOptions::new()).unwrap();
        assert!(!cache.contains("b", "l"));
        assert!(cache.contains("a", "l") && cache.contains("c", "l"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_priority_evicts_lowest_priority() {
        let cache = cache(vec![layer("l", 3, EvictionPolicy::Priority)]);
        for (key, priority) in [("a", 5), ("b", 2), ("c", 9)] {
            cache
                .set(key, key.to_string(), &SetOptions::new().priority(priority))
                .unwrap();
        }

        cache
            .set("d", "d".to_string(), &SetOptions::new().priority(1))
            .unwrap();
        assert!(!cache.contains("b", "l"));
        assert!(cache.contains("d", "l"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_byte_budget_evicts_one_victim() {
        // Each entry is 1 key byte + 10 estimated bytes
        let config = CacheLayerConfig::new("l", 100, 33).with_policy(EvictionPolicy::Lru);
        let cache = cache(vec![config]);
        for key in ["a", "b", "c"] {
            cache.set(key, String::new(), &SetOptions::new()).unwrap();
            tick().await;
        }
        assert_eq!(cache.len(), 3);

        cache.set("d", String::new(), &SetOptions::new()).unwrap();
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("a", "l"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_does_not_evict() {
        let cache = cache(vec![layer("l", 2, EvictionPolicy::Lru)]);
        cache.set("a", "1".to_string(), &SetOptions::new()).unwrap();
        cache.set("b", "1".to_string(), &SetOptions::new()).unwrap();
        cache.set("a", "2".to_string(), &SetOptions::new()).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a", &GetOptions::default()), Some("2".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hot_entry_promoted_into_faster_layers() {
        let cache = two_tier();
        cache.set("k", "v".to_string(), &only("slow")).unwrap();
        let scan = GetOptions::layers(["fast", "slow"]);

        for _ in 0..2 {
            cache.get("k", &scan);
        }
        assert!(!cache.contains("k", "fast"));
        cache.get("k", &scan);
        assert!(cache.contains("k", "fast"));

        let stats = cache.get_stats();
        assert_eq!(stats.layer("fast").unwrap().misses, 3);
        assert_eq!(stats.layer("slow").unwrap().hits, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_promotion_skipped_after_cascade_removed_entry() {
        let cache = two_tier();
        cache.set("k", "v".to_string(), &only("slow")).unwrap();
        let slow_only = GetOptions::layers(["slow"]);
        for _ in 0..3 {
            cache.get("k", &slow_only);
        }
        let read = cache.layers[1]
            .hot_entries(0, tokio::time::Instant::now())
            .pop()
            .unwrap();

        // The cascade lands between the read and the copy
        assert_eq!(cache.invalidate(&Invalidation::key_contains("k").cascade()), 1);
        cache.promote(&read, 1, &[0]);
        assert!(!cache.contains("k", "fast"));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_layer_is_never_touched() {
        let cache = two_tier();
        cache.set_layer_enabled("fast", false).unwrap();
        cache.set("k", "v".to_string(), &SetOptions::new()).unwrap();

        assert!(!cache.contains("k", "fast"));
        assert!(cache.contains("k", "slow"));

        cache.get("k", &GetOptions::default());
        assert_eq!(cache.get_stats().layer("fast").unwrap().total_requests, 0);

        assert!(matches!(
            cache.set_layer_enabled("nope", true),
            Err(EngineError::UnknownLayer(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_layers() {
        let cache = two_tier();
        let result = cache.set("k", "v".to_string(), &only("warm"));
        assert!(matches!(result, Err(EngineError::UnknownLayer(name)) if name == "warm"));

        cache.set("k", "v".to_string(), &only("slow")).unwrap();
        assert_eq!(
            cache.get("k", &GetOptions::layers(["warm", "slow"])),
            Some("v".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_by_tag_is_precise() {
        let cache = two_tier();
        cache
            .set("a", "1".to_string(), &SetOptions::new().tags(["t", "x"]))
            .unwrap();
        cache
            .set("b", "2".to_string(), &SetOptions::new().tags(["t"]))
            .unwrap();
        cache
            .set("c", "3".to_string(), &SetOptions::new().tags(["x"]))
            .unwrap();

        // Two tagged keys in two layers
        assert_eq!(cache.invalidate(&Invalidation::tag("t")), 4);
        assert!(cache.get("a", &GetOptions::default()).is_none());
        assert!(cache.get("b", &GetOptions::default()).is_none());
        assert!(cache.get("c", &GetOptions::default()).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_limited_to_layers() {
        let cache = two_tier();
        cache.set("user:1", "u".to_string(), &SetOptions::new()).unwrap();

        let removed = cache.invalidate(&Invalidation::key_contains("user:").in_layers(["fast"]));
        assert_eq!(removed, 1);
        assert!(!cache.contains("user:1", "fast"));
        assert!(cache.contains("user:1", "slow"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cascade_terminates_on_cycle() {
        let cache = two_tier();
        let slow = || only("slow");
        cache
            .set("user:1", "u".to_string(), &slow().depends_on(["orders:1"]))
            .unwrap();
        cache
            .set("orders:1", "o".to_string(), &slow().depends_on(["user:1"]))
            .unwrap();
        cache
            .set("report:1", "r".to_string(), &slow().depends_on(["orders:1"]))
            .unwrap();
        cache.set("other", "x".to_string(), &slow()).unwrap();

        let removed = cache.invalidate(&Invalidation::key_contains("user:1").cascade());
        assert_eq!(removed, 3);
        assert!(cache.contains("other", "slow"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_without_cascade_keeps_dependents() {
        let cache = two_tier();
        cache.set("base", "b".to_string(), &only("fast")).unwrap();
        cache
            .set("derived", "d".to_string(), &only("fast").depends_on(["base"]))
            .unwrap();

        assert_eq!(cache.invalidate(&Invalidation::key_contains("base")), 1);
        assert!(cache.contains("derived", "fast"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_regex_pattern_invalidation() {
        let cache = two_tier();
        for key in ["session:1", "session:22", "sessions"] {
            cache.set(key, key.to_string(), &only("fast")).unwrap();
        }
        let pattern = KeyPattern::regex(r"^session:\d+$").unwrap();
        assert_eq!(cache.invalidate(&Invalidation::pattern(pattern)), 2);
        assert!(cache.contains("sessions", "fast"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_with_caches_fallback_result() -> Result<()> {
        let cache = two_tier();
        let options = GetOptions::layers(["fast"]).with_tags(["computed"]);

        let value = cache
            .get_with("k", &options, || async { Ok("computed".to_string()) })
            .await?;
        assert_eq!(value, "computed");
        assert!(cache.contains("k", "fast"));
        assert!(!cache.contains("k", "slow"));

        // Served from cache; the fallback would fail
        let again = cache
            .get_with("k", &options, || async { Err(EngineError::operation("unreachable")) })
            .await?;
        assert_eq!(again, "computed");
        assert_eq!(cache.invalidate(&Invalidation::tag("computed")), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_with_error_and_no_cache() {
        let cache = two_tier();
        let failed = cache
            .get_with("k", &GetOptions::default(), || async {
                Err(EngineError::operation("backend down"))
            })
            .await;
        assert!(matches!(failed, Err(EngineError::Operation(_))));
        assert!(cache.is_empty());

        let value = cache
            .get_with("k", &GetOptions::default().without_caching(), || async {
                Ok("fresh".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "fresh");
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_rules_immediate_and_delayed() {
        let mut config = CacheConfig::with_layers(vec![layer("l", 100, EvictionPolicy::Lru)]);
        config.invalidation_rules.push(InvalidationRuleConfig {
            pattern: "price:".to_string(),
            regex: false,
            events: vec!["catalog_updated".to_string()],
            cascade: false,
            delay_ms: 0,
        });
        let cache: Arc<LayeredCache<String>> = Arc::new(
            LayeredCache::with_estimator(config, Arc::new(FixedSizeEstimator(1))).unwrap(),
        );
        cache.add_invalidation_rule(
            InvalidationRule::new(KeyPattern::contains("stock:"), ["catalog_updated"])
                .with_delay(Duration::from_secs(5)),
        );
        for key in ["price:1", "stock:1", "user:1"] {
            cache.set(key, key.to_string(), &SetOptions::new()).unwrap();
        }

        assert_eq!(cache.on_event("unrelated"), 0);
        assert_eq!(cache.on_event("catalog_updated"), 1);
        assert!(cache.contains("stock:1", "l"));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!cache.contains("stock:1", "l"));
        assert!(cache.contains("user:1", "l"));

        assert_eq!(cache.remove_invalidation_rule("price:"), 1);
        assert_eq!(cache.invalidation_rules().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_up_reports_outcomes() {
        let cache = two_tier();
        cache.set("cached", "v".to_string(), &SetOptions::new()).unwrap();

        let items = vec![
            WarmupItem::new("cached", SetOptions::new()),
            WarmupItem::new("fresh", SetOptions::new()),
            WarmupItem::new("broken", SetOptions::new()),
            WarmupItem::new("bad-layer", only("warm")),
        ];
        let report = cache
            .warm_up(items, |key| async move {
                if key == "broken" {
                    Err(EngineError::operation("loader failed"))
                } else {
                    Ok(format!("loaded:{}", key))
                }
            })
            .await;

        assert_eq!(
            report,
            WarmupReport {
                loaded: 1,
                skipped: 1,
                failed: 2
            }
        );
        assert_eq!(
            cache.get("fresh", &GetOptions::default()),
            Some("loaded:fresh".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_sweep_prunes_dependency_edges() {
        let cache = two_tier();
        cache.set("base", "b".to_string(), &only("fast")).unwrap();
        cache
            .set(
                "derived",
                "d".to_string(),
                &only("fast")
                    .ttl(Duration::from_secs(5))
                    .depends_on(["base"]),
            )
            .unwrap();
        assert_eq!(cache.get_stats().dependency_edges, 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.expire_sweep(), 1);
        assert_eq!(cache.get_stats().dependency_edges, 0);
        assert!(cache.contains("base", "fast"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_sweep_keeps_edges_through_expired_link() {
        let cache = two_tier();
        cache.set("a", "a".to_string(), &only("fast")).unwrap();
        cache
            .set(
                "b",
                "b".to_string(),
                &only("fast").ttl(Duration::from_secs(5)).depends_on(["a"]),
            )
            .unwrap();
        cache
            .set("c", "c".to_string(), &only("fast").depends_on(["b"]))
            .unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.expire_sweep(), 1);
        assert_eq!(cache.get_stats().dependency_edges, 2);

        // The expired middle link is walked but not counted
        assert_eq!(cache.invalidate(&Invalidation::key_contains("a").cascade()), 2);
        assert!(!cache.contains("c", "fast"));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cascade_does_not_count_expired_dependents() {
        let cache = two_tier();
        cache.set("a", "a".to_string(), &only("fast")).unwrap();
        cache
            .set(
                "b",
                "b".to_string(),
                &only("fast").ttl(Duration::from_secs(5)).depends_on(["a"]),
            )
            .unwrap();
        cache
            .set("c", "c".to_string(), &only("fast").depends_on(["b"]))
            .unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.invalidate(&Invalidation::key_contains("a").cascade()), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_value_sweep() {
        let cache = cache(vec![
            layer("l", 100, EvictionPolicy::Lru).with_default_ttl(Duration::from_secs(3600)),
        ]);
        for key in ["cold", "once", "warm"] {
            cache.set(key, key.to_string(), &SetOptions::new()).unwrap();
        }
        cache.get("once", &GetOptions::default());
        cache.get("warm", &GetOptions::default());
        cache.get("warm", &GetOptions::default());

        tokio::time::advance(Duration::from_secs(300)).await;
        assert_eq!(cache.low_value_sweep(), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.low_value_sweep(), 2);
        assert!(cache.contains("warm", "l"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebalance_moves_hot_entries_to_fastest_layer() {
        let cache = two_tier();
        cache.set("hot", "h".to_string(), &only("slow")).unwrap();
        cache.set("cool", "c".to_string(), &only("slow")).unwrap();
        let slow_only = GetOptions::layers(["slow"]);
        for _ in 0..11 {
            cache.get("hot", &slow_only);
        }
        cache.get("cool", &slow_only);

        assert_eq!(cache.rebalance_sweep(), 1);
        assert!(cache.contains("hot", "fast"));
        assert!(!cache.contains("cool", "fast"));
        assert_eq!(cache.rebalance_sweep(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_maintenance_loops_expire_entries() {
        let cache = Arc::new(two_tier());
        cache
            .set("k", "v".to_string(), &SetOptions::new().ttl(Duration::from_secs(30)))
            .unwrap();

        let tasks = cache.start_maintenance();
        assert_eq!(tasks.len(), 3);
        tokio::time::sleep(Duration::from_secs(61)).await;
        tasks.shutdown().await;

        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_pressure_relief() {
        let mut config = CacheConfig::with_layers(vec![
            CacheLayerConfig::new("l", 100, 100).with_policy(EvictionPolicy::Lru),
        ]);
        config.pressure_relief_ratio = 0.5;
        let cache: LayeredCache<String> =
            LayeredCache::with_estimator(config, Arc::new(FixedSizeEstimator(19))).unwrap();
        for key in ["a", "b", "c", "d", "e"] {
            cache.set(key, String::new(), &SetOptions::new()).unwrap();
            tick().await;
        }
        assert_eq!(cache.usage_bytes(), 100);
        assert_eq!(cache.capacity_bytes(), 100);

        assert_eq!(cache.relieve_pressure(), 3);
        assert_eq!(cache.usage_bytes(), 40);
        assert!(cache.contains("e", "l"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_json_sized_cache_stats() {
        let cache: LayeredCache<serde_json::Value> =
            LayeredCache::new(CacheConfig::default()).unwrap();
        cache
            .set("k", serde_json::json!([1, 2]), &only("fast"))
            .unwrap();
        cache.get("k", &GetOptions::layers(["fast"]));
        cache.get("missing", &GetOptions::layers(["fast"]));

        let stats = cache.get_stats();
        let fast = stats.layer("fast").unwrap();
        assert_eq!(fast.memory_usage, 6);
        assert_eq!(fast.entry_count, 1);
        assert!((fast.hit_rate - 0.5).abs() < f64::EPSILON);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get_stats().hits, 0);
    }

    #[test]
    fn test_duplicate_layers_rejected() {
        let config = CacheConfig::with_layers(vec![
            layer("a", 1, EvictionPolicy::Lru),
            layer("a", 1, EvictionPolicy::Lfu),
        ]);
        assert!(LayeredCache::<String>::new(config).is_err());
    }
}
