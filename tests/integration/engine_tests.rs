//! Engine assembly integration tests
//!
//! Builds the full engine from YAML on disk and drives all three services
//! together.

#[cfg(test)]
mod tests {
    use crate::assert_approx_eq;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tiercoord::config::models::CacheStrategy;
    use tiercoord::core::resource_resolver::CachePressure;
    use tiercoord::{
        AllocationPriority, Config, CoordinatedRequest, EngineError, ResourceEngine, ResourceType,
    };

    const ENGINE_YAML: &str = r#"
cache:
  layers:
    - name: "hot"
      max_entries: 100
      max_bytes: 4096
      default_ttl_secs: 30
      eviction_policy: "lru"
    - name: "warm"
      max_entries: 1000
      max_bytes: 65536
      default_ttl_secs: 300
      eviction_policy: "lfu"

coordinator:
  systems:
    - id: "inventory"
      priority: 8
      max_concurrent_ops: 2
      cache_strategy: "isolated"
      refresh_interval_secs: 5
    - id: "pricing"
      priority: 4
      depends_on: ["inventory"]

resolver:
  api_calls_per_minute: 50
"#;

    async fn engine_from_yaml(yaml: &str) -> tiercoord::Result<ResourceEngine<serde_json::Value>> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        let config = Config::from_file(file.path()).await?;
        ResourceEngine::new(config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_from_yaml_registers_systems() {
        let engine = engine_from_yaml(ENGINE_YAML).await.unwrap();

        let analytics = engine.coordinator().get_coordination_analytics();
        assert_eq!(analytics.total_systems, 2);
        let inventory = analytics.system("inventory").unwrap();
        assert_eq!(inventory.system.cache_strategy, CacheStrategy::Isolated);
        assert_eq!(inventory.system.refresh_interval, Duration::from_secs(5));
        assert_eq!(
            analytics.system("pricing").unwrap().system.depends_on,
            vec!["inventory".to_string()]
        );
        assert_eq!(analytics.cache.layers.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_results_expire_with_refresh_interval() {
        let engine = engine_from_yaml(ENGINE_YAML).await.unwrap();
        let request = || CoordinatedRequest::new("inventory", "stock").cached("sku:1");

        let value = engine
            .coordinator()
            .execute_coordinated(request(), |_| async { Ok(serde_json::json!({"sku": 1, "qty": 3})) })
            .await
            .unwrap();
        assert_eq!(value["qty"], 3);
        assert!(engine.cache().contains("inventory:sku:1", "hot"));
        assert!(engine.cache().usage_bytes() > 0);

        tokio::time::advance(Duration::from_secs(5)).await;
        let refreshed = engine
            .coordinator()
            .execute_coordinated(request(), |_| async { Ok(serde_json::json!({"sku": 1, "qty": 2})) })
            .await
            .unwrap();
        assert_eq!(refreshed["qty"], 2);

        let health = engine.coordinator().get_system_health("inventory").unwrap();
        assert_eq!(health.completed_ops, 2);
        assert_approx_eq!(health.cache_hit_rate, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_loops_run_and_stop() {
        let engine = engine_from_yaml(ENGINE_YAML).await.unwrap();
        let api = engine
            .resolver()
            .request_allocation(ResourceType::ApiCall, "pricing", AllocationPriority::High)
            .await
            .unwrap();
        assert_eq!(engine.resolver().api_calls_last_minute(), 1);
        drop(api);

        let tasks = engine.start();
        // One resolver monitoring interval
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(engine.resolver().active_conflicts().is_empty());
        tasks.shutdown().await;

        let stats = engine.resolver().get_resource_stats();
        assert_eq!(stats.get(ResourceType::ApiCall).unwrap().counters.released, 1);
    }

    #[tokio::test]
    async fn test_invalid_yaml_is_rejected() {
        let duplicate = ENGINE_YAML.replace("\"pricing\"", "\"inventory\"");
        let result = engine_from_yaml(&duplicate).await;
        match result {
            Err(EngineError::Config(msg)) => assert!(msg.contains("Duplicate system id")),
            Err(other) => panic!("Expected config error, got {:?}", other),
            Ok(_) => panic!("Expected config error"),
        }
    }
}
