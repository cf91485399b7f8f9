//! Coordinated execution integration tests

#[cfg(test)]
mod tests {
    use crate::common::assertions::EngineResultAssertions;
    use crate::common::fixtures::coordinator;
    use crate::common::settle;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tiercoord::config::models::{CacheStrategy, CoordinatorConfig};
    use tiercoord::{CoordinatedRequest, EngineError, RegisteredSystem};

    /// A "metrics" system at priority 7 admitting two operations at a time
    /// receives five 50 ms operations with priorities 5, 5, 3, 9 and 6.
    #[tokio::test(start_paused = true)]
    async fn test_metrics_system_admits_two_and_drains_by_priority() {
        let coordinator = coordinator(CoordinatorConfig::default());
        coordinator
            .register_system(RegisteredSystem::new("metrics", 7, 2))
            .unwrap();
        let finished = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for (i, priority) in [5u8, 5, 3, 9, 6].into_iter().enumerate() {
            let coordinator = coordinator.clone();
            let finished = finished.clone();
            let request = CoordinatedRequest::new("metrics", format!("op-{}", i)).priority(priority);
            handles.push(tokio::spawn(async move {
                coordinator
                    .execute_coordinated(request, move |_| async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        finished.lock().push(i);
                        Ok(format!("result-{}", i))
                    })
                    .await
            }));
            settle().await;
        }

        let health = coordinator.get_system_health("metrics").unwrap();
        assert_eq!((health.active_ops, health.queued_ops), (2, 3));

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        let order = finished.lock().clone();
        assert_eq!(order.len(), 5);
        let mut first: Vec<_> = order[..2].to_vec();
        let mut second: Vec<_> = order[2..4].to_vec();
        first.sort_unstable();
        second.sort_unstable();
        assert_eq!(first, vec![0, 1]);
        assert_eq!(second, vec![3, 4]);
        assert_eq!(order[4], 2);

        let health = coordinator.get_system_health("metrics").unwrap();
        assert_eq!((health.active_ops, health.queued_ops), (0, 0));
        assert_eq!(health.completed_ops, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_isolated_cache_serves_repeat_requests() {
        let coordinator = coordinator(CoordinatorConfig::default());
        coordinator
            .register_system(
                RegisteredSystem::new("reports", 5, 1).with_cache_strategy(CacheStrategy::Isolated),
            )
            .unwrap();
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let runs = runs.clone();
            let value = coordinator
                .execute_coordinated(
                    CoordinatedRequest::new("reports", "totals").cached("totals"),
                    move |_| async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        Ok("42".to_string())
                    },
                )
                .await
                .unwrap();
            assert_eq!(value, "42");
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(coordinator.cache().contains("reports:totals", "fast"));
        assert!(!coordinator.cache().contains("totals", "fast"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_running_operation() {
        let coordinator = coordinator(CoordinatorConfig::default());
        coordinator
            .register_system(RegisteredSystem::new("search", 5, 1))
            .unwrap();
        let observed = Arc::new(AtomicBool::new(false));

        let seen = observed.clone();
        let result = coordinator
            .execute_coordinated(
                CoordinatedRequest::new("search", "slow-query").timeout(Duration::from_millis(100)),
                move |token| async move {
                    // Work handed to another task observes the cancellation
                    tokio::spawn(async move {
                        token.cancelled().await;
                        seen.store(true, Ordering::SeqCst);
                    });
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok("late".to_string())
                },
            )
            .await;

        result.assert_timed_out();
        settle().await;
        assert!(observed.load(Ordering::SeqCst));
        let health = coordinator.get_system_health("search").unwrap();
        assert_eq!(health.active_ops, 0);
        assert!((health.error_rate - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregister_fails_queued_callers() {
        let coordinator = coordinator(CoordinatorConfig::default());
        coordinator
            .register_system(RegisteredSystem::new("batch", 5, 1))
            .unwrap();

        let running = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .execute_coordinated(CoordinatedRequest::new("batch", "first"), |_| async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok("done".to_string())
                    })
                    .await
            })
        };
        settle().await;
        let queued = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .execute_coordinated(CoordinatedRequest::new("batch", "second"), |_| async {
                        Ok("never".to_string())
                    })
                    .await
            })
        };
        settle().await;

        let removed = coordinator.unregister_system("batch").unwrap();
        assert_eq!(removed.id, "batch");

        queued.await.unwrap().assert_cancelled();
        assert!(running.await.unwrap().is_ok());

        let unknown = coordinator
            .execute_coordinated(CoordinatedRequest::new("batch", "third"), |_| async {
                Ok(String::new())
            })
            .await;
        assert!(matches!(unknown, Err(EngineError::SystemNotFound(_))));
    }
}
