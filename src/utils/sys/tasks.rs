//! Background task lifecycle

use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Handle over a group of periodic background loops
///
/// All loops share one [`CancellationToken`]; [`BackgroundTasks::shutdown`]
/// cancels it and waits for every loop to return.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Create an empty task group
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a task group driven by an existing token
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            handles: Vec::new(),
        }
    }

    /// Token observed by every loop in this group
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawn `tick` every `period` until the group is cancelled
    pub fn spawn_periodic<F, Fut>(&mut self, name: &'static str, period: std::time::Duration, tick: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // First tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(task = name, "Background task stopped");
                        break;
                    }
                    _ = interval.tick() => tick().await,
                }
            }
        });
        self.handles.push(handle);
    }

    /// Merge another group into this one; its loops become tied to this token
    pub fn absorb(&mut self, other: BackgroundTasks) {
        let BackgroundTasks { token, handles } = other;
        let parent = self.token.clone();
        // Cancelling this group must stop the absorbed loops as well
        self.handles.push(tokio::spawn(async move {
            parent.cancelled().await;
            token.cancel();
        }));
        self.handles.extend(handles);
    }

    /// Number of running loops
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the group has no loops
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancel every loop and wait for them to finish
    pub async fn shutdown(self) {
        self.token.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }
        info!("Background tasks shut down");
    }
}
