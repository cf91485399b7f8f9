//! Timeout protection with explicit cancellation

use crate::utils::error::{EngineError, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Races an operation against a deadline
///
/// The operation receives a [`CancellationToken`]. When the deadline wins,
/// the token is cancelled before the operation future is dropped, so work
/// the operation spawned elsewhere can observe the cancellation and stop.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutWrapper {
    timeout: Duration,
}

impl TimeoutWrapper {
    /// Create a new timeout wrapper
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Configured deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute an operation with a fresh cancellation token
    pub async fn call<F, Fut, R>(&self, request_id: &str, f: F) -> Result<R>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        self.call_with_token(request_id, CancellationToken::new(), f)
            .await
    }

    /// Execute an operation with a caller-supplied cancellation token
    ///
    /// Cancelling `token` from outside aborts the wait with
    /// [`EngineError::Cancelled`].
    pub async fn call_with_token<F, Fut, R>(
        &self,
        request_id: &str,
        token: CancellationToken,
        f: F,
    ) -> Result<R>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let operation = f(token.clone());

        tokio::select! {
            biased;
            result = operation => result,
            _ = token.cancelled() => {
                Err(EngineError::cancelled(format!("operation {} cancelled", request_id)))
            }
            _ = tokio::time::sleep(self.timeout) => {
                token.cancel();
                debug!(request_id, timeout = ?self.timeout, "Operation timed out, cancellation signalled");
                Err(EngineError::timeout(request_id, self.timeout))
            }
        }
    }
}
