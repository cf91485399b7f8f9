//! Helper functions for creating and classifying errors

use super::types::EngineError;
use crate::core::resource_resolver::types::ResourceType;
use std::time::Duration;

/// Helper functions for creating specific errors
impl EngineError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn operation<S: Into<String>>(message: S) -> Self {
        Self::Operation(message.into())
    }

    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::Cancelled(message.into())
    }

    pub fn remediation<S: Into<String>>(message: S) -> Self {
        Self::ConflictRemediation(message.into())
    }

    pub fn system_not_found<S: Into<String>>(system_id: S) -> Self {
        Self::SystemNotFound(system_id.into())
    }

    pub fn allocation_denied(resource_type: ResourceType, wait_time: Duration) -> Self {
        Self::AllocationDenied {
            resource_type,
            wait_time,
        }
    }

    pub fn timeout<S: Into<String>>(request_id: S, timeout: Duration) -> Self {
        Self::OperationTimeout {
            request_id: request_id.into(),
            timeout,
        }
    }

    /// Whether the caller may reasonably try the same work again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AllocationDenied { .. }
                | Self::OperationTimeout { .. }
                | Self::DependencyDegraded { .. }
        )
    }

    /// Whether the error signals exhausted capacity rather than a fault
    pub fn is_capacity_error(&self) -> bool {
        matches!(self, Self::AllocationDenied { .. })
    }

    /// Suggested wait before retrying, when the error carries one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::AllocationDenied { wait_time, .. } => Some(*wait_time),
            _ => None,
        }
    }
}
