//! Error types for the engine

use crate::core::resource_resolver::types::ResourceType;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for the engine
///
/// A cache miss is not an error: lookups return `Option::None` instead.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid invalidation pattern
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A cache layer name that is not configured
    #[error("Unknown cache layer: {0}")]
    UnknownLayer(String),

    /// Capacity for a resource type stayed exhausted through every retry
    #[error("Allocation denied for {resource_type}: retry after {wait_time:?}")]
    AllocationDenied {
        resource_type: ResourceType,
        wait_time: Duration,
    },

    /// The wrapped operation did not settle before its deadline
    #[error("Operation {request_id} timed out after {timeout:?}")]
    OperationTimeout {
        request_id: String,
        timeout: Duration,
    },

    /// A dependency stayed unhealthy for the whole wait window
    #[error("Dependency {system_id} degraded (error rate {error_rate:.3})")]
    DependencyDegraded { system_id: String, error_rate: f64 },

    /// Remediation of a detected conflict failed; logged, never returned to callers
    #[error("Conflict remediation failed: {0}")]
    ConflictRemediation(String),

    /// System not registered with the coordinator
    #[error("System not found: {0}")]
    SystemNotFound(String),

    /// System id already registered
    #[error("System already registered: {0}")]
    SystemAlreadyRegistered(String),

    /// The wrapped operation itself failed
    #[error("Operation failed: {0}")]
    Operation(String),

    /// Work was abandoned before it could run
    #[error("Cancelled: {0}")]
    Cancelled(String),
}
