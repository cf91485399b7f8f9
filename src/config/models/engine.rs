//! Top-level engine configuration

use super::*;
use crate::utils::error::{EngineError, Result};
use crate::utils::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for the cache engine, coordinator and resolver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Defaults overridden by `TIERCOORD_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(level) = env_var("TIERCOORD_LOG_LEVEL") {
            config.logging.level = level.parse::<LogLevel>()?;
        }
        if let Some(json) = env_var("TIERCOORD_LOG_JSON") {
            config.logging.json = parse_env("TIERCOORD_LOG_JSON", &json)?;
        }
        if let Some(v) = env_var("TIERCOORD_GLOBAL_ACTIVE_OPS") {
            config.coordinator.global_active_ops_threshold =
                parse_env("TIERCOORD_GLOBAL_ACTIVE_OPS", &v)?;
        }
        if let Some(v) = env_var("TIERCOORD_DEFAULT_TIMEOUT_MS") {
            config.coordinator.default_timeout_ms = parse_env("TIERCOORD_DEFAULT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = env_var("TIERCOORD_API_CALLS_PER_MINUTE") {
            config.resolver.api_calls_per_minute =
                parse_env("TIERCOORD_API_CALLS_PER_MINUTE", &v)?;
        }
        if let Some(v) = env_var("TIERCOORD_MONITOR_INTERVAL_SECS") {
            config.resolver.monitor_interval_secs =
                parse_env("TIERCOORD_MONITOR_INTERVAL_SECS", &v)?;
        }

        Ok(config)
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::config(format!("Invalid value for {}: {}", name, value)))
}
