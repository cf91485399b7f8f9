//! Configuration management for the engine
//!
//! This module handles loading, validation, and management of all engine configuration.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{EngineError, Result};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the engine
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Engine configuration
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_yaml_str(&content)?;
        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let engine: EngineConfig = serde_yaml::from_str(content)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        let config = Self { engine };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let engine = EngineConfig::from_env()?;
        let config = Self { engine };

        config.validate()?;
        Ok(config)
    }

    /// Get cache configuration
    pub fn cache(&self) -> &CacheConfig {
        &self.engine.cache
    }

    /// Get coordinator configuration
    pub fn coordinator(&self) -> &CoordinatorConfig {
        &self.engine.coordinator
    }

    /// Get resolver configuration
    pub fn resolver(&self) -> &ResolverConfig {
        &self.engine.resolver
    }

    /// Get logging configuration
    pub fn logging(&self) -> &LoggingConfig {
        &self.engine.logging
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.engine
            .cache
            .validate()
            .map_err(|e| EngineError::Config(format!("Cache config error: {}", e)))?;

        self.engine
            .coordinator
            .validate()
            .map_err(|e| EngineError::Config(format!("Coordinator config error: {}", e)))?;

        self.engine
            .resolver
            .validate()
            .map_err(|e| EngineError::Config(format!("Resolver config error: {}", e)))?;

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.engine)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config to YAML: {}", e)))
    }
}
