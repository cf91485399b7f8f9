//! Top-level configuration validators

use super::trait_def::Validate;
use crate::config::models::*;
use tracing::debug;

impl Validate for EngineConfig {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating engine configuration");

        self.cache.validate()?;
        self.coordinator.validate()?;
        self.resolver.validate()?;

        Ok(())
    }
}

pub(super) fn validate_alpha(name: &str, alpha: f64) -> Result<(), String> {
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(format!("{} must be in (0, 1], got {}", name, alpha));
    }
    Ok(())
}

pub(super) fn validate_fraction(name: &str, value: f64) -> Result<(), String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{} must be between 0 and 1, got {}", name, value));
    }
    Ok(())
}
