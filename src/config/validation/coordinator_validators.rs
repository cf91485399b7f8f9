//! Coordinator configuration validators

use super::config_validators::{validate_alpha, validate_fraction};
use super::trait_def::Validate;
use crate::config::models::*;
use std::collections::HashSet;

impl Validate for SystemConfig {
    fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("System id cannot be empty".to_string());
        }

        if !(1..=10).contains(&self.priority) {
            return Err(format!(
                "System '{}' priority must be between 1 and 10, got {}",
                self.id, self.priority
            ));
        }

        if self.max_concurrent_ops == 0 {
            return Err(format!(
                "System '{}' max_concurrent_ops must be greater than 0",
                self.id
            ));
        }

        if self.depends_on.iter().any(|d| d == &self.id) {
            return Err(format!("System '{}' cannot depend on itself", self.id));
        }

        Ok(())
    }
}

impl Validate for CoordinatorConfig {
    fn validate(&self) -> Result<(), String> {
        if self.global_active_ops_threshold == 0 {
            return Err("Global active operations threshold must be greater than 0".to_string());
        }

        validate_fraction("Dependency error threshold", self.dependency_error_threshold)?;
        validate_fraction("Alert error rate", self.alert_error_rate)?;
        validate_alpha("Coordinator ema_alpha", self.ema_alpha)?;

        if self.timing_threshold_ms <= 0.0 || self.alert_response_time_ms <= 0.0 {
            return Err("Response time thresholds must be greater than 0".to_string());
        }

        if self.dependency_poll_interval_ms == 0 {
            return Err("Dependency poll interval must be greater than 0".to_string());
        }

        if self.alert_interval_secs == 0
            || self.cache_expiry_interval_secs == 0
            || self.dispatch_interval_secs == 0
        {
            return Err("Coordination loop intervals must be greater than 0".to_string());
        }

        if self.default_timeout_ms == 0 {
            return Err("Default operation timeout must be greater than 0".to_string());
        }

        let mut ids = HashSet::new();
        for system in &self.systems {
            if !ids.insert(system.id.as_str()) {
                return Err(format!("Duplicate system id: {}", system.id));
            }
            system.validate()?;
        }

        Ok(())
    }
}
