//! Conflict resolver configuration validators

use super::config_validators::validate_fraction;
use super::trait_def::Validate;
use crate::config::models::*;

impl Validate for AllocationStrategyConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("Allocation max_concurrent must be greater than 0".to_string());
        }

        if self.priority_weights.values().any(|w| *w <= 0.0) {
            return Err("Allocation priority weights must be positive".to_string());
        }

        Ok(())
    }
}

impl Validate for ResolverConfig {
    fn validate(&self) -> Result<(), String> {
        for (resource_type, strategy) in &self.strategies {
            strategy
                .validate()
                .map_err(|e| format!("{} strategy: {}", resource_type, e))?;
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err("Max delay must not be shorter than base delay".to_string());
        }

        validate_fraction("Database threshold", self.database_threshold)?;
        validate_fraction("Cache bytes threshold", self.cache_bytes_threshold)?;

        if self.api_calls_per_minute == 0 {
            return Err("API calls per minute must be greater than 0".to_string());
        }

        if self.monitor_interval_secs == 0 {
            return Err("Monitor interval must be greater than 0".to_string());
        }

        Ok(())
    }
}
