//! Cache configuration validators

use super::config_validators::{validate_alpha, validate_fraction};
use super::trait_def::Validate;
use crate::config::models::*;
use std::collections::HashSet;

impl Validate for CacheLayerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Cache layer name cannot be empty".to_string());
        }

        if self.max_entries == 0 {
            return Err(format!(
                "Cache layer '{}' max_entries must be greater than 0",
                self.name
            ));
        }

        if self.max_bytes == 0 {
            return Err(format!(
                "Cache layer '{}' max_bytes must be greater than 0",
                self.name
            ));
        }

        if self.default_ttl_secs == 0 {
            return Err(format!(
                "Cache layer '{}' default TTL must be greater than 0",
                self.name
            ));
        }

        Ok(())
    }
}

impl Validate for InvalidationRuleConfig {
    fn validate(&self) -> Result<(), String> {
        if self.pattern.is_empty() {
            return Err("Invalidation rule pattern cannot be empty".to_string());
        }

        if self.events.is_empty() {
            return Err(format!(
                "Invalidation rule '{}' must list at least one event",
                self.pattern
            ));
        }

        if self.regex {
            regex::Regex::new(&self.pattern)
                .map_err(|e| format!("Invalid invalidation regex '{}': {}", self.pattern, e))?;
        }

        Ok(())
    }
}

impl Validate for CacheConfig {
    fn validate(&self) -> Result<(), String> {
        if self.layers.is_empty() {
            return Err("At least one cache layer must be configured".to_string());
        }

        let mut names = HashSet::new();
        for layer in &self.layers {
            if !names.insert(layer.name.as_str()) {
                return Err(format!("Duplicate cache layer name: {}", layer.name));
            }
            layer.validate()?;
        }

        if self.promotion_threshold == 0 {
            return Err("Promotion threshold must be greater than 0".to_string());
        }

        if self.expire_interval_secs == 0
            || self.low_value_interval_secs == 0
            || self.rebalance_interval_secs == 0
        {
            return Err("Cache maintenance intervals must be greater than 0".to_string());
        }

        validate_alpha("Cache response_time_alpha", self.response_time_alpha)?;
        validate_fraction("Cache pressure_relief_ratio", self.pressure_relief_ratio)?;

        for rule in &self.invalidation_rules {
            rule.validate()?;
        }

        Ok(())
    }
}
