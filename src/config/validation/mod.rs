//! Configuration validation
//!
//! This module provides validation logic for all configuration structures.
//!
//! The validation is organized into several submodules:
//! - `trait_def`: Core Validate trait definition
//! - `config_validators`: Top-level engine and logging validators
//! - `cache_validators`: Cache layer and invalidation rule validators
//! - `coordinator_validators`: Coordinator and registered system validators
//! - `resolver_validators`: Allocation strategy and conflict threshold validators
//! - `tests`: Test suite for all validators

mod cache_validators;
mod config_validators;
mod coordinator_validators;
mod resolver_validators;
mod trait_def;

pub use trait_def::Validate;
