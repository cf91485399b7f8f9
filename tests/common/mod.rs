//! Common test utilities for tiercoord
//!
//! # Usage
//!
//! ```rust
//! use crate::common::fixtures::ConfigFactory;
//!
//! let cache = ConfigFactory::two_layer_cache(10, 10);
//! ```

pub mod assertions;
pub mod fixtures;

// Re-export commonly used items
pub use fixtures::{ConfigFactory, settle};
