//! Error types for the engine
//!
//! This module defines all error types used throughout the engine.

#![allow(missing_docs)]

mod helpers;
mod types;

pub use types::{EngineError, Result};
