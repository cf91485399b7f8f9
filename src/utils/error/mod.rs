//! Error handling for the engine
//!
//! This module contains the error taxonomy shared by the cache engine, the
//! coordinator and the conflict resolver, plus the timeout and backoff
//! primitives used to enforce it.

pub mod error;
pub mod recovery;

pub use error::{EngineError, Result};
pub use recovery::{BackoffStrategy, TimeoutWrapper};
