//! Core engine services
//!
//! The layered cache, the coordinator that admits work per system, and the
//! resolver that allocates contended resources and remediates conflicts.

pub mod cache_manager;
pub mod coordinator;
pub mod resource_resolver;
