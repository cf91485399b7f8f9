//! Pluggable entry size estimation

use serde::Serialize;

/// Estimated footprint of a cached value in bytes
pub trait SizeEstimator<V>: Send + Sync {
    fn estimate(&self, value: &V) -> u64;
}

/// Estimates size from the value's JSON encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSizeEstimator;

impl JsonSizeEstimator {
    /// Used when a value fails to serialize
    pub const FALLBACK_SIZE: u64 = 1024;
}

impl<V: Serialize> SizeEstimator<V> for JsonSizeEstimator {
    fn estimate(&self, value: &V) -> u64 {
        serde_json::to_vec(value)
            .map(|bytes| bytes.len() as u64)
            .unwrap_or(Self::FALLBACK_SIZE)
    }
}

/// Charges the same size for every value
#[derive(Debug, Clone, Copy)]
pub struct FixedSizeEstimator(pub u64);

impl<V> SizeEstimator<V> for FixedSizeEstimator {
    fn estimate(&self, _value: &V) -> u64 {
        self.0
    }
}
