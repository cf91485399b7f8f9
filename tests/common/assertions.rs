//! Custom test assertions

use tiercoord::{EngineError, Result};

/// Assert two values are approximately equal (for floats)
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr) => {
        $crate::assert_approx_eq!($left, $right, 1e-6_f64)
    };
    ($left:expr, $right:expr, $epsilon:expr) => {
        let left_val: f64 = $left as f64;
        let right_val: f64 = $right as f64;
        let diff = (left_val - right_val).abs();
        assert!(
            diff < $epsilon,
            "assertion failed: `(left ~= right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` (epsilon: `{:?}`)",
            left_val,
            right_val,
            diff,
            $epsilon
        );
    };
}

/// Assertions on engine results
pub trait EngineResultAssertions {
    /// Assert the result failed with a timeout
    fn assert_timed_out(&self);

    /// Assert the result failed because the caller was cancelled
    fn assert_cancelled(&self);
}

impl<T: std::fmt::Debug> EngineResultAssertions for Result<T> {
    fn assert_timed_out(&self) {
        assert!(
            matches!(self, Err(EngineError::OperationTimeout { .. })),
            "Expected an operation timeout, got {:?}",
            self
        );
    }

    fn assert_cancelled(&self) {
        assert!(
            matches!(self, Err(EngineError::Cancelled(_))),
            "Expected a cancellation, got {:?}",
            self
        );
    }
}
