//! Trailing-window call accounting

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Timestamps of calls inside a sliding window
#[derive(Debug)]
pub(super) struct CallWindow {
    window: Duration,
    timestamps: VecDeque<Instant>,
}

impl CallWindow {
    pub(super) fn new(window: Duration) -> Self {
        Self {
            window,
            timestamps: VecDeque::new(),
        }
    }

    pub(super) fn record(&mut self, now: Instant) {
        self.evict(now);
        self.timestamps.push_back(now);
    }

    /// Calls within the window ending at `now`
    pub(super) fn count(&mut self, now: Instant) -> usize {
        self.evict(now);
        self.timestamps.len()
    }

    fn evict(&mut self, now: Instant) {
        while self
            .timestamps
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.window)
        {
            self.timestamps.pop_front();
        }
    }
}
