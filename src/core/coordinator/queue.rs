//! Admission control
//!
//! Each system owns a slot: its registration, health and a binary heap of
//! waiting requests ordered by priority (highest first), then enqueue order.
//! Execution slots are held through [`ActiveOpGuard`]; dropping one frees the
//! slot and hands it straight to the next waiter.

use super::types::{RegisteredSystem, SystemHealth};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

pub(crate) type Slot = Arc<Mutex<SystemState>>;

/// A request waiting for an execution slot
#[derive(Debug)]
pub(crate) struct QueuedRequest {
    pub request_id: String,
    pub priority: u8,
    pub enqueued_at: Instant,
    seq: u64,
    dispatch: oneshot::Sender<ActiveOpGuard>,
}

impl PartialEq for QueuedRequest {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedRequest {}

impl PartialOrd for QueuedRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then earlier sequence
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub(crate) struct RequestQueue {
    heap: BinaryHeap<QueuedRequest>,
    next_seq: u64,
}

impl RequestQueue {
    pub fn push(
        &mut self,
        request_id: String,
        priority: u8,
    ) -> oneshot::Receiver<ActiveOpGuard> {
        let (dispatch, receiver) = oneshot::channel();
        self.heap.push(QueuedRequest {
            request_id,
            priority,
            enqueued_at: Instant::now(),
            seq: self.next_seq,
            dispatch,
        });
        self.next_seq += 1;
        receiver
    }

    pub fn pop(&mut self) -> Option<QueuedRequest> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Drop waiters whose callers abandoned their futures; returns how many
    pub fn purge_closed(&mut self) -> usize {
        let before = self.heap.len();
        self.heap.retain(|r| !r.dispatch.is_closed());
        before - self.heap.len()
    }

    /// Remove every waiter; their receivers observe a closed channel
    pub fn clear(&mut self) -> usize {
        let count = self.heap.len();
        self.heap.clear();
        count
    }
}

/// Mutable state of one registered system
#[derive(Debug)]
pub(crate) struct SystemState {
    pub system: RegisteredSystem,
    pub health: SystemHealth,
    pub queue: RequestQueue,
}

impl SystemState {
    pub fn new(system: RegisteredSystem) -> Self {
        Self {
            system,
            health: SystemHealth::default(),
            queue: RequestQueue::default(),
        }
    }

    /// Health with abandoned waiters no longer counted as queued
    pub fn current_health(&mut self) -> SystemHealth {
        if self.queue.purge_closed() > 0 {
            self.health.queued_ops = self.queue.len();
        }
        self.health.clone()
    }

    /// Take a slot immediately if one is free
    pub fn try_acquire(&mut self, slot: &Slot) -> Option<ActiveOpGuard> {
        if self.health.active_ops < self.system.max_concurrent_ops {
            self.health.active_ops += 1;
            Some(ActiveOpGuard::new(slot.clone()))
        } else {
            None
        }
    }

    pub fn enqueue(&mut self, request_id: String, priority: u8) -> oneshot::Receiver<ActiveOpGuard> {
        let receiver = self.queue.push(request_id, priority);
        self.health.queued_ops = self.queue.len();
        receiver
    }

    /// Hand free slots to waiters in priority order; returns how many were dispatched
    pub fn dispatch(&mut self, slot: &Slot) -> usize {
        let mut dispatched = 0;
        while self.health.active_ops < self.system.max_concurrent_ops {
            let Some(request) = self.queue.pop() else {
                break;
            };
            self.health.active_ops += 1;
            match request.dispatch.send(ActiveOpGuard::new(slot.clone())) {
                Ok(()) => {
                    dispatched += 1;
                    debug!(
                        system_id = %self.system.id,
                        request_id = %request.request_id,
                        priority = request.priority,
                        waited = ?request.enqueued_at.elapsed(),
                        "Dispatched queued request"
                    );
                }
                Err(mut guard) => {
                    // Waiter gave up; the lock is held, so release by hand
                    guard.disarm();
                    self.health.active_ops -= 1;
                }
            }
        }
        self.health.queued_ops = self.queue.len();
        dispatched
    }
}

/// An occupied execution slot
#[derive(Debug)]
pub(crate) struct ActiveOpGuard {
    slot: Slot,
    armed: bool,
}

impl ActiveOpGuard {
    fn new(slot: Slot) -> Self {
        Self { slot, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ActiveOpGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let slot = self.slot.clone();
        let mut state = slot.lock();
        state.health.active_ops = state.health.active_ops.saturating_sub(1);
        state.dispatch(&slot);
    }
}
