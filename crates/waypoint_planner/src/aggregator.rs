use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
};

use fxhash::FxHashSet;
use jiff::Timestamp;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPriority {
    Urgent,
    #[default]
    Normal,
    Low,
}

/// An order waiting for the next planning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub order_id: Uuid,
    pub priority: OrderPriority,
    pub enqueued_at: Timestamp,
}

impl BatchEntry {
    pub fn new(order_id: Uuid, priority: OrderPriority) -> Self {
        BatchEntry {
            order_id,
            priority,
            enqueued_at: Timestamp::now(),
        }
    }
}

#[derive(Default)]
struct AggregatorState {
    queue: VecDeque<BatchEntry>,
    pending: FxHashSet<Uuid>,
}

/// Thread-safe collection of orders awaiting optimization, in arrival order.
///
/// Every extraction happens under one lock, so an entry is returned by
/// exactly one poll. An order id can be pending at most once: adding it again
/// before it is polled is a no-op.
#[derive(Default)]
pub struct BatchAggregator {
    state: Mutex<AggregatorState>,
    len: AtomicUsize,
}

impl BatchAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an order. Returns `false` if it was already pending.
    pub fn add(&self, order_id: Uuid, priority: OrderPriority) -> bool {
        self.add_entry(BatchEntry::new(order_id, priority))
    }

    /// Queues an entry with its own metadata. Returns `false` if the order
    /// was already pending.
    pub fn add_entry(&self, entry: BatchEntry) -> bool {
        let mut state = self.state.lock();
        if !state.pending.insert(entry.order_id) {
            debug!(order_id = %entry.order_id, "Order already pending");
            return false;
        }

        debug!(order_id = %entry.order_id, priority = ?entry.priority, "Order queued");
        state.queue.push_back(entry);
        self.len.store(state.queue.len(), Ordering::Release);
        true
    }

    /// Removes and returns every queued order id.
    pub fn poll_and_clear(&self) -> Vec<Uuid> {
        self.drain()
            .into_iter()
            .map(|entry| entry.order_id)
            .collect()
    }

    /// Removes and returns every queued entry, oldest first.
    pub fn drain(&self) -> Vec<BatchEntry> {
        let mut state = self.state.lock();
        state.pending.clear();
        let entries: Vec<BatchEntry> = state.queue.drain(..).collect();
        self.len.store(0, Ordering::Release);
        drop(state);

        info!(count = entries.len(), "Polled batch");
        entries
    }

    /// Removes and returns the ids of queued orders with `priority`.
    pub fn poll_by_priority(&self, priority: OrderPriority) -> Vec<Uuid> {
        self.take_by_priority(priority)
            .into_iter()
            .map(|entry| entry.order_id)
            .collect()
    }

    /// Removes and returns the entries with `priority`, oldest first. Other
    /// entries stay in place with their metadata untouched.
    pub fn take_by_priority(&self, priority: OrderPriority) -> Vec<BatchEntry> {
        let mut state = self.state.lock();
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(state.queue.len());
        for entry in state.queue.drain(..) {
            if entry.priority == priority {
                taken.push(entry);
            } else {
                kept.push_back(entry);
            }
        }

        for entry in &taken {
            state.pending.remove(&entry.order_id);
        }
        state.queue = kept;
        self.len.store(state.queue.len(), Ordering::Release);
        drop(state);

        info!(count = taken.len(), ?priority, "Polled batch by priority");
        taken
    }

    /// Puts polled entries back in front of the queue, in their original
    /// order. Entries whose order was queued again in the meantime are
    /// dropped in favour of the newer entry.
    pub fn requeue(&self, entries: Vec<BatchEntry>) -> usize {
        let mut state = self.state.lock();
        let mut requeued = 0;
        for entry in entries.into_iter().rev() {
            if state.pending.insert(entry.order_id) {
                state.queue.push_front(entry);
                requeued += 1;
            }
        }
        self.len.store(state.queue.len(), Ordering::Release);
        drop(state);

        if requeued > 0 {
            info!(count = requeued, "Requeued orders");
        }
        requeued
    }

    /// Number of queued entries. Does not wait for writers.
    pub fn size(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn count_by_priority(&self, priority: OrderPriority) -> usize {
        self.state
            .lock()
            .queue
            .iter()
            .filter(|entry| entry.priority == priority)
            .count()
    }

    pub fn oldest_enqueue_time(&self) -> Option<Timestamp> {
        self.state
            .lock()
            .queue
            .iter()
            .map(|entry| entry.enqueued_at)
            .min()
    }

    /// Drops every pending entry and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.queue.len();
        state.queue.clear();
        state.pending.clear();
        self.len.store(0, Ordering::Release);
        drop(state);

        info!(count, "Cleared batch");
        count
    }
}
