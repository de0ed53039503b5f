use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    aggregator::{BatchAggregator, OrderPriority},
    scheduler::BatchScheduler,
};

/// An order became ready for planning. Redeliveries of the same order are
/// expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub order_id: Uuid,
    #[serde(default)]
    pub priority: OrderPriority,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeStats {
    pub received: usize,
    pub accepted: usize,
    pub duplicates: usize,
}

/// Feeds order events into the aggregator, using the order id as the
/// idempotency key.
pub struct OrderIntake {
    aggregator: Arc<BatchAggregator>,
    scheduler: Option<Arc<BatchScheduler>>,
    stats: IntakeStats,
}

impl OrderIntake {
    pub fn new(aggregator: Arc<BatchAggregator>) -> Self {
        OrderIntake {
            aggregator,
            scheduler: None,
            stats: IntakeStats::default(),
        }
    }

    /// Urgent events wake this scheduler.
    pub fn with_scheduler(mut self, scheduler: Arc<BatchScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn stats(&self) -> IntakeStats {
        self.stats
    }

    /// Returns whether the event queued its order.
    pub fn handle(&mut self, event: OrderEvent) -> bool {
        self.stats.received += 1;

        if !self.aggregator.add(event.order_id, event.priority) {
            self.stats.duplicates += 1;
            debug!(order_id = %event.order_id, "Ignored redelivered order event");
            return false;
        }
        self.stats.accepted += 1;

        if event.priority == OrderPriority::Urgent {
            if let Some(scheduler) = &self.scheduler {
                scheduler.signal_urgent();
            }
        }
        true
    }

    /// Handles events until every sender is dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<OrderEvent>) -> IntakeStats {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }

        info!(
            received = self.stats.received,
            accepted = self.stats.accepted,
            duplicates = self.stats.duplicates,
            "Order intake closed"
        );
        self.stats
    }
}
