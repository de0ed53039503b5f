use std::{sync::Arc, time::Duration};

use fxhash::FxHashSet;
use jiff::{Timestamp, tz::TimeZone};
use parking_lot::RwLock;
use tokio::{
    sync::{Notify, watch},
    time::Instant,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use waypoint_optimizer::{
    error::PlanningError,
    problem::{optimization_profile::OptimizationProfile, order::Order},
    solver::{engine::OptimizationEngine, solver_manager::SolverManager},
};

use crate::{
    aggregator::{BatchAggregator, BatchEntry, OrderPriority},
    config::{AutoPlanConfig, PlannerConfig},
    error::ConfigError,
    events::RoutePlan,
    fleet_filter::FleetFilter,
    sources::{
        ComplianceRegistry, FleetDataSource, OptimizationProfileSource, OrderDataSource,
        PlanPublisher, VehicleProfileRegistry,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Collecting,
    Optimizing,
    Publishing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The configured schedule fired.
    Scheduled,
    /// An urgent order arrived. Only urgent orders are planned.
    Urgent,
    Manual,
    /// The oldest queued order waited longer than the configured maximum.
    Emergency,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Disabled,
    NothingQueued,
    BelowMinBatch { queued: usize, min: usize },
    OrdersUnavailable(String),
    FleetUnavailable(String),
    NoVehicles,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Published {
        plan_ids: Vec<Uuid>,
        routes: usize,
        unassigned: usize,
    },
    Rejected(PlanningError),
}

/// Collaborators the scheduler reads from and publishes to.
#[derive(Clone)]
pub struct Collaborators {
    pub orders: Arc<dyn OrderDataSource>,
    pub fleet: Arc<dyn FleetDataSource>,
    pub compliance: Arc<dyn ComplianceRegistry>,
    pub vehicle_profiles: Arc<dyn VehicleProfileRegistry>,
    pub profiles: Arc<dyn OptimizationProfileSource>,
    pub publisher: Arc<dyn PlanPublisher>,
}

enum BatchOutcome {
    Published {
        plan_id: Uuid,
        routes: usize,
        unassigned: usize,
    },
    Skipped(SkipReason),
    Rejected(PlanningError),
}

/// Drains the aggregator on triggers, plans the drained orders and
/// publishes the result.
///
/// Orders drained by a cycle that does not produce a plan go back to the
/// aggregator, in front of anything queued meanwhile.
pub struct BatchScheduler {
    config: AutoPlanConfig,
    time_zone: TimeZone,
    require_insurance: bool,
    aggregator: Arc<BatchAggregator>,
    collaborators: Collaborators,
    engine: OptimizationEngine,
    solver_manager: SolverManager,
    state: RwLock<SchedulerState>,
    urgent: Notify,
}

impl BatchScheduler {
    pub fn new(
        config: &PlannerConfig,
        aggregator: Arc<BatchAggregator>,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let engine = OptimizationEngine::new(config.solver.solver_params())
            .map_err(|error| ConfigError::Invalid(error.to_string()))?;

        Ok(BatchScheduler {
            time_zone: config.auto_plan.resolve_time_zone()?,
            config: config.auto_plan.clone(),
            require_insurance: config.fleet.require_insurance,
            aggregator,
            collaborators,
            engine,
            solver_manager: SolverManager::new(),
            state: RwLock::new(SchedulerState::Idle),
            urgent: Notify::new(),
        })
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.read()
    }

    pub fn aggregator(&self) -> &Arc<BatchAggregator> {
        &self.aggregator
    }

    pub fn solver_manager(&self) -> &SolverManager {
        &self.solver_manager
    }

    fn set_state(&self, state: SchedulerState) {
        debug!(?state, "Scheduler state");
        *self.state.write() = state;
    }

    /// Wakes the run loop for an urgent cycle when urgent re-optimization is
    /// enabled. Returns whether a cycle was requested.
    pub fn signal_urgent(&self) -> bool {
        if !self.config.urgent_auto_reoptimize {
            return false;
        }
        self.urgent.notify_one();
        true
    }

    /// Stops every running optimization. Each returns its best solution so
    /// far, which is still published.
    pub fn abort(&self) -> usize {
        let stopped = self.solver_manager.stop_all();
        if stopped > 0 {
            warn!(stopped, "Aborted running optimizations");
        }
        stopped
    }

    /// Whether the oldest queued order waited longer than the maximum batch
    /// age.
    pub fn is_stale(&self, now: Timestamp) -> bool {
        self.aggregator
            .oldest_enqueue_time()
            .is_some_and(|oldest| oldest + self.config.max_batch_age <= now)
    }

    /// Runs one collect, optimize and publish cycle. Blocks while the
    /// optimization runs.
    #[instrument(skip(self), level = "info")]
    pub fn run_cycle(&self, trigger: Trigger) -> CycleOutcome {
        let outcome = self.collect_and_plan(trigger);
        self.set_state(SchedulerState::Idle);

        match &outcome {
            CycleOutcome::Skipped(reason) => info!(?reason, "Skipped planning cycle"),
            CycleOutcome::Published {
                plan_ids,
                routes,
                unassigned,
            } => info!(plans = plan_ids.len(), routes, unassigned, "Published plans"),
            CycleOutcome::Rejected(error) => error!(%error, "Planning input rejected"),
        }
        outcome
    }

    fn collect_and_plan(&self, trigger: Trigger) -> CycleOutcome {
        if trigger == Trigger::Scheduled && !self.config.enabled {
            return CycleOutcome::Skipped(SkipReason::Disabled);
        }

        self.set_state(SchedulerState::Collecting);

        let queued = match trigger {
            Trigger::Urgent => self.aggregator.count_by_priority(OrderPriority::Urgent),
            _ => self.aggregator.size(),
        };
        if queued == 0 {
            return CycleOutcome::Skipped(SkipReason::NothingQueued);
        }
        if trigger == Trigger::Scheduled && queued < self.config.min_batch_size {
            return CycleOutcome::Skipped(SkipReason::BelowMinBatch {
                queued,
                min: self.config.min_batch_size,
            });
        }

        let entries = match trigger {
            Trigger::Urgent => self.aggregator.take_by_priority(OrderPriority::Urgent),
            _ => self.aggregator.drain(),
        };
        if entries.is_empty() {
            return CycleOutcome::Skipped(SkipReason::NothingQueued);
        }

        let profile = self.resolve_profile();
        let mut used_vehicles = FxHashSet::default();
        let mut plan_ids = Vec::new();
        let mut routes = 0;
        let mut unassigned = 0;

        let chunks: Vec<&[BatchEntry]> = entries.chunks(self.config.max_batch_size).collect();
        if chunks.len() > 1 {
            info!(
                orders = entries.len(),
                chunks = chunks.len(),
                "Splitting batch into chunks"
            );
        }

        for (index, chunk) in chunks.iter().enumerate() {
            let failure = match self.plan_batch(chunk, &profile, &mut used_vehicles) {
                BatchOutcome::Published {
                    plan_id,
                    routes: chunk_routes,
                    unassigned: chunk_unassigned,
                } => {
                    plan_ids.push(plan_id);
                    routes += chunk_routes;
                    unassigned += chunk_unassigned;
                    continue;
                }
                BatchOutcome::Skipped(reason) => CycleOutcome::Skipped(reason),
                BatchOutcome::Rejected(error) => CycleOutcome::Rejected(error),
            };

            let remaining: Vec<BatchEntry> = chunks[index..].concat();
            self.aggregator.requeue(remaining);

            if plan_ids.is_empty() {
                return failure;
            }
            warn!(?failure, "Planning stopped before the last chunk");
            break;
        }

        CycleOutcome::Published {
            plan_ids,
            routes,
            unassigned,
        }
    }

    fn resolve_profile(&self) -> OptimizationProfile {
        match self
            .collaborators
            .profiles
            .profile(&self.config.default_profile)
        {
            Ok(profile) => profile,
            Err(error) => {
                warn!(%error, code = %self.config.default_profile, "Falling back to default profile");
                self.config.fallback_profile()
            }
        }
    }

    /// Plans one chunk. The chunk is requeued by the caller unless it was
    /// published.
    ///
    /// Vehicles routed by an earlier chunk of the same cycle are withheld, so
    /// a vehicle carries at most one route per cycle.
    fn plan_batch(
        &self,
        entries: &[BatchEntry],
        profile: &OptimizationProfile,
        used_vehicles: &mut FxHashSet<Uuid>,
    ) -> BatchOutcome {
        let order_ids: Vec<Uuid> = entries.iter().map(|entry| entry.order_id).collect();

        let orders = match self.collaborators.orders.fetch_orders(&order_ids) {
            Ok(orders) if !orders.is_empty() => orders,
            Ok(_) => {
                warn!(
                    requested = order_ids.len(),
                    "Order data returned nothing, skipping cycle in degraded mode"
                );
                return BatchOutcome::Skipped(SkipReason::OrdersUnavailable(String::from(
                    "no order data returned",
                )));
            }
            Err(error) => {
                warn!(%error, "Order data unavailable, skipping cycle in degraded mode");
                return BatchOutcome::Skipped(SkipReason::OrdersUnavailable(error.to_string()));
            }
        };
        log_missing_orders(&order_ids, &orders);

        let candidates = self
            .collaborators
            .fleet
            .candidate_vehicle_ids()
            .and_then(|ids| self.collaborators.fleet.fetch_vehicles(&ids));
        let candidates = match candidates {
            Ok(candidates) => candidates,
            Err(error) => {
                warn!(%error, "Fleet data unavailable, skipping cycle in degraded mode");
                return BatchOutcome::Skipped(SkipReason::FleetUnavailable(error.to_string()));
            }
        };

        let fleet = FleetFilter::for_profile(self.require_insurance, profile).filter(
            &candidates,
            self.collaborators.compliance.as_ref(),
            self.collaborators.vehicle_profiles.as_ref(),
        );
        let mut vehicles = fleet.vehicles;
        if !used_vehicles.is_empty() {
            vehicles.retain(|vehicle| !used_vehicles.contains(&vehicle.id()));
            debug!(
                withheld = used_vehicles.len(),
                remaining = vehicles.len(),
                "Withholding vehicles routed earlier in this cycle"
            );
        }
        if vehicles.is_empty() {
            warn!(
                candidates = candidates.len(),
                "No eligible vehicle, keeping orders queued"
            );
            return BatchOutcome::Skipped(SkipReason::NoVehicles);
        }

        self.set_state(SchedulerState::Optimizing);
        let plan_id = Uuid::new_v4();
        let solution =
            match self
                .solver_manager
                .solve(plan_id, &self.engine, &orders, &vehicles, profile)
            {
                Ok(solution) => solution,
                Err(error) => return BatchOutcome::Rejected(error),
            };

        used_vehicles.extend(
            solution
                .routes
                .iter()
                .filter(|route| !route.activities.is_empty())
                .map(|route| route.vehicle_id),
        );

        let retry: FxHashSet<Uuid> = solution
            .unassigned
            .iter()
            .filter(|unassigned| unassigned.reason.is_retryable())
            .map(|unassigned| unassigned.order_id)
            .collect();
        if !retry.is_empty() {
            let retry_entries: Vec<BatchEntry> = entries
                .iter()
                .filter(|entry| retry.contains(&entry.order_id))
                .cloned()
                .collect();
            self.aggregator.requeue(retry_entries);
        }

        self.set_state(SchedulerState::Publishing);
        let plan = RoutePlan::new(plan_id, solution);
        let routes = plan.solution.routes.len();
        let unassigned = plan.solution.unassigned.len();
        self.collaborators.publisher.publish(&plan);

        BatchOutcome::Published {
            plan_id,
            routes,
            unassigned,
        }
    }

    /// Runs cycles on schedule, on urgent signals and for stale batches until
    /// `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let stale_every = Duration::try_from(self.config.stale_check_interval)
            .unwrap_or(Duration::from_secs(3600));
        let mut stale_check = tokio::time::interval(stale_every);
        stale_check.tick().await;

        let mut next_scheduled = self.next_scheduled_instant();

        info!("Batch scheduler started");
        loop {
            let trigger = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = tokio::time::sleep_until(next_scheduled) => {
                    next_scheduled = self.next_scheduled_instant();
                    Trigger::Scheduled
                }
                _ = self.urgent.notified() => Trigger::Urgent,
                _ = stale_check.tick() => {
                    if !self.is_stale(Timestamp::now()) {
                        continue;
                    }
                    warn!("Oldest queued order exceeded the maximum batch age");
                    Trigger::Emergency
                }
            };

            let scheduler = Arc::clone(&self);
            let mut cycle = tokio::task::spawn_blocking(move || scheduler.run_cycle(trigger));

            let result = tokio::select! {
                result = &mut cycle => result,
                _ = shutdown.changed() => {
                    self.abort();
                    cycle.await
                }
            };
            if let Err(error) = result {
                error!(%error, "Planning cycle panicked");
            }

            if *shutdown.borrow() {
                break;
            }
        }
        info!("Batch scheduler stopped");
    }

    /// Deadline of the next scheduled cycle. Kept across loop passes so that
    /// urgent and stale-check wake-ups do not push it back.
    fn next_scheduled_instant(&self) -> Instant {
        let wait = self
            .config
            .schedule
            .duration_until_next(Timestamp::now(), &self.time_zone);
        Instant::now() + wait
    }
}

fn log_missing_orders(requested: &[Uuid], orders: &[Order]) {
    if orders.len() == requested.len() {
        return;
    }

    let found: FxHashSet<Uuid> = orders.iter().map(Order::id).collect();
    for order_id in requested.iter().filter(|id| !found.contains(id)) {
        warn!(%order_id, "Queued order unknown to the order service, dropping it");
    }
}
