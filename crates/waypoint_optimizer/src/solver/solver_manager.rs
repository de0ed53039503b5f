use fxhash::FxHashMap;
use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::PlanningError,
    problem::{optimization_profile::OptimizationProfile, order::Order, vehicle::Vehicle},
    solution::RoutingSolution,
};

use super::{engine::OptimizationEngine, stop_signal::StopSignal};

/// Keeps the cancellation handle of every running optimization by plan id,
/// so a run can be aborted by name.
#[derive(Default)]
pub struct SolverManager {
    running: RwLock<FxHashMap<Uuid, StopSignal>>,
}

impl SolverManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs an optimization under `plan_id` until it completes or is stopped.
    pub fn solve(
        &self,
        plan_id: Uuid,
        engine: &OptimizationEngine,
        orders: &[Order],
        fleet: &[Vehicle],
        profile: &OptimizationProfile,
    ) -> Result<RoutingSolution, PlanningError> {
        let signal = self.register(plan_id);
        let result = engine.calculate_routes_with(orders, fleet, profile, &signal);
        self.finish(plan_id);
        result
    }

    pub fn register(&self, plan_id: Uuid) -> StopSignal {
        let signal = StopSignal::new();
        self.running.write().insert(plan_id, signal.clone());
        debug!(%plan_id, "Registered optimization");
        signal
    }

    pub fn finish(&self, plan_id: Uuid) {
        self.running.write().remove(&plan_id);
    }

    /// Returns whether a run with this id was running.
    pub fn stop(&self, plan_id: Uuid) -> bool {
        match self.running.read().get(&plan_id) {
            Some(signal) => {
                info!(%plan_id, "Stopping optimization");
                signal.stop();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) -> usize {
        let running = self.running.read();
        for signal in running.values() {
            signal.stop();
        }
        running.len()
    }

    pub fn is_running(&self, plan_id: Uuid) -> bool {
        self.running.read().contains_key(&plan_id)
    }

    pub fn running(&self) -> Vec<Uuid> {
        let mut running: Vec<Uuid> = self.running.read().keys().copied().collect();
        running.sort();
        running
    }
}
