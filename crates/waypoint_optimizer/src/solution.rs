use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    problem::location::Location,
    solver::score::{Score, ScoreAnalysis},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Pickup,
    Delivery,
}

/// A scheduled visit. `sequence` starts at 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub order_id: Uuid,
    pub activity_type: ActivityType,
    pub lat: f64,
    pub lon: f64,
    pub arrival_time: Timestamp,
    pub end_time: Timestamp,
    pub sequence: u32,
}

impl Activity {
    pub fn location(&self) -> Location {
        Location::from_lat_lon(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub vehicle_id: Uuid,
    pub driver_id: Option<String>,
    pub start_time: Timestamp,
    pub activities: Vec<Activity>,
    pub total_distance_meters: f64,
    pub total_time_millis: i64,
}

impl Route {
    /// Orders served by the route, in visiting order and without repeats.
    pub fn included_order_ids(&self) -> Vec<Uuid> {
        let mut order_ids: Vec<Uuid> = Vec::with_capacity(self.activities.len());
        for activity in &self.activities {
            if !order_ids.contains(&activity.order_id) {
                order_ids.push(activity.order_id);
            }
        }
        order_ids
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnassignedReason {
    /// The filtered fleet was empty.
    NoVehicles,
    /// No vehicle has enough capacity left, or at all.
    CapacityExceeded,
    /// Every placement would break a detour or route duration limit.
    ConstraintViolation,
    /// The search was stopped before the order could be placed.
    SearchInterrupted,
}

impl UnassignedReason {
    /// Whether another run could still place the order.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UnassignedReason::NoVehicles | UnassignedReason::SearchInterrupted
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnassignedOrder {
    pub order_id: Uuid,
    pub reason: UnassignedReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationReason {
    /// No improving move was left.
    #[default]
    Converged,
    IterationLimit,
    TimeLimit,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct SolutionDiagnostics {
    /// Set when the run had orders but no vehicle to assign them to.
    pub no_fleet: bool,
    pub termination: TerminationReason,
    pub iterations: usize,
    pub score: Score,
    pub score_analysis: ScoreAnalysis,
}

/// Outcome of one planning run. Handed off as is: nothing in the solver keeps
/// a reference to it.
#[derive(Debug, Clone, Default)]
pub struct RoutingSolution {
    pub routes: Vec<Route>,
    pub unassigned: Vec<UnassignedOrder>,
    pub diagnostics: SolutionDiagnostics,
}

impl RoutingSolution {
    pub fn empty() -> Self {
        RoutingSolution::default()
    }

    pub fn assigned_order_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.routes
            .iter()
            .flat_map(|route| route.included_order_ids().into_iter())
    }

    pub fn route_for_vehicle(&self, vehicle_id: Uuid) -> Option<&Route> {
        self.routes.iter().find(|route| route.vehicle_id == vehicle_id)
    }

    pub fn total_distance_meters(&self) -> f64 {
        self.routes
            .iter()
            .map(|route| route.total_distance_meters)
            .sum()
    }
}
