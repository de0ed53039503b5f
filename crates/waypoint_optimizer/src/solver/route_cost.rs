use jiff::{SignedDuration, Timestamp};

use crate::problem::{
    activity_id::ActivityId, meters::Meters, vehicle::VehicleIdx,
    vehicle_routing_problem::VehicleRoutingProblem,
};

use super::score::{Score, ScoreAnalysis};

pub const CAPACITY_CONSTRAINT: &str = "capacity";
pub const DETOUR_CONSTRAINT: &str = "detour_limit";
pub const ROUTE_DURATION_CONSTRAINT: &str = "max_route_duration";
pub const DISTANCE_CONSTRAINT: &str = "distance";
pub const LATENESS_CONSTRAINT: &str = "lateness";
pub const UNASSIGNED_CONSTRAINT: &str = "unassigned";

/// Totals of one vehicle route, evaluated from the route start. Routes end
/// at their last stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteCost {
    pub distance: Meters,
    pub duration: SignedDuration,
    pub lateness: SignedDuration,
    pub weight: f64,
    pub volume: f64,
    pub score: Score,
}

impl RouteCost {
    pub const EMPTY: RouteCost = RouteCost {
        distance: Meters::ZERO,
        duration: SignedDuration::ZERO,
        lateness: SignedDuration::ZERO,
        weight: 0.0,
        volume: 0.0,
        score: Score::ZERO,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledActivity {
    pub activity_id: ActivityId,
    pub arrival: Timestamp,
    pub service_start: Timestamp,
    pub end: Timestamp,
}

pub fn evaluate_route(
    problem: &VehicleRoutingProblem,
    vehicle_id: VehicleIdx,
    activities: &[ActivityId],
) -> RouteCost {
    walk_route(problem, vehicle_id, activities, |_| {})
}

pub fn schedule_route(
    problem: &VehicleRoutingProblem,
    vehicle_id: VehicleIdx,
    activities: &[ActivityId],
) -> (RouteCost, Vec<ScheduledActivity>) {
    let mut schedule = Vec::with_capacity(activities.len());
    let cost = walk_route(problem, vehicle_id, activities, |activity| {
        schedule.push(activity)
    });
    (cost, schedule)
}

/// Constraint breakdown of a route, for diagnostics.
pub fn analyze_route(
    problem: &VehicleRoutingProblem,
    vehicle_id: VehicleIdx,
    cost: &RouteCost,
    analysis: &mut ScoreAnalysis,
) {
    let components = cost_components(problem, vehicle_id, cost);
    analysis.add(CAPACITY_CONSTRAINT, Score::hard(components.capacity));
    analysis.add(DETOUR_CONSTRAINT, Score::hard(components.detour));
    analysis.add(ROUTE_DURATION_CONSTRAINT, Score::hard(components.duration));
    analysis.add(DISTANCE_CONSTRAINT, Score::soft(components.distance));
    analysis.add(LATENESS_CONSTRAINT, Score::soft(components.lateness));
}

fn walk_route<F>(
    problem: &VehicleRoutingProblem,
    vehicle_id: VehicleIdx,
    activities: &[ActivityId],
    mut on_activity: F,
) -> RouteCost
where
    F: FnMut(ScheduledActivity),
{
    if activities.is_empty() {
        return RouteCost::EMPTY;
    }

    let start = problem.start_time();
    let mut current_location = problem.vehicle_start_location_id(vehicle_id);
    let mut current_time = start;

    let mut distance = Meters::ZERO;
    let mut lateness = SignedDuration::ZERO;
    let mut weight = 0.0;
    let mut volume = 0.0;

    for &activity_id in activities {
        let location = problem.activity_location_id(activity_id);
        distance += problem.travel_distance(current_location, location);
        let arrival = current_time + problem.travel_time(current_location, location);

        let (service_start, late) = match problem.time_window(activity_id) {
            Some(time_window) => {
                let service_start = time_window.service_start(arrival);
                (service_start, time_window.lateness(service_start))
            }
            None => (arrival, SignedDuration::ZERO),
        };
        lateness += late;

        let end = service_start + problem.service_duration();

        if let ActivityId::Delivery(order_id) = activity_id {
            let order = problem.order(order_id);
            weight += order.weight();
            volume += order.volume();
        }

        on_activity(ScheduledActivity {
            activity_id,
            arrival,
            service_start,
            end,
        });

        current_location = location;
        current_time = end;
    }

    let mut cost = RouteCost {
        distance,
        duration: current_time.duration_since(start),
        lateness,
        weight,
        volume,
        score: Score::ZERO,
    };

    let components = cost_components(problem, vehicle_id, &cost);
    cost.score = components.score();
    cost
}

struct CostComponents {
    capacity: f64,
    detour: f64,
    duration: f64,
    distance: f64,
    lateness: f64,
}

impl CostComponents {
    fn score(&self) -> Score {
        Score::new(
            self.capacity + self.detour + self.duration,
            self.distance + self.lateness,
        )
    }
}

fn cost_components(
    problem: &VehicleRoutingProblem,
    vehicle_id: VehicleIdx,
    cost: &RouteCost,
) -> CostComponents {
    let vehicle = problem.vehicle(vehicle_id);
    let weights = problem.weights();

    let capacity = (cost.weight - vehicle.capacity_weight()).max(0.0)
        + (cost.volume - vehicle.capacity_volume()).max(0.0);

    let detour = vehicle
        .detour_limit()
        .map(|limit| (cost.distance.km() - limit.km()).max(0.0))
        .unwrap_or(0.0);

    let duration = problem
        .max_route_duration()
        .map(|max| ((cost.duration - max).as_secs_f64() / 60.0).max(0.0))
        .unwrap_or(0.0);

    CostComponents {
        capacity,
        detour,
        duration,
        distance: cost.distance.km() * weights.distance_per_km,
        lateness: cost.lateness.as_secs_f64() / 60.0 * weights.lateness_per_minute,
    }
}
