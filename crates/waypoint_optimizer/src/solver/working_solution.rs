use std::collections::BTreeMap;

use fxhash::FxHashSet;
use jiff::SignedDuration;

use crate::{
    problem::{
        activity_id::ActivityId, order::OrderIdx, vehicle::VehicleIdx,
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solution::{
        Activity, ActivityType, Route, RoutingSolution, SolutionDiagnostics, UnassignedOrder,
        UnassignedReason,
    },
};

use super::{
    route_cost::{RouteCost, UNASSIGNED_CONSTRAINT, analyze_route, evaluate_route, schedule_route},
    score::{Score, ScoreAnalysis},
};

#[derive(Debug, Clone)]
pub struct WorkingRoute {
    vehicle_id: VehicleIdx,
    activities: Vec<ActivityId>,
    cost: RouteCost,
}

impl WorkingRoute {
    fn new(vehicle_id: VehicleIdx) -> Self {
        WorkingRoute {
            vehicle_id,
            activities: Vec::new(),
            cost: RouteCost::EMPTY,
        }
    }

    pub fn vehicle_id(&self) -> VehicleIdx {
        self.vehicle_id
    }

    pub fn activities(&self) -> &[ActivityId] {
        &self.activities
    }

    pub fn cost(&self) -> &RouteCost {
        &self.cost
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Orders served by the route, in delivery order.
    pub fn order_ids(&self) -> impl Iterator<Item = OrderIdx> + '_ {
        self.activities.iter().filter_map(|activity| match activity {
            ActivityId::Delivery(order_id) => Some(*order_id),
            ActivityId::Pickup(_) => None,
        })
    }

    /// The route's activities with every visit of `order_id` removed.
    pub fn without_order(&self, order_id: OrderIdx) -> Vec<ActivityId> {
        self.activities
            .iter()
            .copied()
            .filter(|activity| activity.order_id() != order_id)
            .collect()
    }
}

/// Mutable solution the search works on. Holds one route per vehicle, empty
/// routes included, indexed by vehicle.
#[derive(Clone)]
pub struct WorkingSolution<'a> {
    problem: &'a VehicleRoutingProblem,
    routes: Vec<WorkingRoute>,
    unassigned: BTreeMap<OrderIdx, UnassignedReason>,
}

impl<'a> WorkingSolution<'a> {
    pub fn new(problem: &'a VehicleRoutingProblem) -> Self {
        WorkingSolution {
            problem,
            routes: VehicleIdx::range(problem.vehicles().len())
                .map(WorkingRoute::new)
                .collect(),
            unassigned: BTreeMap::new(),
        }
    }

    pub fn problem(&self) -> &'a VehicleRoutingProblem {
        self.problem
    }

    pub fn routes(&self) -> &[WorkingRoute] {
        &self.routes
    }

    pub fn route(&self, vehicle_id: VehicleIdx) -> &WorkingRoute {
        &self.routes[vehicle_id.get()]
    }

    pub fn unassigned(&self) -> &BTreeMap<OrderIdx, UnassignedReason> {
        &self.unassigned
    }

    pub fn mark_unassigned(&mut self, order_id: OrderIdx, reason: UnassignedReason) {
        self.unassigned.insert(order_id, reason);
    }

    /// Replaces the activities of a route and recomputes its cost. Orders
    /// that appear in the new activities are no longer unassigned.
    pub fn replace_route(&mut self, vehicle_id: VehicleIdx, activities: Vec<ActivityId>) {
        for activity in &activities {
            self.unassigned.remove(&activity.order_id());
        }

        let route = &mut self.routes[vehicle_id.get()];
        route.cost = evaluate_route(self.problem, vehicle_id, &activities);
        route.activities = activities;
    }

    /// Score change if the given routes were replaced.
    pub fn delta(&self, changes: &[(VehicleIdx, &[ActivityId])]) -> Score {
        changes
            .iter()
            .map(|&(vehicle_id, activities)| {
                evaluate_route(self.problem, vehicle_id, activities).score
                    - self.route(vehicle_id).cost.score
            })
            .sum()
    }

    pub fn score(&self) -> Score {
        let routes: Score = self.routes.iter().map(|route| route.cost.score).sum();
        routes + self.unassigned_score()
    }

    fn unassigned_score(&self) -> Score {
        Score::soft(self.unassigned.len() as f64 * self.problem.weights().unassigned_order)
    }

    pub fn score_analysis(&self) -> ScoreAnalysis {
        let mut analysis = ScoreAnalysis::default();
        for route in &self.routes {
            analyze_route(self.problem, route.vehicle_id, &route.cost, &mut analysis);
        }
        analysis.add(UNASSIGNED_CONSTRAINT, self.unassigned_score());
        analysis
    }

    /// Whether every order is in at most one route and every route visits a
    /// pickup before its delivery.
    pub fn is_consistent(&self) -> bool {
        let mut seen = FxHashSet::default();
        for route in &self.routes {
            if !respects_precedence(self.problem, &route.activities) {
                return false;
            }
            for order_id in route.order_ids() {
                if !seen.insert(order_id) || self.unassigned.contains_key(&order_id) {
                    return false;
                }
            }
        }
        true
    }

    pub fn into_solution(self, mut diagnostics: SolutionDiagnostics) -> RoutingSolution {
        let problem = self.problem;
        diagnostics.score = self.score();
        diagnostics.score_analysis = self.score_analysis();

        let routes = self
            .routes
            .iter()
            .filter(|route| !route.is_empty())
            .map(|route| {
                let vehicle = problem.vehicle(route.vehicle_id);
                let (cost, schedule) = schedule_route(problem, route.vehicle_id, &route.activities);

                let activities = schedule
                    .iter()
                    .zip(1u32..)
                    .map(|(scheduled, sequence)| {
                        let location =
                            problem.location(problem.activity_location_id(scheduled.activity_id));
                        Activity {
                            order_id: problem.order(scheduled.activity_id.order_id()).id(),
                            activity_type: if scheduled.activity_id.is_pickup() {
                                ActivityType::Pickup
                            } else {
                                ActivityType::Delivery
                            },
                            lat: location.lat(),
                            lon: location.lon(),
                            arrival_time: scheduled.arrival,
                            end_time: scheduled.end,
                            sequence,
                        }
                    })
                    .collect();

                Route {
                    vehicle_id: vehicle.id(),
                    driver_id: vehicle.driver_id().map(str::to_owned),
                    start_time: problem.start_time(),
                    activities,
                    total_distance_meters: cost.distance.value(),
                    total_time_millis: duration_millis(cost.duration),
                }
            })
            .collect();

        let unassigned = self
            .unassigned
            .iter()
            .map(|(&order_id, &reason)| UnassignedOrder {
                order_id: problem.order(order_id).id(),
                reason,
            })
            .collect();

        RoutingSolution {
            routes,
            unassigned,
            diagnostics,
        }
    }
}

fn duration_millis(duration: SignedDuration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// A pickup must be visited before the delivery of the same order.
pub fn respects_precedence(problem: &VehicleRoutingProblem, activities: &[ActivityId]) -> bool {
    let mut picked_up = FxHashSet::default();
    for activity in activities {
        match activity {
            ActivityId::Pickup(order_id) => {
                picked_up.insert(*order_id);
            }
            ActivityId::Delivery(order_id) => {
                if problem.order(*order_id).has_pickup() && !picked_up.contains(order_id) {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use crate::{problem::location::Location, test_utils};

    use super::*;

    #[test]
    fn test_replace_route_clears_unassigned() {
        let problem = test_utils::problem(
            vec![test_utils::order_at(1, 52.3, 21.0, 10.0)],
            vec![test_utils::vehicle(1, 100.0, 100.0)],
        );
        let mut solution = WorkingSolution::new(&problem);
        solution.mark_unassigned(OrderIdx::new(0), UnassignedReason::CapacityExceeded);
        assert_eq!(solution.score().soft_score, 100_000.0);

        solution.replace_route(VehicleIdx::new(0), vec![ActivityId::Delivery(OrderIdx::new(0))]);

        assert!(solution.unassigned().is_empty());
        assert!(solution.score().soft_score < 100_000.0);
        assert!(solution.is_consistent());
    }

    #[test]
    fn test_precedence() {
        let mut builder = test_utils::order_builder(1, 52.3, 21.0, 10.0);
        builder.set_pickup_location(Location::from_lat_lon(52.0, 21.0));
        let problem = test_utils::problem(
            vec![builder.build().unwrap()],
            vec![test_utils::vehicle(1, 100.0, 100.0)],
        );
        let order = OrderIdx::new(0);

        assert!(respects_precedence(
            &problem,
            &[ActivityId::Pickup(order), ActivityId::Delivery(order)]
        ));
        assert!(!respects_precedence(
            &problem,
            &[ActivityId::Delivery(order), ActivityId::Pickup(order)]
        ));
    }

    #[test]
    fn test_into_solution_numbers_activities_from_one() {
        let problem = test_utils::problem(
            vec![
                test_utils::order_at(1, 52.3, 21.0, 10.0),
                test_utils::order_at(2, 52.4, 21.0, 10.0),
            ],
            vec![
                test_utils::vehicle(1, 100.0, 100.0),
                test_utils::vehicle(2, 100.0, 100.0),
            ],
        );
        let mut solution = WorkingSolution::new(&problem);
        solution.replace_route(
            VehicleIdx::new(1),
            vec![
                ActivityId::Delivery(OrderIdx::new(0)),
                ActivityId::Delivery(OrderIdx::new(1)),
            ],
        );

        let routing = solution.into_solution(SolutionDiagnostics::default());

        assert_eq!(routing.routes.len(), 1);
        let route = &routing.routes[0];
        assert_eq!(route.vehicle_id, test_utils::uuid(2));
        assert_eq!(
            route
                .activities
                .iter()
                .map(|activity| activity.sequence)
                .collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(route.total_distance_meters > 0.0);
        assert!(route.total_time_millis > 0);
    }
}
