use rayon::prelude::*;

use crate::{
    problem::{
        activity_id::ActivityId, order::OrderIdx, vehicle::VehicleIdx,
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solution::UnassignedReason,
};

use super::{
    route_cost::evaluate_route,
    score::{SCORE_EPSILON, Score},
    working_solution::WorkingSolution,
};

/// A placement of every visit of one order in one route.
#[derive(Debug, Clone)]
pub struct Insertion {
    pub vehicle_id: VehicleIdx,
    pub order_id: OrderIdx,
    /// Activities of the route once the order is inserted.
    pub activities: Vec<ActivityId>,
    pub delta: Score,
}

/// Cheapest placement of `order_id` into `base`, which must not already
/// contain it. Placements that add hard cost are never returned.
///
/// Ties keep the earliest position.
pub fn best_insertion_in_route(
    problem: &VehicleRoutingProblem,
    vehicle_id: VehicleIdx,
    base: &[ActivityId],
    base_score: Score,
    order_id: OrderIdx,
) -> Option<Insertion> {
    let mut best: Option<Insertion> = None;
    let mut candidate: Vec<ActivityId> = Vec::with_capacity(base.len() + 2);

    let mut consider = |candidate: &Vec<ActivityId>| {
        let delta = evaluate_route(problem, vehicle_id, candidate).score - base_score;
        if delta.hard_score > SCORE_EPSILON {
            return;
        }

        if best.as_ref().is_none_or(|best| delta < best.delta) {
            best = Some(Insertion {
                vehicle_id,
                order_id,
                activities: candidate.clone(),
                delta,
            });
        }
    };

    let len = base.len();
    if problem.order(order_id).has_pickup() {
        for pickup_position in 0..=len {
            for delivery_position in pickup_position..=len {
                candidate.clear();
                candidate.extend_from_slice(&base[..pickup_position]);
                candidate.push(ActivityId::Pickup(order_id));
                candidate.extend_from_slice(&base[pickup_position..delivery_position]);
                candidate.push(ActivityId::Delivery(order_id));
                candidate.extend_from_slice(&base[delivery_position..]);
                consider(&candidate);
            }
        }
    } else {
        for position in 0..=len {
            candidate.clear();
            candidate.extend_from_slice(&base[..position]);
            candidate.push(ActivityId::Delivery(order_id));
            candidate.extend_from_slice(&base[position..]);
            consider(&candidate);
        }
    }

    best
}

/// Cheapest feasible placement of an unassigned order over the whole fleet.
///
/// Routes are evaluated in parallel; ties go to the lowest vehicle index. On
/// failure, tells why the order cannot be placed.
pub fn best_insertion(
    solution: &WorkingSolution,
    order_id: OrderIdx,
) -> Result<Insertion, UnassignedReason> {
    let problem = solution.problem();
    if problem.vehicles().is_empty() {
        return Err(UnassignedReason::NoVehicles);
    }

    let order = problem.order(order_id);

    let candidates: Vec<Option<Insertion>> = solution
        .routes()
        .par_iter()
        .map(|route| {
            let vehicle = problem.vehicle(route.vehicle_id());
            let cost = route.cost();
            if !vehicle.can_carry(cost.weight + order.weight(), cost.volume + order.volume()) {
                return None;
            }

            best_insertion_in_route(
                problem,
                route.vehicle_id(),
                route.activities(),
                cost.score,
                order_id,
            )
        })
        .collect();

    let has_capacity = solution.routes().iter().any(|route| {
        let cost = route.cost();
        problem
            .vehicle(route.vehicle_id())
            .can_carry(cost.weight + order.weight(), cost.volume + order.volume())
    });

    candidates
        .into_iter()
        .flatten()
        .fold(None, |best: Option<Insertion>, insertion| match best {
            Some(best) if best.delta <= insertion.delta => Some(best),
            _ => Some(insertion),
        })
        .ok_or(if has_capacity {
            UnassignedReason::ConstraintViolation
        } else {
            UnassignedReason::CapacityExceeded
        })
}
