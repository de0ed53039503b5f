use std::cmp::Ordering;

use tracing::{debug, instrument};

use crate::{
    problem::{order::OrderIdx, vehicle_routing_problem::VehicleRoutingProblem},
    solution::{TerminationReason, UnassignedReason},
};

use super::{insertion::best_insertion, stop_signal::SearchBudget, working_solution::WorkingSolution};

/// Heaviest orders first, so large loads still find room.
fn insertion_order(problem: &VehicleRoutingProblem) -> Vec<OrderIdx> {
    let mut orders: Vec<OrderIdx> = OrderIdx::range(problem.orders().len()).collect();
    orders.sort_by(|&a, &b| {
        let (a, b) = (problem.order(a), problem.order(b));
        b.weight()
            .total_cmp(&a.weight())
            .then_with(|| b.volume().total_cmp(&a.volume()))
            .then_with(|| a.id().cmp(&b.id()))
    });
    orders
}

/// Greedy best insertion. Never creates a hard violation: orders that fit
/// nowhere are left unassigned with the reason.
///
/// If the budget runs out, the remaining orders are unassigned and the reason
/// is returned alongside the partial solution.
#[instrument(skip_all, level = "debug")]
pub(crate) fn construct_solution<'a>(
    problem: &'a VehicleRoutingProblem,
    budget: &SearchBudget,
) -> (WorkingSolution<'a>, Option<TerminationReason>) {
    let mut solution = WorkingSolution::new(problem);
    let orders = insertion_order(problem);

    for (position, &order_id) in orders.iter().enumerate() {
        if let Some(reason) = budget.interrupted() {
            debug!(
                remaining = orders.len() - position,
                ?reason,
                "Construction interrupted"
            );
            for &remaining in &orders[position..] {
                solution.mark_unassigned(remaining, UnassignedReason::SearchInterrupted);
            }
            return (solution, Some(reason));
        }

        match best_insertion(&solution, order_id) {
            Ok(insertion) => solution.replace_route(insertion.vehicle_id, insertion.activities),
            Err(reason) => solution.mark_unassigned(order_id, reason),
        }
    }

    debug!(
        unassigned = solution.unassigned().len(),
        score = ?solution.score(),
        "Constructed initial solution"
    );

    (solution, None)
}

/// Tries to place unassigned orders again, e.g. after local search freed
/// capacity. Returns whether anything was inserted.
pub(crate) fn insert_unassigned(solution: &mut WorkingSolution) -> bool {
    let unassigned_weight = solution.problem().weights().unassigned_order;
    let pending: Vec<OrderIdx> = solution.unassigned().keys().copied().collect();
    let mut inserted = false;

    for order_id in pending {
        match best_insertion(solution, order_id) {
            Ok(insertion)
                if insertion.delta.soft_score.total_cmp(&unassigned_weight) == Ordering::Less =>
            {
                solution.replace_route(insertion.vehicle_id, insertion.activities);
                inserted = true;
            }
            Ok(_) => solution.mark_unassigned(order_id, UnassignedReason::ConstraintViolation),
            Err(reason) => solution.mark_unassigned(order_id, reason),
        }
    }

    inserted
}
