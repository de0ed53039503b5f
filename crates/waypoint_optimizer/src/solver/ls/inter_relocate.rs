use crate::solver::{
    insertion::best_insertion_in_route, route_cost::evaluate_route, score::Score,
    working_solution::WorkingSolution,
};

use super::r#move::{LocalSearchOperator, RouteChanges, RoutePair};

/// **Inter-Route Relocate**
///
/// Moves every visit of one order from route `from` to its cheapest
/// position in route `to`.
///
/// ```text
/// BEFORE:
///    from: ... (A) -> [o] -> (B) ...
///    to:   ... (X) -> (Y) ...
///
/// AFTER:
///    from: ... (A) -> (B) ...
///    to:   ... (X) -> [o] -> (Y) ...
/// ```
pub struct InterRelocateOperator;

impl LocalSearchOperator for InterRelocateOperator {
    const NAME: &'static str = "inter_relocate";

    fn generate_moves<C>(solution: &WorkingSolution, (from, to): RoutePair, mut consumer: C)
    where
        C: FnMut(Score, &RouteChanges),
    {
        if from == to {
            return;
        }

        let problem = solution.problem();
        let from_route = solution.route(from);
        let to_route = solution.route(to);
        let to_vehicle = problem.vehicle(to);

        for order_id in from_route.order_ids() {
            let order = problem.order(order_id);
            if !to_vehicle.can_carry(
                to_route.cost().weight + order.weight(),
                to_route.cost().volume + order.volume(),
            ) {
                continue;
            }

            let Some(insertion) = best_insertion_in_route(
                problem,
                to,
                to_route.activities(),
                to_route.cost().score,
                order_id,
            ) else {
                continue;
            };

            let remaining = from_route.without_order(order_id);
            let removal_delta =
                evaluate_route(problem, from, &remaining).score - from_route.cost().score;

            consumer(
                removal_delta + insertion.delta,
                &[
                    (from, remaining.as_slice()),
                    (to, insertion.activities.as_slice()),
                ],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        problem::{activity_id::ActivityId, order::OrderIdx, vehicle::VehicleIdx},
        test_utils,
    };

    use super::*;

    #[test]
    fn test_relocate_moves_order_to_closer_vehicle() {
        let mut near = test_utils::vehicle_builder(2, 100.0, 100.0);
        near.set_start_location(crate::problem::location::Location::from_lat_lon(50.0, 20.0));
        let problem = test_utils::problem(
            vec![test_utils::order_at(1, 50.01, 20.0, 10.0)],
            vec![test_utils::vehicle(1, 100.0, 100.0), near.build().unwrap()],
        );
        let mut solution = WorkingSolution::new(&problem);
        solution.replace_route(VehicleIdx::new(0), vec![ActivityId::Delivery(OrderIdx::new(0))]);

        let mut moves = vec![];
        InterRelocateOperator::generate_moves(
            &solution,
            (VehicleIdx::new(0), VehicleIdx::new(1)),
            |delta, changes| moves.push((delta, changes[1].1.to_vec())),
        );

        assert_eq!(moves.len(), 1);
        assert!(moves[0].0.is_improvement());
        assert_eq!(moves[0].1, vec![ActivityId::Delivery(OrderIdx::new(0))]);
    }

    #[test]
    fn test_relocate_skips_full_vehicle() {
        let problem = test_utils::problem(
            vec![test_utils::order_at(1, 52.3, 21.0, 600.0)],
            vec![
                test_utils::vehicle(1, 1000.0, 100.0),
                test_utils::vehicle(2, 500.0, 100.0),
            ],
        );
        let mut solution = WorkingSolution::new(&problem);
        solution.replace_route(VehicleIdx::new(0), vec![ActivityId::Delivery(OrderIdx::new(0))]);

        let mut count = 0;
        InterRelocateOperator::generate_moves(
            &solution,
            (VehicleIdx::new(0), VehicleIdx::new(1)),
            |_, _| count += 1,
        );

        assert_eq!(count, 0);
    }
}
