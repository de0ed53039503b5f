use crate::{
    problem::activity_id::ActivityId,
    solver::{route_cost::evaluate_route, score::Score, working_solution::WorkingSolution},
};

use super::r#move::{LocalSearchOperator, RouteChanges, RoutePair};

/// **Inter-Route Swap**
///
/// Exchanges two delivery-only orders between routes, each taking the
/// other's position.
///
/// ```text
/// BEFORE:
///    r1: ... (A) -> [first] -> (B) ...
///    r2: ... (X) -> [second] -> (Y) ...
///
/// AFTER:
///    r1: ... (A) -> [second] -> (B) ...
///    r2: ... (X) -> [first] -> (Y) ...
/// ```
pub struct InterSwapOperator;

impl LocalSearchOperator for InterSwapOperator {
    const NAME: &'static str = "inter_swap";

    fn generate_moves<C>(solution: &WorkingSolution, (r1, r2): RoutePair, mut consumer: C)
    where
        C: FnMut(Score, &RouteChanges),
    {
        // Each unordered pair once
        if r1 >= r2 {
            return;
        }

        let problem = solution.problem();
        let first_route = solution.route(r1);
        let second_route = solution.route(r2);
        let (first_cost, second_cost) = (first_route.cost(), second_route.cost());
        let (first_vehicle, second_vehicle) = (problem.vehicle(r1), problem.vehicle(r2));

        let mut first_candidate = first_route.activities().to_vec();
        let mut second_candidate = second_route.activities().to_vec();

        for (i, &first) in first_route.activities().iter().enumerate() {
            let ActivityId::Delivery(first_order_id) = first else {
                continue;
            };
            let first_order = problem.order(first_order_id);
            if first_order.has_pickup() {
                continue;
            }

            for (j, &second) in second_route.activities().iter().enumerate() {
                let ActivityId::Delivery(second_order_id) = second else {
                    continue;
                };
                let second_order = problem.order(second_order_id);
                if second_order.has_pickup() {
                    continue;
                }

                let fits_first = first_vehicle.can_carry(
                    first_cost.weight - first_order.weight() + second_order.weight(),
                    first_cost.volume - first_order.volume() + second_order.volume(),
                );
                let fits_second = second_vehicle.can_carry(
                    second_cost.weight - second_order.weight() + first_order.weight(),
                    second_cost.volume - second_order.volume() + first_order.volume(),
                );
                if !fits_first || !fits_second {
                    continue;
                }

                first_candidate[i] = second;
                second_candidate[j] = first;

                let delta = evaluate_route(problem, r1, &first_candidate).score
                    - first_cost.score
                    + evaluate_route(problem, r2, &second_candidate).score
                    - second_cost.score;

                consumer(
                    delta,
                    &[
                        (r1, first_candidate.as_slice()),
                        (r2, second_candidate.as_slice()),
                    ],
                );

                first_candidate[i] = first;
                second_candidate[j] = second;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        problem::{location::Location, order::OrderIdx, vehicle::VehicleIdx},
        test_utils,
    };

    use super::*;

    #[test]
    fn test_swap_fixes_crossed_assignment() {
        let mut west = test_utils::vehicle_builder(1, 100.0, 100.0);
        west.set_start_location(Location::from_lat_lon(52.0, 20.0));
        let mut east = test_utils::vehicle_builder(2, 100.0, 100.0);
        east.set_start_location(Location::from_lat_lon(52.0, 22.0));

        let problem = test_utils::problem(
            vec![
                test_utils::order_at(1, 52.0, 20.01, 10.0),
                test_utils::order_at(2, 52.0, 21.99, 10.0),
            ],
            vec![west.build().unwrap(), east.build().unwrap()],
        );
        let mut solution = WorkingSolution::new(&problem);
        // West vehicle serves the east order and the other way round
        solution.replace_route(VehicleIdx::new(0), vec![ActivityId::Delivery(OrderIdx::new(1))]);
        solution.replace_route(VehicleIdx::new(1), vec![ActivityId::Delivery(OrderIdx::new(0))]);

        let mut best: Option<(Score, Vec<ActivityId>)> = None;
        InterSwapOperator::generate_moves(
            &solution,
            (VehicleIdx::new(0), VehicleIdx::new(1)),
            |delta, changes| best = Some((delta, changes[0].1.to_vec())),
        );

        let (delta, first) = best.unwrap();
        assert!(delta.is_improvement());
        assert_eq!(first, vec![ActivityId::Delivery(OrderIdx::new(0))]);
    }

    #[test]
    fn test_swap_respects_capacity() {
        let problem = test_utils::problem(
            vec![
                test_utils::order_at(1, 52.3, 21.0, 600.0),
                test_utils::order_at(2, 52.3, 21.1, 300.0),
            ],
            vec![
                test_utils::vehicle(1, 1000.0, 100.0),
                test_utils::vehicle(2, 500.0, 100.0),
            ],
        );
        let mut solution = WorkingSolution::new(&problem);
        solution.replace_route(VehicleIdx::new(0), vec![ActivityId::Delivery(OrderIdx::new(0))]);
        solution.replace_route(VehicleIdx::new(1), vec![ActivityId::Delivery(OrderIdx::new(1))]);

        let mut count = 0;
        InterSwapOperator::generate_moves(
            &solution,
            (VehicleIdx::new(0), VehicleIdx::new(1)),
            |_, _| count += 1,
        );

        assert_eq!(count, 0);
    }
}
