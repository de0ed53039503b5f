use crate::solver::{
    route_cost::evaluate_route,
    score::Score,
    working_solution::{WorkingSolution, respects_precedence},
};

use super::r#move::{LocalSearchOperator, RouteChanges, RoutePair};

/// **Intra-Route 2-Opt**
///
/// Reverses the segment between `from` and `to` (inclusive) within a route.
/// Reversals that would put a delivery before its pickup are skipped.
///
/// ```text
/// BEFORE:
///    ... (A) -> [from] -> (B) -> (C) -> [to] -> (D) ...
///
/// AFTER:
///    ... (A) -> [to] -> (C) -> (B) -> [from] -> (D) ...
/// ```
pub struct TwoOptOperator;

impl LocalSearchOperator for TwoOptOperator {
    const NAME: &'static str = "two_opt";

    fn generate_moves<C>(solution: &WorkingSolution, (r1, r2): RoutePair, mut consumer: C)
    where
        C: FnMut(Score, &RouteChanges),
    {
        if r1 != r2 {
            return;
        }

        let problem = solution.problem();
        let route = solution.route(r1);
        let activities = route.activities();
        let mut candidate = activities.to_vec();

        for from in 0..activities.len() {
            for to in from + 1..activities.len() {
                candidate.copy_from_slice(activities);
                candidate[from..=to].reverse();

                if !respects_precedence(problem, &candidate) {
                    continue;
                }

                let delta = evaluate_route(problem, r1, &candidate).score - route.cost().score;
                consumer(delta, &[(r1, candidate.as_slice())]);
            }
        }
    }
}
