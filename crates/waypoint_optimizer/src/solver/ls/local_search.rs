use rayon::prelude::*;
use tracing::{debug, instrument, trace};

use crate::{
    problem::vehicle::VehicleIdx,
    solution::TerminationReason,
    solver::{
        construction::insert_unassigned, stop_signal::SearchBudget,
        working_solution::WorkingSolution,
    },
};

use super::{
    inter_relocate::InterRelocateOperator,
    inter_swap::InterSwapOperator,
    r#move::{LocalSearchMove, LocalSearchOperator, RoutePair},
    two_opt::TwoOptOperator,
};

/// Best-improvement local search over every pair of routes.
///
/// Each iteration finds the best improving move of every pair in parallel,
/// then applies the best ones that touch disjoint routes. Only strictly
/// improving moves are applied, so a move that adds hard cost without
/// removing more is never taken.
pub(crate) struct LocalSearch {
    pairs: Vec<RoutePair>,
}

pub(crate) struct LocalSearchOutcome {
    pub termination: TerminationReason,
    pub iterations: usize,
}

impl LocalSearch {
    pub fn new(number_of_routes: usize) -> Self {
        let pairs = VehicleIdx::range(number_of_routes)
            .flat_map(|r1| VehicleIdx::range(number_of_routes).map(move |r2| (r1, r2)))
            .collect();

        LocalSearch { pairs }
    }

    #[instrument(skip_all, level = "debug")]
    pub fn run(&self, solution: &mut WorkingSolution, budget: &SearchBudget) -> LocalSearchOutcome {
        let mut iterations = 0;

        loop {
            if let Some(termination) = budget.exhausted(iterations) {
                return LocalSearchOutcome {
                    termination,
                    iterations,
                };
            }

            let inserted = !solution.unassigned().is_empty() && insert_unassigned(solution);
            let moves = self.find_moves(solution, budget);

            if moves.is_empty() && !inserted {
                // An interrupted scan finds nothing without having converged
                let termination = budget.interrupted().unwrap_or(TerminationReason::Converged);
                return LocalSearchOutcome {
                    termination,
                    iterations,
                };
            }

            let applied = Self::apply_disjoint(solution, moves);
            iterations += 1;

            trace!(iteration = iterations, applied, score = ?solution.score());
        }
    }

    fn find_moves(&self, solution: &WorkingSolution, budget: &SearchBudget) -> Vec<LocalSearchMove> {
        self.pairs
            .par_iter()
            .filter_map(|&pair| {
                if budget.interrupted().is_some() {
                    return None;
                }

                let route_empty = |vehicle_id: VehicleIdx| solution.route(vehicle_id).is_empty();
                if route_empty(pair.0) && route_empty(pair.1) {
                    return None;
                }

                let mut best: Option<LocalSearchMove> = None;
                Self::best_move::<InterRelocateOperator>(solution, pair, &mut best);
                Self::best_move::<InterSwapOperator>(solution, pair, &mut best);
                Self::best_move::<TwoOptOperator>(solution, pair, &mut best);
                best
            })
            .collect()
    }

    fn best_move<O: LocalSearchOperator>(
        solution: &WorkingSolution,
        pair: RoutePair,
        best: &mut Option<LocalSearchMove>,
    ) {
        O::generate_moves(solution, pair, |delta, changes| {
            if !delta.is_improvement() {
                return;
            }

            if best.as_ref().is_none_or(|best| delta < best.delta) {
                *best = Some(LocalSearchMove::new(O::NAME, delta, changes));
            }
        });
    }

    /// Applies moves best first, skipping any that touches a route already
    /// changed in this round. Ties keep the pair order.
    fn apply_disjoint(solution: &mut WorkingSolution, mut moves: Vec<LocalSearchMove>) -> usize {
        moves.sort_by(|a, b| a.delta.cmp(&b.delta));

        let mut touched: Vec<VehicleIdx> = Vec::new();
        let mut applied = 0;
        for candidate in moves {
            if touched.iter().any(|&vehicle_id| candidate.touches(vehicle_id)) {
                continue;
            }

            debug!(operator = candidate.operator, delta = ?candidate.delta, "Applying move");
            touched.extend(candidate.changes.iter().map(|(vehicle_id, _)| *vehicle_id));
            candidate.apply(solution);
            applied += 1;
        }

        applied
    }
}
