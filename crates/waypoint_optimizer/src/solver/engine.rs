use fxhash::FxHashSet;
use jiff::Timestamp;
use tracing::{info, instrument, warn};

use crate::{
    error::PlanningError,
    problem::{
        optimization_profile::OptimizationProfile,
        order::{Order, OrderIdx},
        route_stop::RouteStop,
        vehicle::Vehicle,
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solution::{RoutingSolution, SolutionDiagnostics, UnassignedReason},
};

use super::{
    construction::construct_solution,
    ls::local_search::{LocalSearch, LocalSearchOutcome},
    resequence::resequence_routes,
    solver_params::SolverParams,
    stop_signal::{SearchBudget, StopSignal},
    working_solution::WorkingSolution,
};

/// Turns an order set and a filtered fleet into routes.
///
/// The engine only holds immutable parameters: concurrent runs share nothing
/// and may be started from several threads at once.
#[derive(Debug, Clone)]
pub struct OptimizationEngine {
    params: SolverParams,
}

impl OptimizationEngine {
    pub fn new(params: SolverParams) -> Result<Self, PlanningError> {
        params.validate()?;
        Ok(OptimizationEngine { params })
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Plans routes within the search budget. See [`Self::calculate_routes_with`].
    pub fn calculate_routes(
        &self,
        orders: &[Order],
        fleet: &[Vehicle],
        profile: &OptimizationProfile,
    ) -> Result<RoutingSolution, PlanningError> {
        self.calculate_routes_with(orders, fleet, profile, &StopSignal::new())
    }

    /// Plans routes, stopping early when `signal` is raised.
    ///
    /// Only malformed input is an error. An empty order set yields an empty
    /// solution, an empty fleet leaves every order unassigned, and both
    /// timeouts and cancellation return the best solution found so far.
    #[instrument(
        skip_all,
        level = "debug",
        fields(orders = orders.len(), vehicles = fleet.len(), profile = %profile.code)
    )]
    pub fn calculate_routes_with(
        &self,
        orders: &[Order],
        fleet: &[Vehicle],
        profile: &OptimizationProfile,
        signal: &StopSignal,
    ) -> Result<RoutingSolution, PlanningError> {
        profile.validate()?;
        ensure_unique("order.id", orders.iter().map(Order::id))?;
        ensure_unique("vehicle.id", fleet.iter().map(Vehicle::id))?;

        if orders.is_empty() {
            return Ok(RoutingSolution::empty());
        }

        let params = match profile.termination {
            Some(termination) => self.params.with_time_limit(termination),
            None => self.params.clone(),
        };

        let now = params.planning_start.unwrap_or_else(Timestamp::now);
        let problem = VehicleRoutingProblem::new(
            orders.to_vec(),
            fleet.to_vec(),
            profile,
            profile.route_start(now),
            &params,
        );

        if fleet.is_empty() {
            warn!(
                orders = orders.len(),
                "No vehicle left after filtering, every order is unassigned"
            );
            let mut solution = WorkingSolution::new(&problem);
            for order_id in OrderIdx::range(orders.len()) {
                solution.mark_unassigned(order_id, UnassignedReason::NoVehicles);
            }
            return Ok(solution.into_solution(SolutionDiagnostics {
                no_fleet: true,
                ..SolutionDiagnostics::default()
            }));
        }

        let budget = SearchBudget::new(params.time_limit(), params.max_iterations(), signal);
        let search = || {
            let (mut solution, interrupted) = construct_solution(&problem, &budget);
            let outcome = match interrupted {
                Some(termination) => LocalSearchOutcome {
                    termination,
                    iterations: 0,
                },
                None => LocalSearch::new(fleet.len()).run(&mut solution, &budget),
            };
            (solution, outcome)
        };

        let (solution, outcome) = match rayon::ThreadPoolBuilder::new()
            .num_threads(params.threads.number_of_threads())
            .build()
        {
            Ok(pool) => pool.install(search),
            Err(error) => {
                warn!(%error, "Falling back to the global thread pool");
                search()
            }
        };

        let solution = solution.into_solution(SolutionDiagnostics {
            no_fleet: false,
            termination: outcome.termination,
            iterations: outcome.iterations,
            ..SolutionDiagnostics::default()
        });

        info!(
            routes = solution.routes.len(),
            unassigned = solution.unassigned.len(),
            termination = ?solution.diagnostics.termination,
            iterations = solution.diagnostics.iterations,
            score = ?solution.diagnostics.score,
            "Optimization finished"
        );

        Ok(solution)
    }

    /// Nearest-neighbour ordering of a loaded vehicle's remaining stops.
    pub fn resequence_routes(
        &self,
        stops: &[RouteStop],
        start_lat: f64,
        start_lon: f64,
    ) -> Vec<RouteStop> {
        resequence_routes(stops, start_lat, start_lon)
    }
}

fn ensure_unique(
    field: &str,
    ids: impl Iterator<Item = uuid::Uuid>,
) -> Result<(), PlanningError> {
    let mut seen = FxHashSet::default();
    for id in ids {
        if !seen.insert(id) {
            return Err(PlanningError::invalid(field, format!("{id} appears twice")));
        }
    }
    Ok(())
}
