use std::path::PathBuf;

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use tracing::info;
use waypoint_optimizer::{
    json::types::{JsonPlanningRequest, JsonSolution},
    solution::RoutingSolution,
    solver::{
        engine::OptimizationEngine,
        solver_params::{Termination, Threads},
    },
};
use waypoint_planner::config::PlannerConfig;

use crate::{
    io::{read_json, write_json},
    parsers,
};

#[derive(Args)]
pub struct OptimizeArgs {
    /// Planning request with orders, vehicles and an optional profile
    #[arg(short, long)]
    input: PathBuf,

    /// Search time limit, overrides the configuration
    #[arg(short, long, value_parser = parsers::parse_duration)]
    timeout: Option<jiff::SignedDuration>,

    #[arg(long, value_parser = parsers::parse_threads)]
    threads: Option<Threads>,

    #[arg(long, short = 'n')]
    iterations: Option<usize>,

    /// Output file for the solution, stdout when missing
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

pub fn run(args: OptimizeArgs, config: &PlannerConfig) -> anyhow::Result<()> {
    let request: JsonPlanningRequest = read_json(&args.input)?;
    let (orders, vehicles, profile) = request.into_domain()?;
    info!(
        orders = orders.len(),
        vehicles = vehicles.len(),
        profile = %profile.code,
        "Loaded planning request"
    );

    let mut params = config.solver.solver_params();
    if let Some(timeout) = args.timeout {
        params = params.with_time_limit(timeout);
    }
    if let Some(iterations) = args.iterations {
        params
            .terminations
            .retain(|termination| !matches!(termination, Termination::Iterations(_)));
        params.terminations.push(Termination::Iterations(iterations));
    }
    if let Some(threads) = args.threads {
        params.threads = threads;
    }

    let engine = OptimizationEngine::new(params)?;
    let solution = engine.calculate_routes(&orders, &vehicles, &profile)?;

    eprintln!("{}", summary(&solution));
    info!(
        termination = ?solution.diagnostics.termination,
        iterations = solution.diagnostics.iterations,
        "Optimization finished"
    );
    write_json(&JsonSolution::from(&solution), args.out.as_ref())
}

fn summary(solution: &RoutingSolution) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Vehicle",
        "Stops",
        "Orders",
        "Distance (km)",
        "Duration (min)",
    ]);

    for route in &solution.routes {
        table.add_row(vec![
            route.vehicle_id.to_string(),
            route.activities.len().to_string(),
            route.included_order_ids().len().to_string(),
            format!("{:.1}", route.total_distance_meters / 1000.0),
            format!("{:.0}", route.total_time_millis as f64 / 60_000.0),
        ]);
    }

    let stops: usize = solution.routes.iter().map(|route| route.activities.len()).sum();
    let orders = solution.assigned_order_ids().count();
    let millis: i64 = solution.routes.iter().map(|route| route.total_time_millis).sum();
    table.add_row(vec![
        String::from("total"),
        stops.to_string(),
        orders.to_string(),
        format!("{:.1}", solution.total_distance_meters() / 1000.0),
        format!("{:.0}", millis as f64 / 60_000.0),
    ]);
    table.add_row(vec![
        String::from("unassigned"),
        String::new(),
        solution.unassigned.len().to_string(),
        String::new(),
        String::new(),
    ]);
    table
}
