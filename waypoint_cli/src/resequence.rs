use std::path::PathBuf;

use clap::Args;
use tracing::info;
use waypoint_optimizer::{json::types::JsonResequenceRequest, solver::resequence::resequence_routes};

use crate::io::{read_json, write_json};

#[derive(Args)]
pub struct ResequenceArgs {
    /// Request with the remaining stops and the vehicle position
    #[arg(short, long)]
    input: PathBuf,

    #[arg(short, long)]
    out: Option<PathBuf>,
}

pub fn run(args: ResequenceArgs) -> anyhow::Result<()> {
    let request: JsonResequenceRequest = read_json(&args.input)?;
    let stops = resequence_routes(&request.stops, request.start.lat, request.start.lon);
    info!(stops = stops.len(), "Resequenced stops");

    write_json(&stops, args.out.as_ref())
}
