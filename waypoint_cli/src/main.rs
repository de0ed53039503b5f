use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;
use waypoint_planner::config::PlannerConfig;

use crate::{
    generate::GenerateSubcommands, optimize::OptimizeArgs, resequence::ResequenceArgs,
    schedule::ScheduleArgs,
};

mod generate;
mod io;
mod optimize;
mod parsers;
mod resequence;
mod schedule;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,

    /// Planner configuration (TOML). Defaults apply when the file is missing.
    #[arg(short, long, env = "WAYPOINT_CONFIG", default_value = "waypoint.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Plans routes for a request file
    Optimize {
        #[command(flatten)]
        args: OptimizeArgs,
    },
    /// Reorders a loaded vehicle's remaining stops from its position
    Resequence {
        #[command(flatten)]
        args: ResequenceArgs,
    },
    /// Runs the batch scheduler over a dataset file
    Schedule {
        #[command(flatten)]
        args: ScheduleArgs,
    },
    #[command(visible_alias = "g")]
    Generate {
        #[command(subcommand)]
        commands: GenerateSubcommands,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = PlannerConfig::load(&cli.config)?;

    match cli.command {
        Commands::Optimize { args } => optimize::run(args, &config)?,
        Commands::Resequence { args } => resequence::run(args)?,
        Commands::Schedule { args } => schedule::run(args, &config).await?,
        Commands::Generate { commands } => generate::run(commands)?,
    }

    Ok(())
}
