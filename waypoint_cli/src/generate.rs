use std::path::{Path, PathBuf};

use clap::Subcommand;
use waypoint_planner::config::PlannerConfig;

#[derive(Subcommand)]
pub enum GenerateSubcommands {
    /// JSON schema of the planning request
    JsonSchema {
        #[arg(long, short = 'o')]
        out: PathBuf,
    },
    /// Planner configuration file filled with the defaults
    Config {
        #[arg(long, short = 'o')]
        out: PathBuf,
    },
}

pub fn run(subcommand: GenerateSubcommands) -> Result<(), anyhow::Error> {
    match subcommand {
        GenerateSubcommands::JsonSchema { out } => {
            let schema = waypoint_optimizer::json::schema::generate_json_schema()?;
            write(&out, schema)?;
        }
        GenerateSubcommands::Config { out } => {
            let config = toml::to_string_pretty(&PlannerConfig::default())?;
            write(&out, config)?;
        }
    }

    Ok(())
}

fn write(out: &Path, contents: String) -> std::io::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, contents)
}
