//! podrelay simulator CLI
//!
//! Runs a scenario against the scheduler and prints a report.

use anyhow::Context;
use clap::{Parser, Subcommand};
use podrelay_simulator::{Simulator, SimulatorConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "podrelay-sim")]
#[command(about = "Deterministic operator simulator for podrelay")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario
    Run {
        /// Scenario file (TOML). Built-in defaults when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the number of blocks
        #[arg(long)]
        blocks: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default scenario as TOML
    Defaults,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Defaults => {
            // No tracing here: output goes to stdout.
            print!("{}", SimulatorConfig::default().to_toml_string()?);
        }

        Commands::Run {
            config,
            seed,
            blocks,
            json,
        } => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .with_writer(std::io::stderr)
                .init();

            let mut scenario = match &config {
                Some(path) => SimulatorConfig::load(path)
                    .with_context(|| format!("loading scenario {}", path.display()))?,
                None => SimulatorConfig::default(),
            };
            if let Some(seed) = seed {
                scenario = scenario.with_seed(seed);
            }
            if let Some(blocks) = blocks {
                scenario = scenario.with_blocks(blocks);
            }

            let mut simulator = Simulator::new(scenario).context("setting up simulation")?;
            let report = simulator.run();

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print();
            }
        }
    }

    Ok(())
}
