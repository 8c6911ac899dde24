#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Creep Defence session without a window.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use creep_defence_cli::{load_terrain, Simulation, SimulationConfig};
use creep_defence_core::WELCOME_BANNER;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Runs a headless Creep Defence session and prints a summary.
#[derive(Debug, Parser)]
#[command(name = "creep-defence", version)]
struct Args {
    /// TOML file with simulation settings.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Hand-drawn map, one row of terrain symbols per line.
    #[arg(short, long)]
    map: Option<PathBuf>,
    /// Overrides the configured seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Overrides the configured tick limit.
    #[arg(long)]
    ticks: Option<u32>,
    /// Overrides the configured column count.
    #[arg(long)]
    columns: Option<u32>,
    /// Overrides the configured row count.
    #[arg(long)]
    rows: Option<u32>,
}

impl Args {
    fn simulation_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load(path)?,
            None => SimulationConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(ticks) = self.ticks {
            config.ticks = ticks;
        }
        if let Some(columns) = self.columns {
            config.columns = columns;
        }
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    init_logging();

    let args = Args::parse();
    let settings = args.simulation_config()?.validate()?;
    let terrain = load_terrain(&settings, args.map.as_deref())?;

    println!("{WELCOME_BANNER}");
    let mut simulation = Simulation::new(&settings, terrain);
    let report = simulation.run(settings.ticks);
    println!("{report}");
    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
