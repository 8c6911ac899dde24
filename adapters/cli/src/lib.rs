#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless runner that plays a Creep Defence session from a configuration file.

pub mod config;
pub mod simulation;

pub use config::{ConfigError, ScriptEntry, ScriptedAction, Settings, SimulationConfig};
pub use simulation::{load_terrain, Report, Simulation, Tally};
