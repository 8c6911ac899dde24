//! Simulation settings loaded from TOML and validated into typed values.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use creep_defence_core::{CellCoord, TowerKind};
use creep_defence_system_spawning::Config as SpawningConfig;
use creep_defence_world::WorldConfig;
use serde::Deserialize;
use thiserror::Error;

/// Raw simulation settings as written in a configuration file.
///
/// Every field falls back to its default when omitted.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of grid columns for generated terrain.
    pub columns: u32,
    /// Number of grid rows for generated terrain.
    pub rows: u32,
    /// Side length of a cell in pixels.
    pub cell_length: f32,
    /// Seed shared by terrain generation and wave variety.
    pub seed: u64,
    /// Gold available when the session starts.
    pub starting_gold: u32,
    /// Lives available when the session starts.
    pub starting_lives: u32,
    /// Nukes available when the session starts.
    pub starting_nukes: u32,
    /// Simulated milliseconds per tick.
    pub tick_ms: u64,
    /// Upper bound on the number of ticks to simulate.
    pub ticks: u32,
    /// Milliseconds between wave starts.
    pub wave_delay_ms: u64,
    /// Milliseconds before the first wave starts.
    pub first_wave_ms: u64,
    /// Milliseconds between creeps of a wave.
    pub spawn_interval_ms: u64,
    /// Creeps in an ordinary wave.
    pub creeps_per_wave: u32,
    /// Player actions replayed at fixed ticks.
    pub script: Vec<ScriptEntry>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            columns: 20,
            rows: 12,
            cell_length: 20.0,
            seed: 0,
            starting_gold: 200,
            starting_lives: 20,
            starting_nukes: 3,
            tick_ms: 50,
            ticks: 6_000,
            wave_delay_ms: 25_000,
            first_wave_ms: 5_000,
            spawn_interval_ms: 1_000,
            creeps_per_wave: 20,
            script: Vec::new(),
        }
    }
}

/// Player action scheduled for a specific tick.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct ScriptEntry {
    /// Tick on which the action is issued.
    pub tick: u32,
    /// Action to perform.
    #[serde(flatten)]
    pub action: ScriptedAction,
}

/// Actions a scripted player can take.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptedAction {
    /// Build a tower on a cell.
    Build {
        /// Kind of tower to build.
        kind: TowerKind,
        /// Column of the target cell.
        column: u32,
        /// Row of the target cell.
        row: u32,
    },
    /// Upgrade the tower standing on a cell.
    Upgrade {
        /// Column of the tower.
        column: u32,
        /// Row of the tower.
        row: u32,
    },
    /// Sell the tower standing on a cell.
    Sell {
        /// Column of the tower.
        column: u32,
        /// Row of the tower.
        row: u32,
    },
    /// Detonate a nuke.
    Nuke,
    /// Ask for the next wave early.
    CallWave,
}

impl ScriptedAction {
    /// Cell the action targets, if any.
    #[must_use]
    pub const fn cell(&self) -> Option<CellCoord> {
        match *self {
            Self::Build { column, row, .. }
            | Self::Upgrade { column, row }
            | Self::Sell { column, row } => {
                Some(CellCoord::new(column, row))
            }
            Self::Nuke | Self::CallWave => None,
        }
    }
}

/// Reasons a configuration cannot drive a simulation.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The grid has no cells.
    #[error("grid dimensions must be non-zero, got {columns}x{rows}")]
    ZeroDimension {
        /// Configured column count.
        columns: u32,
        /// Configured row count.
        rows: u32,
    },
    /// Cells must have a positive pixel size.
    #[error("cell length must be positive, got {0}")]
    NonPositiveCellLength(f32),
    /// Ticks must advance time.
    #[error("tick length must be non-zero")]
    ZeroTick,
    /// Waves need at least one creep.
    #[error("waves must contain at least one creep")]
    EmptyWaves,
}

/// Validated settings ready to drive a simulation.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Grid columns used when generating terrain.
    pub columns: u32,
    /// Grid rows used when generating terrain.
    pub rows: u32,
    /// Terrain and wave seed.
    pub seed: u64,
    /// World construction parameters.
    pub world: WorldConfig,
    /// Wave controller parameters.
    pub spawning: SpawningConfig,
    /// Simulated time per tick.
    pub tick: Duration,
    /// Upper bound on simulated ticks.
    pub ticks: u32,
    /// Scripted player actions sorted by tick.
    pub script: Vec<ScriptEntry>,
}

impl SimulationConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Checks the raw values and converts them into typed settings.
    pub fn validate(self) -> Result<Settings, ConfigError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(ConfigError::ZeroDimension {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if !(self.cell_length > 0.0) {
            return Err(ConfigError::NonPositiveCellLength(self.cell_length));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        if self.creeps_per_wave == 0 {
            return Err(ConfigError::EmptyWaves);
        }

        let mut script = self.script;
        script.sort_by_key(|entry| entry.tick);

        Ok(Settings {
            columns: self.columns,
            rows: self.rows,
            seed: self.seed,
            world: WorldConfig {
                cell_length: self.cell_length,
                starting_gold: self.starting_gold,
                starting_lives: self.starting_lives,
                starting_nukes: self.starting_nukes,
            },
            spawning: SpawningConfig::new(
                Duration::from_millis(self.wave_delay_ms),
                Duration::from_millis(self.first_wave_ms),
                Duration::from_millis(self.spawn_interval_ms),
                self.creeps_per_wave,
                self.seed,
            ),
            tick: Duration::from_millis(self.tick_ms),
            ticks: self.ticks,
            script,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SimulationConfig::from_toml("").expect("empty config parses");
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn script_entries_parse_with_flattened_actions() {
        let config = SimulationConfig::from_toml(
            r#"
            columns = 8
            rows = 4

            [[script]]
            tick = 3
            action = "build"
            kind = "Cannon"
            column = 2
            row = 1

            [[script]]
            tick = 1
            action = "call_wave"

            [[script]]
            tick = 5
            action = "upgrade"
            column = 2
            row = 1
            "#,
        )
        .expect("config parses");

        assert_eq!(config.columns, 8);
        assert_eq!(
            config.script,
            vec![
                ScriptEntry {
                    tick: 3,
                    action: ScriptedAction::Build {
                        kind: TowerKind::Cannon,
                        column: 2,
                        row: 1,
                    },
                },
                ScriptEntry {
                    tick: 1,
                    action: ScriptedAction::CallWave,
                },
                ScriptEntry {
                    tick: 5,
                    action: ScriptedAction::Upgrade { column: 2, row: 1 },
                },
            ]
        );

        let settings = config.validate().expect("valid settings");
        assert_eq!(settings.script[0].tick, 1);
        assert_eq!(settings.tick, Duration::from_millis(50));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(SimulationConfig::from_toml("colums = 3").is_err());
    }

    #[test]
    fn validation_rejects_degenerate_values() {
        let zero_rows = SimulationConfig {
            rows: 0,
            ..SimulationConfig::default()
        };
        assert_eq!(
            zero_rows.validate().err(),
            Some(ConfigError::ZeroDimension {
                columns: 20,
                rows: 0
            })
        );

        let flat = SimulationConfig {
            cell_length: 0.0,
            ..SimulationConfig::default()
        };
        assert_eq!(
            flat.validate().err(),
            Some(ConfigError::NonPositiveCellLength(0.0))
        );

        let frozen = SimulationConfig {
            tick_ms: 0,
            ..SimulationConfig::default()
        };
        assert_eq!(frozen.validate().err(), Some(ConfigError::ZeroTick));
    }
}
