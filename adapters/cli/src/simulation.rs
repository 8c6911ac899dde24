//! Headless tick loop wiring the pure systems to the authoritative world.

use std::{collections::VecDeque, fmt, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use creep_defence_core::{CellCoord, Command, Event, GameOutcome, PlacementError, TowerTarget};
use creep_defence_system_builder::{Builder, BuilderInput, PlacementPreview};
use creep_defence_system_movement::Movement;
use creep_defence_system_spawning::Spawning;
use creep_defence_system_tower_combat::TowerCombat;
use creep_defence_system_tower_targeting::TowerTargeting;
use creep_defence_world::{self as world, query, GateError, TerrainMap, World};

use crate::config::{ScriptEntry, ScriptedAction, Settings};

/// Builds the terrain for a run, either from a map file or from the seed.
pub fn load_terrain(settings: &Settings, map: Option<&Path>) -> Result<TerrainMap> {
    let Some(path) = map else {
        return TerrainMap::generate(settings.columns, settings.rows, settings.seed)
            .context("failed to generate terrain");
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read map {}", path.display()))?;
    let rows: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    TerrainMap::from_rows(&rows).with_context(|| format!("invalid map {}", path.display()))
}

/// Counters accumulated from the world's event stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    /// Creeps killed by towers.
    pub kills: u32,
    /// Creeps that reached the exit.
    pub escapes: u32,
    /// Creeps cleared by nukes.
    pub nuked: u32,
    /// Towers built.
    pub towers_built: u32,
    /// Tower upgrades bought.
    pub towers_upgraded: u32,
    /// Towers sold.
    pub towers_sold: u32,
    /// Placement requests the world refused.
    pub placements_rejected: u32,
}

impl Tally {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::CreepKilled { .. } => self.kills += 1,
                Event::CreepEscaped { .. } => self.escapes += 1,
                Event::NukeDetonated { cleared, .. } => self.nuked += *cleared,
                Event::TowerPlaced { .. } => self.towers_built += 1,
                Event::TowerUpgraded { .. } => self.towers_upgraded += 1,
                Event::TowerSold { .. } => self.towers_sold += 1,
                Event::TowerPlacementRejected { .. } => self.placements_rejected += 1,
                _ => {}
            }
        }
    }
}

/// Summary of a finished run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Report {
    /// Ticks actually simulated.
    pub ticks: u32,
    /// Simulated time at the end of the run.
    pub elapsed: Duration,
    /// Session state at the end of the run.
    pub outcome: GameOutcome,
    /// Waves that started during the run.
    pub waves_started: u32,
    /// Final score.
    pub score: u32,
    /// Final gold.
    pub gold: u32,
    /// Final lives.
    pub lives: u32,
    /// Event counters.
    pub tally: Tally,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:?} after {} ticks ({:.1}s), {} waves started",
            self.outcome,
            self.ticks,
            self.elapsed.as_secs_f32(),
            self.waves_started
        )?;
        writeln!(
            f,
            "score {}  gold {}  lives {}",
            self.score, self.gold, self.lives
        )?;
        write!(
            f,
            "kills {}  escapes {}  nuked {}  towers built {}  upgraded {}  sold {}  rejected {}",
            self.tally.kills,
            self.tally.escapes,
            self.tally.nuked,
            self.tally.towers_built,
            self.tally.towers_upgraded,
            self.tally.towers_sold,
            self.tally.placements_rejected
        )
    }
}

/// Drives one session tick by tick.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    builder: Builder,
    spawning: Spawning,
    movement: Movement,
    targeting: TowerTargeting,
    combat: TowerCombat,
    script: VecDeque<ScriptEntry>,
    tick: Duration,
    ticks: u32,
    pending: Vec<Event>,
    commands: Vec<Command>,
    targets: Vec<TowerTarget>,
    tally: Tally,
}

impl Simulation {
    /// Creates a simulation over the provided terrain.
    #[must_use]
    pub fn new(settings: &Settings, terrain: TerrainMap) -> Self {
        Self {
            world: World::new(terrain, settings.world),
            builder: Builder::new(),
            spawning: Spawning::new(settings.spawning),
            movement: Movement,
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            script: settings.script.iter().copied().collect(),
            tick: settings.tick,
            ticks: 0,
            pending: Vec::new(),
            commands: Vec::new(),
            targets: Vec::new(),
            tally: Tally::default(),
        }
    }

    /// Read-only access to the simulated world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Advances the session by one tick and returns its state afterwards.
    pub fn step(&mut self) -> GameOutcome {
        let mut events = std::mem::take(&mut self.pending);
        let carried = events.len();
        let mut commands = std::mem::take(&mut self.commands);

        world::apply(&mut self.world, Command::Tick { dt: self.tick }, &mut events);
        self.play_script(&events, &mut commands);
        self.execute(&mut commands, &mut events);

        let seen_by_spawning = events.len();
        self.spawning
            .handle(&events, query::outcome(&self.world), &mut commands);
        self.execute(&mut commands, &mut events);

        let creeps = query::creep_view(&self.world);
        self.movement
            .handle(&events, &creeps, &mut self.world, &mut commands);
        self.execute(&mut commands, &mut events);

        let outcome = query::outcome(&self.world);
        self.targeting.handle(
            outcome,
            &query::tower_view(&self.world),
            &query::creep_view(&self.world),
            query::geometry(&self.world),
            &mut self.targets,
        );
        self.combat.handle(
            outcome,
            query::now(&self.world),
            query::tower_view(&self.world),
            &self.targets,
            &mut commands,
        );
        self.execute(&mut commands, &mut events);

        self.tally.record(&events[carried..]);
        self.pending = events.split_off(seen_by_spawning);
        self.commands = commands;
        self.ticks += 1;

        query::outcome(&self.world)
    }

    /// Runs until the session ends or `max_ticks` ticks elapsed.
    pub fn run(&mut self, max_ticks: u32) -> Report {
        tracing::info!(max_ticks, "simulation started");
        while self.ticks < max_ticks {
            if !self.step().is_in_progress() {
                break;
            }
        }

        let report = self.report();
        tracing::info!(
            ticks = report.ticks,
            outcome = ?report.outcome,
            score = report.score,
            "simulation finished"
        );
        report
    }

    /// Summarises the session so far.
    #[must_use]
    pub fn report(&self) -> Report {
        Report {
            ticks: self.ticks,
            elapsed: query::now(&self.world),
            outcome: query::outcome(&self.world),
            waves_started: self.spawning.next_wave().saturating_sub(1),
            score: query::score(&self.world),
            gold: query::gold(&self.world),
            lives: query::lives(&self.world),
            tally: self.tally,
        }
    }

    fn play_script(&mut self, events: &[Event], out: &mut Vec<Command>) {
        let mut acted = false;
        while let Some(entry) = self
            .script
            .front()
            .copied()
            .filter(|entry| entry.tick <= self.ticks)
        {
            let _ = self.script.pop_front();
            let preview = match entry.action {
                ScriptedAction::Build { kind, column, row } => {
                    let cell = CellCoord::new(column, row);
                    let legality = self.legality(cell);
                    Some(PlacementPreview::new(
                        kind,
                        cell,
                        query::gold(&self.world),
                        legality,
                    ))
                }
                _ => None,
            };
            if let Some(rejection) = preview.and_then(|preview| preview.rejection) {
                tracing::warn!(tick = self.ticks, %rejection, "scripted build refused");
            }

            let input = BuilderInput {
                confirm_action: matches!(entry.action, ScriptedAction::Build { .. }),
                upgrade_action: matches!(entry.action, ScriptedAction::Upgrade { .. }),
                sell_action: matches!(entry.action, ScriptedAction::Sell { .. }),
                nuke_action: matches!(entry.action, ScriptedAction::Nuke),
                call_wave_action: matches!(entry.action, ScriptedAction::CallWave),
                cursor_cell: entry.action.cell(),
            };
            let world = &self.world;
            self.builder.handle(
                events,
                preview,
                input,
                |cell| query::tower_at(world, cell),
                out,
            );
            acted = true;
        }

        if !acted {
            self.builder
                .handle(events, None, BuilderInput::default(), |_| None, out);
        }
    }

    fn legality(&mut self, cell: CellCoord) -> Result<(), PlacementError> {
        match world::check_placement(&mut self.world, cell) {
            Ok(()) => Ok(()),
            Err(GateError::Rejected(error)) => Err(error),
            // The world repeats the check on placement and aborts the session.
            Err(GateError::CommittedRouteMissing { .. }) => Ok(()),
        }
    }

    fn execute(&mut self, commands: &mut Vec<Command>, events: &mut Vec<Event>) {
        for command in commands.drain(..) {
            world::apply(&mut self.world, command, events);
        }
    }
}
