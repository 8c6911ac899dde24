#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Creep Defence.
//!
//! The world owns the terrain, tower occupancy, the memo of known best paths
//! and every creep and tower. Adapters mutate it exclusively through
//! [`apply`]; systems read it through [`query`] and ask for routes through
//! [`next_hop`].

mod creeps;
mod gate;
mod occupancy;
mod pathfinding;
mod terrain;
mod towers;

use std::time::Duration;

use creep_defence_core::{
    CellCoord, Command, CreepId, CreepStats, Event, GameOutcome, GridGeometry, PixelPoint,
    PlacementError, RemovalError, SessionAbort, TowerId, TowerKind, TowerModifiers, TowerStats,
    UpgradeError,
};

use crate::{
    creeps::CreepRoster,
    gate::{Gate, LegalityCache},
    occupancy::Occupancy,
    pathfinding::PathMemo,
    towers::TowerRegistry,
};

pub use gate::GateError;
pub use pathfinding::{octile_distance, PathError, DIAGONAL_STEP_COST, ORTHOGONAL_STEP_COST};
pub use terrain::{TerrainError, TerrainMap};

/// Session settings that survive a new game.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldConfig {
    /// Side length of a cell in pixels.
    pub cell_length: f32,
    /// Gold available when a session starts.
    pub starting_gold: u32,
    /// Lives available when a session starts.
    pub starting_lives: u32,
    /// Nukes available when a session starts.
    pub starting_nukes: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cell_length: 20.0,
            starting_gold: 200,
            starting_lives: 20,
            starting_nukes: 3,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Economy {
    gold: u32,
    lives: u32,
    score: u32,
    nukes: u32,
}

impl Economy {
    fn new(config: &WorldConfig) -> Self {
        Self {
            gold: config.starting_gold,
            lives: config.starting_lives,
            score: 0,
            nukes: config.starting_nukes,
        }
    }
}

/// Represents the authoritative Creep Defence world state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    geometry: GridGeometry,
    terrain: TerrainMap,
    occupancy: Occupancy,
    memo: PathMemo,
    legality: LegalityCache,
    creeps: CreepRoster,
    towers: TowerRegistry,
    economy: Economy,
    outcome: GameOutcome,
    now: Duration,
}

impl World {
    /// Creates a world over the provided terrain.
    ///
    /// # Panics
    ///
    /// Panics when `config.cell_length` is not positive.
    #[must_use]
    pub fn new(terrain: TerrainMap, config: WorldConfig) -> Self {
        let geometry = GridGeometry::new(terrain.columns(), terrain.rows(), config.cell_length);
        Self {
            occupancy: Occupancy::new(geometry),
            memo: PathMemo::new(terrain.exit()),
            legality: LegalityCache::new(geometry),
            creeps: CreepRoster::new(),
            towers: TowerRegistry::new(),
            economy: Economy::new(&config),
            outcome: GameOutcome::InProgress,
            now: Duration::ZERO,
            config,
            geometry,
            terrain,
        }
    }

    fn restart(&mut self, terrain: TerrainMap) {
        let exit = terrain.exit();
        self.terrain = terrain;
        self.occupancy = Occupancy::new(self.geometry);
        self.legality = LegalityCache::new(self.geometry);
        let _ = self.memo.reset(exit);
        self.creeps = CreepRoster::new();
        self.towers = TowerRegistry::new();
        self.economy = Economy::new(&self.config);
        self.outcome = GameOutcome::InProgress;
        self.now = Duration::ZERO;
    }

    fn invalidate_occupancy(&mut self, out_events: &mut Vec<Event>) {
        self.legality.clear();
        let epoch = self.memo.invalidate();
        out_events.push(Event::PathsInvalidated { epoch });
    }

    fn gate(&mut self, walker_cells: &[CellCoord], cell: CellCoord) -> Result<(), GateError> {
        Gate {
            geometry: &self.geometry,
            entrance: self.terrain.entrance(),
            exit: self.terrain.exit(),
            occupancy: &mut self.occupancy,
            memo: &mut self.memo,
            legality: &mut self.legality,
            walker_cells,
        }
        .check(cell)
    }

    fn abort(&mut self, reason: SessionAbort, out_events: &mut Vec<Event>) {
        if !self.outcome.is_in_progress() {
            return;
        }
        tracing::error!(%reason, "session aborted");
        self.outcome = GameOutcome::Aborted;
        out_events.push(Event::SessionAborted { reason });
    }

    fn place_tower(&mut self, kind: TowerKind, cell: CellCoord, out_events: &mut Vec<Event>) {
        let rejection = if !self.outcome.is_in_progress() {
            Some(PlacementError::GameOver)
        } else if self.economy.gold < kind.cost() {
            Some(PlacementError::InsufficientGold)
        } else {
            let walkers = self.creeps.walker_cells();
            match self.gate(&walkers, cell) {
                Ok(()) => None,
                Err(GateError::Rejected(reason)) => Some(reason),
                Err(GateError::CommittedRouteMissing { source }) => {
                    let PathError::Unreachable { start } = source;
                    self.abort(
                        SessionAbort::PathfindingFailed { creep: None, cell: start },
                        out_events,
                    );
                    Some(PlacementError::GameOver)
                }
            }
        };

        if let Some(reason) = rejection {
            tracing::warn!(?kind, ?cell, %reason, "tower placement rejected");
            out_events.push(Event::TowerPlacementRejected { kind, cell, reason });
            return;
        }

        let modifiers = self
            .terrain
            .terrain_at(cell)
            .map(|terrain| terrain.tower_modifiers())
            .unwrap_or(TowerModifiers::NEUTRAL);
        let stats = TowerStats::modified(kind, modifiers);
        let tower = self.towers.insert(kind, cell, stats);
        if !self.occupancy.place(cell, tower) {
            let _ = self.towers.remove(tower);
            out_events.push(Event::TowerPlacementRejected {
                kind,
                cell,
                reason: PlacementError::Occupied,
            });
            return;
        }
        self.economy.gold -= kind.cost();
        tracing::info!(?kind, ?cell, tower = tower.get(), gold = self.economy.gold, "tower placed");
        out_events.push(Event::TowerPlaced { tower, kind, cell });
        self.invalidate_occupancy(out_events);
    }

    fn sell_tower(&mut self, tower: TowerId, out_events: &mut Vec<Event>) {
        if !self.outcome.is_in_progress() {
            out_events.push(Event::TowerSaleRejected {
                tower,
                reason: RemovalError::GameOver,
            });
            return;
        }
        let Some(state) = self.towers.remove(tower) else {
            tracing::warn!(tower = tower.get(), "sale requested for a missing tower");
            out_events.push(Event::TowerSaleRejected {
                tower,
                reason: RemovalError::MissingTower,
            });
            return;
        };

        let _ = self.occupancy.clear(state.cell);
        let refund = state.snapshot().refund();
        self.economy.gold = self.economy.gold.saturating_add(refund);
        tracing::info!(tower = tower.get(), cell = ?state.cell, refund, "tower sold");
        out_events.push(Event::TowerSold {
            tower,
            cell: state.cell,
            refund,
        });
        self.invalidate_occupancy(out_events);
    }

    fn upgrade_tower(&mut self, tower: TowerId, out_events: &mut Vec<Event>) {
        let gold = self.economy.gold;
        let rejection = if !self.outcome.is_in_progress() {
            Some(UpgradeError::GameOver)
        } else {
            match self.towers.get(tower) {
                None => Some(UpgradeError::MissingTower),
                Some(state) if gold < state.upgrade_cost => Some(UpgradeError::InsufficientGold),
                Some(_) => None,
            }
        };
        if let Some(reason) = rejection {
            tracing::warn!(tower = tower.get(), %reason, "tower upgrade rejected");
            out_events.push(Event::TowerUpgradeRejected { tower, reason });
            return;
        }
        let Some(state) = self.towers.get_mut(tower) else {
            return;
        };
        let cost = state.upgrade();
        let level = state.level;
        self.economy.gold -= cost;
        tracing::info!(tower = tower.get(), level, cost, gold = self.economy.gold, "tower upgraded");
        out_events.push(Event::TowerUpgraded { tower, level, cost });
    }

    fn spawn_creep(&mut self, stats: CreepStats, out_events: &mut Vec<Event>) {
        let entrance = self.terrain.entrance();
        let position = self.geometry.center_of(entrance);
        let description = stats.describe();
        let creep = self.creeps.spawn(stats, position, entrance, self.now);
        tracing::debug!(creep = creep.get(), %description, "creep spawned");
        out_events.push(Event::CreepSpawned {
            creep,
            cell: entrance,
        });
    }

    fn move_creep(&mut self, creep: CreepId, position: PixelPoint, out_events: &mut Vec<Event>) {
        let now = self.now;
        let position = self.geometry.clamp(position);
        let cell = self.geometry.cell_of(position);
        let Some(state) = self.creeps.get_mut(creep) else {
            return;
        };
        let from = state.cell;
        state.position = position;
        state.cell = cell;
        state.last_update = now;
        if from != cell {
            out_events.push(Event::CreepEnteredCell {
                creep,
                from,
                to: cell,
            });
        }
    }

    fn escape_creep(&mut self, creep: CreepId, out_events: &mut Vec<Event>) {
        let exit = self.terrain.exit();
        match self.creeps.get(creep) {
            Some(state) if state.cell == exit => {}
            Some(state) => {
                tracing::warn!(creep = creep.get(), cell = ?state.cell, "escape requested away from the exit");
                return;
            }
            None => return,
        }
        let _ = self.creeps.remove(creep);
        self.economy.lives = self.economy.lives.saturating_sub(1);
        out_events.push(Event::CreepEscaped {
            creep,
            lives_remaining: self.economy.lives,
        });

        if self.economy.lives == 0 {
            tracing::info!(score = self.economy.score, "game lost");
            self.outcome = GameOutcome::Lost;
            out_events.push(Event::GameLost);
        }
    }

    fn fire_at(&mut self, tower: TowerId, creep: CreepId, out_events: &mut Vec<Event>) {
        let now = self.now;
        let cell_length = self.geometry.cell_length();
        let Some(shooter) = self.towers.get(tower).map(|state| state.snapshot()) else {
            return;
        };
        let Some(target) = self.creeps.get(creep).map(|state| state.position) else {
            return;
        };
        let origin = self.geometry.center_of(shooter.cell);
        let in_range = origin.distance(target) < shooter.stats.range_cells * cell_length;
        if !shooter.weapon_ready(now) || !in_range {
            tracing::trace!(tower = tower.get(), creep = creep.get(), "shot discarded");
            return;
        }

        if let Some(state) = self.towers.get_mut(tower) {
            state.record_shot(now);
        }
        let damage = shooter.stats.damage;
        out_events.push(Event::TowerFired {
            tower,
            creep,
            damage,
        });

        let struck: Vec<CreepId> = match shooter.kind.splash_radius_in_cells() {
            Some(radius) => {
                let reach = radius * cell_length;
                self.creeps
                    .iter()
                    .filter(|other| other.position.distance(target) <= reach)
                    .map(|other| other.id)
                    .collect()
            }
            None => vec![creep],
        };
        for victim in struck {
            self.damage_creep(victim, damage, out_events);
        }
    }

    fn damage_creep(&mut self, creep: CreepId, damage: u32, out_events: &mut Vec<Event>) {
        let killed = match self.creeps.get_mut(creep) {
            Some(state) => {
                state.health = state.health.saturating_sub(damage);
                state.health.is_zero()
            }
            None => false,
        };
        if killed {
            if let Some(dead) = self.creeps.remove(creep) {
                let bounty = dead.stats.value;
                self.economy.gold = self.economy.gold.saturating_add(bounty);
                self.economy.score = self.economy.score.saturating_add(bounty);
                out_events.push(Event::CreepKilled { creep, bounty });
            }
        }
    }

    fn nuke(&mut self, out_events: &mut Vec<Event>) {
        if self.economy.nukes == 0 {
            tracing::warn!("nuke requested with none left");
            return;
        }
        self.economy.nukes -= 1;
        let cleared = u32::try_from(self.creeps.clear()).unwrap_or(u32::MAX);
        tracing::info!(cleared, remaining = self.economy.nukes, "nuke detonated");
        out_events.push(Event::NukeDetonated {
            cleared,
            remaining: self.economy.nukes,
        });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Once the session is lost or aborted only [`Command::NewGame`] has an
/// effect; build, sale and upgrade requests are answered with a `GameOver`
/// rejection.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if !world.outcome.is_in_progress() {
        match command {
            Command::NewGame { .. }
            | Command::PlaceTower { .. }
            | Command::SellTower { .. }
            | Command::UpgradeTower { .. } => {}
            _ => return,
        }
    }

    match command {
        Command::NewGame { seed } => {
            match TerrainMap::generate(world.geometry.columns(), world.geometry.rows(), seed) {
                Ok(terrain) => world.restart(terrain),
                Err(error) => {
                    tracing::error!(%error, "new game could not generate terrain");
                    return;
                }
            }
            tracing::info!(seed, "new game started");
            out_events.push(Event::NewGameStarted {
                entrance: world.terrain.entrance(),
                exit: world.terrain.exit(),
            });
        }
        Command::Tick { dt } => {
            world.now = world.now.saturating_add(dt);
            out_events.push(Event::TimeAdvanced {
                dt,
                now: world.now,
            });
        }
        Command::SpawnCreep { stats } => world.spawn_creep(stats, out_events),
        Command::MoveCreep { creep, position } => world.move_creep(creep, position, out_events),
        Command::EscapeCreep { creep } => world.escape_creep(creep, out_events),
        Command::AbortSession { reason } => world.abort(reason, out_events),
        Command::PlaceTower { kind, cell } => world.place_tower(kind, cell, out_events),
        Command::SellTower { tower } => world.sell_tower(tower, out_events),
        Command::UpgradeTower { tower } => world.upgrade_tower(tower, out_events),
        Command::FireAt { tower, creep } => world.fire_at(tower, creep, out_events),
        Command::Nuke => world.nuke(out_events),
        Command::CallWaveEarly => out_events.push(Event::WaveCallRequested),
        Command::AwardBonus { points } => {
            world.economy.score = world.economy.score.saturating_add(points);
            out_events.push(Event::BonusAwarded {
                points,
                score: world.economy.score,
            });
        }
    }
}

/// Decides whether a tower may be built on `cell` under the current state.
///
/// Used by build previews; [`Command::PlaceTower`] runs the same check before
/// committing. The path memo is left invalidated afterward.
///
/// # Panics
///
/// Panics when called while another placement check is in flight.
pub fn check_placement(world: &mut World, cell: CellCoord) -> Result<(), GateError> {
    let walkers = world.creeps.walker_cells();
    world.gate(&walkers, cell)
}

/// First hop of a shortest route from `start` to the exit under committed
/// occupancy, memoized for the current epoch.
///
/// # Panics
///
/// Panics when `start` lies outside the grid.
pub fn next_hop(world: &mut World, start: CellCoord) -> Result<CellCoord, PathError> {
    let occupancy = &world.occupancy;
    pathfinding::next_hop(&mut world.memo, &world.geometry, start, |cell| {
        occupancy.is_walkable(cell)
    })
}

/// Discards every memoized path and returns the epoch that was opened.
pub fn invalidate_paths(world: &mut World) -> u64 {
    world.memo.invalidate()
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::{TerrainMap, World};
    use creep_defence_core::{
        CellCoord, CreepId, CreepSnapshot, CreepStats, CreepView, GameOutcome, GridGeometry,
        TerrainKind, TowerId, TowerSnapshot, TowerView,
    };

    /// Provides read-only access to the grid geometry.
    #[must_use]
    pub fn geometry(world: &World) -> &GridGeometry {
        &world.geometry
    }

    /// Provides read-only access to the terrain map.
    #[must_use]
    pub fn terrain(world: &World) -> &TerrainMap {
        &world.terrain
    }

    /// Terrain of the cell, or `None` outside the map.
    #[must_use]
    pub fn terrain_at(world: &World, cell: CellCoord) -> Option<TerrainKind> {
        world.terrain.terrain_at(cell)
    }

    /// Cell where creeps enter.
    #[must_use]
    pub fn entrance(world: &World) -> CellCoord {
        world.terrain.entrance()
    }

    /// Cell creeps try to reach.
    #[must_use]
    pub fn exit(world: &World) -> CellCoord {
        world.terrain.exit()
    }

    /// Reports whether a committed tower or the hypothetical cell blocks `cell`.
    #[must_use]
    pub fn is_blocked(world: &World, cell: CellCoord) -> bool {
        world.occupancy.is_blocked(cell)
    }

    /// Reports whether a creep may stand on `cell`.
    #[must_use]
    pub fn is_walkable(world: &World, cell: CellCoord) -> bool {
        world.occupancy.is_walkable(cell)
    }

    /// Speed multiplier the creep experiences on `cell`.
    #[must_use]
    pub fn speed_multiplier(world: &World, stats: &CreepStats, cell: CellCoord) -> f32 {
        stats.speed_multiplier(world.terrain.terrain_at(cell))
    }

    /// Tower standing on the cell, if any.
    #[must_use]
    pub fn tower_at(world: &World, cell: CellCoord) -> Option<TowerId> {
        world.occupancy.tower_at(cell)
    }

    /// Hypothetical cell currently under consideration.
    #[must_use]
    pub fn considering(world: &World) -> Option<CellCoord> {
        world.occupancy.considering()
    }

    /// Number of learned entries in the path memo.
    #[must_use]
    pub fn memo_len(world: &World) -> usize {
        world.memo.len()
    }

    /// Identifier of the open path epoch.
    #[must_use]
    pub fn path_epoch(world: &World) -> u64 {
        world.memo.epoch()
    }

    /// Memoized first hop of the cell in the current epoch.
    #[must_use]
    pub fn memoized_hop(world: &World, cell: CellCoord) -> Option<CellCoord> {
        world.memo.entry(cell).map(|entry| entry.next)
    }

    /// Captures a read-only view of the creeps inside the maze.
    #[must_use]
    pub fn creep_view(world: &World) -> CreepView {
        CreepView::from_snapshots(world.creeps.iter().map(|creep| creep.snapshot()).collect())
    }

    /// Snapshot of a single creep.
    #[must_use]
    pub fn creep(world: &World, creep: CreepId) -> Option<CreepSnapshot> {
        world.creeps.get(creep).map(|state| state.snapshot())
    }

    /// Captures a read-only view of the towers inside the maze.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(world.towers.iter().map(|tower| tower.snapshot()).collect())
    }

    /// Snapshot of a single tower.
    #[must_use]
    pub fn tower(world: &World, tower: TowerId) -> Option<TowerSnapshot> {
        world.towers.get(tower).map(|state| state.snapshot())
    }

    /// Gold available to the player.
    #[must_use]
    pub fn gold(world: &World) -> u32 {
        world.economy.gold
    }

    /// Lives left.
    #[must_use]
    pub fn lives(world: &World) -> u32 {
        world.economy.lives
    }

    /// Current score.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.economy.score
    }

    /// Nukes left.
    #[must_use]
    pub fn nukes(world: &World) -> u32 {
        world.economy.nukes
    }

    /// State of the session.
    #[must_use]
    pub fn outcome(world: &World) -> GameOutcome {
        world.outcome
    }

    /// Simulated time since the session started.
    #[must_use]
    pub fn now(world: &World) -> Duration {
        world.now
    }
}
