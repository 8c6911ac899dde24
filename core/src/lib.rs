#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Creep Defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Creep Defence.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Discards the running session and starts a new one on a freshly generated map.
    NewGame {
        /// Seed used to generate the terrain of the new map.
        seed: u64,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a creep with the provided stats enter at the map entrance.
    SpawnCreep {
        /// Stats of the creep, with every trait already applied.
        stats: CreepStats,
    },
    /// Moves a creep to a new continuous position.
    MoveCreep {
        /// Identifier of the creep being moved.
        creep: CreepId,
        /// Destination expressed in pixel space.
        position: PixelPoint,
    },
    /// Reports that a creep stands on the exit cell and must leave the maze.
    EscapeCreep {
        /// Identifier of the escaping creep.
        creep: CreepId,
    },
    /// Ends the session because an unrecoverable invariant was violated.
    AbortSession {
        /// Reason recorded for the abort.
        reason: SessionAbort,
    },
    /// Requests construction of a tower on the provided cell.
    PlaceTower {
        /// Type of tower to construct.
        kind: TowerKind,
        /// Cell the tower would occupy.
        cell: CellCoord,
    },
    /// Requests the sale of an existing tower.
    SellTower {
        /// Identifier of the tower being sold.
        tower: TowerId,
    },
    /// Requests that an existing tower be upgraded to its next level.
    UpgradeTower {
        /// Identifier of the tower being upgraded.
        tower: TowerId,
    },
    /// Requests that a tower strike a creep.
    FireAt {
        /// Tower firing the shot.
        tower: TowerId,
        /// Creep receiving the hit.
        creep: CreepId,
    },
    /// Detonates a nuke that removes every creep without paying bounties.
    Nuke,
    /// Asks for the next wave to start before its timer runs out.
    CallWaveEarly,
    /// Adds bonus points to the score.
    AwardBonus {
        /// Points added to the score.
        points: u32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that a new session started on a freshly generated map.
    NewGameStarted {
        /// Entrance cell of the new map.
        entrance: CellCoord,
        /// Exit cell of the new map.
        exit: CellCoord,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
        /// Simulated time after the tick was applied.
        now: Duration,
    },
    /// Confirms that a creep entered the maze.
    CreepSpawned {
        /// Identifier assigned to the creep.
        creep: CreepId,
        /// Cell the creep occupies after spawning.
        cell: CellCoord,
    },
    /// Reports that a creep crossed from one cell into another.
    CreepEnteredCell {
        /// Identifier of the creep that moved.
        creep: CreepId,
        /// Cell the creep occupied before moving.
        from: CellCoord,
        /// Cell the creep occupies after moving.
        to: CellCoord,
    },
    /// Reports that a creep ran out of health.
    CreepKilled {
        /// Identifier of the creep that died.
        creep: CreepId,
        /// Gold and score paid for the kill.
        bounty: u32,
    },
    /// Reports that a creep reached the exit.
    CreepEscaped {
        /// Identifier of the escaped creep.
        creep: CreepId,
        /// Lives left after the escape was accounted for.
        lives_remaining: u32,
    },
    /// Confirms that a tower was placed into the world.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Type of tower that was placed.
        kind: TowerKind,
        /// Cell occupied by the tower.
        cell: CellCoord,
    },
    /// Confirms that a tower was sold.
    TowerSold {
        /// Identifier of the tower that was sold.
        tower: TowerId,
        /// Cell released by the sale.
        cell: CellCoord,
        /// Gold returned to the player.
        refund: u32,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Type of tower requested for placement.
        kind: TowerKind,
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Reports that a tower sale request was rejected.
    TowerSaleRejected {
        /// Identifier of the tower targeted for sale.
        tower: TowerId,
        /// Specific reason the sale failed.
        reason: RemovalError,
    },
    /// Confirms that a tower was upgraded.
    TowerUpgraded {
        /// Identifier of the upgraded tower.
        tower: TowerId,
        /// Level reached by the upgrade.
        level: u32,
        /// Gold spent on the upgrade.
        cost: u32,
    },
    /// Reports that a tower upgrade request was rejected.
    TowerUpgradeRejected {
        /// Identifier of the tower targeted for the upgrade.
        tower: TowerId,
        /// Specific reason the upgrade failed.
        reason: UpgradeError,
    },
    /// Reports that a tower hit a creep.
    TowerFired {
        /// Tower that fired.
        tower: TowerId,
        /// Creep that was hit.
        creep: CreepId,
        /// Damage dealt by the hit.
        damage: u32,
    },
    /// Announces that every memoized path was discarded.
    PathsInvalidated {
        /// Epoch opened by the invalidation.
        epoch: u64,
    },
    /// Confirms that a nuke cleared the maze.
    NukeDetonated {
        /// Number of creeps removed by the blast.
        cleared: u32,
        /// Nukes left after the detonation.
        remaining: u32,
    },
    /// Forwards the player's request to start the next wave early.
    WaveCallRequested,
    /// Confirms that bonus points were added to the score.
    BonusAwarded {
        /// Points added to the score.
        points: u32,
        /// Score after the bonus.
        score: u32,
    },
    /// Announces that the player ran out of lives.
    GameLost,
    /// Announces that the session ended because of an invariant violation.
    SessionAborted {
        /// Reason recorded for the abort.
        reason: SessionAbort,
    },
}

/// Terminal and non-terminal states of a game session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOutcome {
    /// The session accepts ticks and player commands.
    InProgress,
    /// The player ran out of lives.
    Lost,
    /// The session stopped because an invariant was violated.
    Aborted,
}

impl GameOutcome {
    /// Reports whether the session still accepts simulation input.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::InProgress)
    }
}

/// Reasons the session may be aborted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum SessionAbort {
    /// A creep could not find any route to the exit on committed occupancy.
    #[error("no route to the exit from cell ({}, {}) on committed occupancy", cell.column(), cell.row())]
    PathfindingFailed {
        /// Creep whose route vanished, when the failure came from a creep.
        creep: Option<CreepId>,
        /// Cell the search started from.
        cell: CellCoord,
    },
}

/// Unique identifier assigned to a creep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreepId(u32);

impl CreepId {
    /// Creates a new creep identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Returns the cell displaced by the signed offsets, if it stays non-negative.
    #[must_use]
    pub fn offset(self, columns: i32, rows: i32) -> Option<CellCoord> {
        let column = self.column.checked_add_signed(columns)?;
        let row = self.row.checked_add_signed(rows)?;
        Some(CellCoord::new(column, row))
    }

    /// Reports whether `other` touches this cell orthogonally or diagonally.
    #[must_use]
    pub fn is_adjacent(self, other: CellCoord) -> bool {
        let column_diff = self.column.abs_diff(other.column);
        let row_diff = self.row.abs_diff(other.row);
        self != other && column_diff <= 1 && row_diff <= 1
    }
}

/// Continuous position measured in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    x: f32,
    y: f32,
}

impl PixelPoint {
    /// Creates a new pixel-space point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal component measured in pixels.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical component measured in pixels.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: PixelPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Moves toward `target` by at most `step` pixels, landing on it when closer.
    #[must_use]
    pub fn move_towards(self, target: PixelPoint, step: f32) -> PixelPoint {
        let distance = self.distance(target);
        if distance <= step || distance <= f32::EPSILON {
            return target;
        }

        let ratio = step / distance;
        PixelPoint::new(
            self.x + (target.x - self.x) * ratio,
            self.y + (target.y - self.y) * ratio,
        )
    }
}

/// Describes the square grid layout of the map and its pixel projection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    columns: u32,
    rows: u32,
    cell_length: f32,
}

impl GridGeometry {
    /// Creates a new grid description.
    ///
    /// # Panics
    ///
    /// Panics when `cell_length` is not a positive number; every pixel/cell
    /// conversion divides by it.
    #[must_use]
    pub fn new(columns: u32, rows: u32, cell_length: f32) -> Self {
        assert!(
            cell_length > 0.0,
            "grid cell length must be positive, got {cell_length}"
        );
        Self {
            columns,
            rows,
            cell_length,
        }
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a single square cell expressed in pixels.
    #[must_use]
    pub const fn cell_length(&self) -> f32 {
        self.cell_length
    }

    /// Total width of the grid measured in pixels.
    #[must_use]
    pub fn pixel_width(&self) -> f32 {
        self.columns as f32 * self.cell_length
    }

    /// Total height of the grid measured in pixels.
    #[must_use]
    pub fn pixel_height(&self) -> f32 {
        self.rows as f32 * self.cell_length
    }

    /// Number of cells contained in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Dense row-major index of the cell, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }

        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Cell containing the provided pixel position.
    ///
    /// Negative coordinates saturate to the first row or column.
    #[must_use]
    pub fn cell_of(&self, point: PixelPoint) -> CellCoord {
        let column = (point.x() / self.cell_length).floor() as u32;
        let row = (point.y() / self.cell_length).floor() as u32;
        CellCoord::new(column, row)
    }

    /// Pixel position of the centre of the provided cell.
    #[must_use]
    pub fn center_of(&self, cell: CellCoord) -> PixelPoint {
        let half = self.cell_length / 2.0;
        PixelPoint::new(
            cell.column() as f32 * self.cell_length + half,
            cell.row() as f32 * self.cell_length + half,
        )
    }

    /// Clamps a pixel position so that it stays inside the grid's last cells.
    #[must_use]
    pub fn clamp(&self, point: PixelPoint) -> PixelPoint {
        let margin = self.cell_length * 1.0e-3;
        let max_x = (self.pixel_width() - margin).max(0.0);
        let max_y = (self.pixel_height() - margin).max(0.0);
        PixelPoint::new(point.x().clamp(0.0, max_x), point.y().clamp(0.0, max_y))
    }
}

/// Static terrain assigned to a cell at map generation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Plain ground without modifiers.
    Neutral,
    /// Water slows most creeps.
    Water,
    /// Mountains slow creeps and extend tower range.
    Mountain,
    /// Power plants speed creeps up and double tower damage.
    PowerPlant,
    /// Cell where creeps enter the maze.
    Entrance,
    /// Cell creeps try to reach.
    Exit,
}

impl TerrainKind {
    /// Every terrain kind in affinity-table order.
    pub const ALL: [TerrainKind; 6] = [
        TerrainKind::Neutral,
        TerrainKind::Water,
        TerrainKind::Mountain,
        TerrainKind::PowerPlant,
        TerrainKind::Entrance,
        TerrainKind::Exit,
    ];

    const fn slot(self) -> usize {
        match self {
            Self::Neutral => 0,
            Self::Water => 1,
            Self::Mountain => 2,
            Self::PowerPlant => 3,
            Self::Entrance => 4,
            Self::Exit => 5,
        }
    }

    /// Speed multiplier an unmodified creep experiences on this terrain.
    #[must_use]
    pub const fn baseline_speed(self) -> f32 {
        match self {
            Self::Water => 0.5,
            Self::Mountain => 0.75,
            Self::PowerPlant => 2.0,
            Self::Neutral | Self::Entrance | Self::Exit => 1.0,
        }
    }

    /// Modifiers applied to towers built on this terrain.
    #[must_use]
    pub const fn tower_modifiers(self) -> TowerModifiers {
        match self {
            Self::Mountain => TowerModifiers::new(1.25, 1.0, 1.0),
            Self::PowerPlant => TowerModifiers::new(1.0, 2.0, 1.0),
            _ => TowerModifiers::NEUTRAL,
        }
    }
}

/// Multipliers that terrain applies to tower statistics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerModifiers {
    range: f32,
    damage: f32,
    frequency: f32,
}

impl TowerModifiers {
    /// Modifiers that leave every statistic unchanged.
    pub const NEUTRAL: TowerModifiers = TowerModifiers::new(1.0, 1.0, 1.0);

    /// Creates a new modifier set.
    #[must_use]
    pub const fn new(range: f32, damage: f32, frequency: f32) -> Self {
        Self {
            range,
            damage,
            frequency,
        }
    }

    /// Multiplier applied to tower range.
    #[must_use]
    pub const fn range(&self) -> f32 {
        self.range
    }

    /// Multiplier applied to tower damage.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Multiplier applied to the tower reload interval.
    #[must_use]
    pub const fn frequency(&self) -> f32 {
        self.frequency
    }
}

/// Per-terrain speed multipliers of a creep variant.
///
/// The table starts from [`TerrainKind::baseline_speed`]; creep traits
/// overwrite individual entries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainAffinity {
    multipliers: [f32; 6],
}

impl TerrainAffinity {
    /// Affinity of a creep without terrain-related traits.
    #[must_use]
    pub fn baseline() -> Self {
        let mut multipliers = [1.0; 6];
        for kind in TerrainKind::ALL {
            multipliers[kind.slot()] = kind.baseline_speed();
        }
        Self { multipliers }
    }

    /// Affinity that ignores terrain entirely.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            multipliers: [1.0; 6],
        }
    }

    /// Speed multiplier applied on the provided terrain.
    #[must_use]
    pub const fn multiplier(&self, kind: TerrainKind) -> f32 {
        self.multipliers[kind.slot()]
    }

    /// Returns a copy with the entry for `kind` replaced.
    #[must_use]
    pub const fn with(mut self, kind: TerrainKind, multiplier: f32) -> Self {
        self.multipliers[kind.slot()] = multiplier;
        self
    }
}

impl Default for TerrainAffinity {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Hit points carried by a creep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u32);

impl Health {
    /// Creates a health value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Remaining hit points.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Subtracts damage, stopping at zero.
    #[must_use]
    pub const fn saturating_sub(self, damage: u32) -> Self {
        Self(self.0.saturating_sub(damage))
    }

    /// Reports whether no hit points remain.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// Modifier applied once to a creep's base stats when it is constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreepTrait {
    /// Ignores the maze and flies straight at the exit.
    Flying,
    /// Crawls through water.
    WaterAdverse,
    /// Speeds through water.
    WaterLoving,
    /// Crawls over mountains.
    MountainAdverse,
    /// Speeds over mountains.
    MountainLoving,
    /// Ignores terrain effects entirely.
    Immune,
    /// Doubles health.
    Strong,
    /// Faster but frailer.
    Quick,
    /// Wave boss with massive health and bounty.
    Boss,
}

impl CreepTrait {
    /// Applies the trait to the provided stats.
    #[must_use]
    pub fn apply(self, mut stats: CreepStats) -> CreepStats {
        match self {
            Self::Flying => {
                stats.affinity = stats
                    .affinity
                    .with(TerrainKind::Water, 1.0)
                    .with(TerrainKind::Mountain, 1.0);
                stats.flying = true;
            }
            Self::WaterAdverse => stats.affinity = stats.affinity.with(TerrainKind::Water, 0.25),
            Self::WaterLoving => stats.affinity = stats.affinity.with(TerrainKind::Water, 2.0),
            Self::MountainAdverse => {
                stats.affinity = stats.affinity.with(TerrainKind::Mountain, 0.25);
            }
            Self::MountainLoving => {
                stats.affinity = stats.affinity.with(TerrainKind::Mountain, 1.25);
            }
            Self::Immune => stats.affinity = TerrainAffinity::neutral(),
            Self::Strong => {
                stats.health = scale_health(stats.health, 2.0);
                stats.value = scale_value(stats.value, 1.5);
            }
            Self::Quick => {
                stats.speed *= 1.5;
                stats.health = scale_health(stats.health, 0.75);
                stats.value = scale_value(stats.value, 1.25);
            }
            Self::Boss => {
                stats.health = scale_health(stats.health, 10.0);
                stats.value = scale_value(stats.value, 20.0);
            }
        }
        stats.traits.push(self);
        stats
    }

    /// Human readable prefix describing the trait.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Flying => "Flying",
            Self::WaterAdverse => "Water-Hating",
            Self::WaterLoving => "Water-Loving",
            Self::MountainAdverse => "Mountain-Hating",
            Self::MountainLoving => "Mountain-Loving",
            Self::Immune => "Immune",
            Self::Strong => "Strong",
            Self::Quick => "Quick",
            Self::Boss => "Boss",
        }
    }
}

fn scale_health(health: Health, factor: f64) -> Health {
    Health::new((f64::from(health.get()) * factor).floor() as u32)
}

fn scale_value(value: u32, factor: f64) -> u32 {
    (f64::from(value) * factor).floor() as u32
}

/// Base creep health before wave scaling.
pub const CREEP_BASE_HEALTH: u32 = 10;
/// Base creep bounty before wave scaling.
pub const CREEP_BASE_VALUE: u32 = 1;
/// Base creep speed in pixels per second.
pub const CREEP_BASE_SPEED: f32 = 50.0;

/// Statistics of a creep after every trait has been applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreepStats {
    /// Hit points the creep spawns with.
    pub health: Health,
    /// Gold and score paid when the creep is killed.
    pub value: u32,
    /// Base speed in pixels per second.
    pub speed: f32,
    /// Per-terrain speed multipliers.
    pub affinity: TerrainAffinity,
    /// Indicates whether the creep ignores the maze.
    pub flying: bool,
    /// Traits applied in construction order.
    pub traits: Vec<CreepTrait>,
}

impl CreepStats {
    /// Stats of a plain creep belonging to the provided wave.
    #[must_use]
    pub fn for_wave(wave: u32) -> Self {
        let exponent = i32::try_from(wave).unwrap_or(i32::MAX);
        let health = (f64::from(CREEP_BASE_HEALTH) * 1.4_f64.powi(exponent)).floor();
        Self {
            health: Health::new(health.min(f64::from(u32::MAX)) as u32),
            value: CREEP_BASE_VALUE.saturating_add(wave),
            speed: CREEP_BASE_SPEED,
            affinity: TerrainAffinity::baseline(),
            flying: false,
            traits: Vec::new(),
        }
    }

    /// Applies each trait once, in order.
    #[must_use]
    pub fn with_traits(self, traits: &[CreepTrait]) -> Self {
        traits
            .iter()
            .fold(self, |stats, creep_trait| creep_trait.apply(stats))
    }

    /// Speed multiplier on the provided terrain; flying creeps ignore terrain.
    #[must_use]
    pub fn speed_multiplier(&self, terrain: Option<TerrainKind>) -> f32 {
        if self.flying {
            return 1.0;
        }
        terrain.map_or(1.0, |kind| self.affinity.multiplier(kind))
    }

    /// Descriptive name composed from the applied traits.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut name = String::new();
        for creep_trait in self.traits.iter().rev() {
            name.push_str(creep_trait.label());
            name.push(' ');
        }
        name.push_str("Creep");
        name
    }
}

/// Types of towers that can be constructed in the maze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerKind {
    /// Slow, devastating long range tower.
    Missile,
    /// Balanced heavy tower.
    Cannon,
    /// Cheap rapid-fire tower.
    Laser,
    /// Very rapid short range tower.
    Gatling,
}

impl TowerKind {
    /// Every buildable tower kind.
    pub const ALL: [TowerKind; 4] = [
        TowerKind::Missile,
        TowerKind::Cannon,
        TowerKind::Laser,
        TowerKind::Gatling,
    ];

    /// Targeting range measured in cells from the tower centre.
    #[must_use]
    pub const fn range_in_cells(self) -> f32 {
        match self {
            Self::Missile => 5.5,
            Self::Cannon | Self::Laser => 4.0,
            Self::Gatling => 3.5,
        }
    }

    /// Damage dealt by a single hit.
    #[must_use]
    pub const fn damage(self) -> u32 {
        match self {
            Self::Missile => 5_000,
            Self::Cannon => 100,
            Self::Laser => 10,
            Self::Gatling => 50,
        }
    }

    /// Interval the tower waits between shots.
    #[must_use]
    pub const fn reload(self) -> Duration {
        match self {
            Self::Missile => Duration::from_millis(2_000),
            Self::Cannon => Duration::from_millis(1_000),
            Self::Laser => Duration::from_millis(250),
            Self::Gatling => Duration::from_millis(100),
        }
    }

    /// Gold required to build the tower.
    #[must_use]
    pub const fn cost(self) -> u32 {
        match self {
            Self::Missile => 100,
            Self::Cannon => 75,
            Self::Laser => 25,
            Self::Gatling => 50,
        }
    }

    /// Nominal value of a freshly built tower; sales refund three quarters of it.
    #[must_use]
    pub const fn sale_value(self) -> u32 {
        match self {
            Self::Missile => 100,
            Self::Cannon | Self::Gatling => 50,
            Self::Laser => 13,
        }
    }

    /// Gold returned when a freshly built tower is sold.
    #[must_use]
    pub const fn refund(self) -> u32 {
        sale_refund(self.sale_value())
    }

    /// Price of the first upgrade.
    #[must_use]
    pub const fn upgrade_cost(self) -> u32 {
        match self {
            Self::Missile => 100,
            Self::Cannon => 75,
            Self::Laser | Self::Gatling => 25,
        }
    }

    /// Burst pattern of towers that pause after a fixed number of shots.
    #[must_use]
    pub const fn volley(self) -> Option<Volley> {
        match self {
            Self::Gatling => Some(Volley {
                shots: 12,
                pause: Duration::from_millis(2_000),
            }),
            Self::Missile | Self::Cannon | Self::Laser => None,
        }
    }

    /// Radius, in cells, around the struck creep that every hit also damages.
    #[must_use]
    pub const fn splash_radius_in_cells(self) -> Option<f32> {
        match self {
            Self::Cannon => Some(2.0),
            Self::Missile | Self::Laser | Self::Gatling => None,
        }
    }
}

/// Gold returned for a tower whose accumulated value is `sale_value`.
#[must_use]
pub const fn sale_refund(sale_value: u32) -> u32 {
    sale_value * 3 / 4
}

/// Burst-fire pattern: `shots` quick shots followed by a `pause`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volley {
    /// Shots fired before the pause.
    pub shots: u32,
    /// Time the tower waits after the last shot of a volley.
    pub pause: Duration,
}

/// Tower statistics after terrain modifiers were applied at placement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerStats {
    /// Targeting range measured in cells.
    pub range_cells: f32,
    /// Damage dealt by a single hit.
    pub damage: u32,
    /// Interval between shots.
    pub reload: Duration,
}

impl TowerStats {
    /// Computes the stats of `kind` standing on terrain with `modifiers`.
    #[must_use]
    pub fn modified(kind: TowerKind, modifiers: TowerModifiers) -> Self {
        let damage = (f64::from(kind.damage()) * f64::from(modifiers.damage())).floor();
        Self {
            range_cells: kind.range_in_cells() * modifiers.range(),
            damage: damage.min(f64::from(u32::MAX)) as u32,
            reload: kind.reload().mul_f32(modifiers.frequency()),
        }
    }

    /// Stats after one more upgrade of a `kind` tower.
    #[must_use]
    pub fn upgraded(self, kind: TowerKind) -> Self {
        const STEP: Duration = Duration::from_millis(10);
        let reload_millis = u64::try_from(self.reload.as_millis()).unwrap_or(u64::MAX);
        match kind {
            TowerKind::Missile => Self {
                range_cells: self.range_cells + 0.5,
                damage: self.damage.saturating_mul(5) / 2,
                reload: self.reload,
            },
            TowerKind::Cannon | TowerKind::Laser => Self {
                range_cells: self.range_cells + 0.25,
                damage: self.damage.saturating_mul(2),
                reload: self.reload.saturating_sub(STEP),
            },
            TowerKind::Gatling => Self {
                range_cells: self.range_cells + 0.5,
                damage: self.damage.saturating_mul(5) / 2,
                reload: Duration::from_millis(reload_millis.saturating_mul(95) / 100),
            },
        }
    }
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The requested cell lies outside the grid.
    #[error("cell lies outside the grid")]
    OutOfBounds,
    /// A tower already stands on the cell.
    #[error("cell is already occupied by a tower")]
    Occupied,
    /// The cell is the entrance or the exit.
    #[error("cell is reserved for the entrance or the exit")]
    Reserved,
    /// The tower would cut every route to the exit.
    #[error("tower would block every route to the exit")]
    BlocksPath,
    /// The player cannot afford the tower.
    #[error("not enough gold to build the tower")]
    InsufficientGold,
    /// The session has ended.
    #[error("the game is over")]
    GameOver,
}

/// Reasons a tower sale request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum RemovalError {
    /// No tower with the provided identifier exists.
    #[error("no tower with that identifier exists")]
    MissingTower,
    /// The session has ended.
    #[error("the game is over")]
    GameOver,
}

/// Reasons a tower upgrade request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum UpgradeError {
    /// No tower with the provided identifier exists.
    #[error("no tower with that identifier exists")]
    MissingTower,
    /// The player cannot afford the upgrade.
    #[error("not enough gold to upgrade the tower")]
    InsufficientGold,
    /// The session has ended.
    #[error("the game is over")]
    GameOver,
}

/// Immutable representation of a single creep's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct CreepSnapshot {
    /// Unique identifier assigned to the creep.
    pub id: CreepId,
    /// Continuous position in pixels.
    pub position: PixelPoint,
    /// Grid cell derived from the position on the last update.
    pub cell: CellCoord,
    /// Remaining hit points.
    pub health: Health,
    /// Base speed in pixels per second.
    pub speed: f32,
    /// Per-terrain speed multipliers.
    pub affinity: TerrainAffinity,
    /// Indicates whether the creep ignores the maze.
    pub flying: bool,
    /// Simulated time of the creep's last movement update.
    pub last_update: Duration,
}

/// Read-only snapshot describing all creeps within the maze.
#[derive(Clone, Debug, Default)]
pub struct CreepView {
    snapshots: Vec<CreepSnapshot>,
}

impl CreepView {
    /// Creates a new creep view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<CreepSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured creep snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &CreepSnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured creeps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no creeps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<CreepSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Kind of tower that was constructed.
    pub kind: TowerKind,
    /// Cell occupied by the tower.
    pub cell: CellCoord,
    /// Terrain-modified statistics.
    pub stats: TowerStats,
    /// Simulated time of the last shot, if the tower fired yet.
    pub fired_at: Option<Duration>,
    /// Upgrade level; freshly built towers are level 1.
    pub level: u32,
    /// Gold invested in the tower, including upgrades.
    pub sale_value: u32,
    /// Price of the next upgrade.
    pub upgrade_cost: u32,
    /// Shots remaining in the current volley. Always zero for towers without
    /// volleys.
    pub shots_left: u32,
}

impl TowerSnapshot {
    /// Reports whether the weapon may fire at `now`.
    ///
    /// A volley tower that spent its last shot waits out the volley pause;
    /// every other shot waits for the reload interval.
    #[must_use]
    pub fn weapon_ready(&self, now: Duration) -> bool {
        let Some(fired_at) = self.fired_at else {
            return true;
        };
        let wait = match self.kind.volley() {
            Some(volley) if self.shots_left == 0 => volley.pause,
            _ => self.stats.reload,
        };
        now.saturating_sub(fired_at) > wait
    }

    /// Gold returned if the tower were sold now.
    #[must_use]
    pub const fn refund(&self) -> u32 {
        sale_refund(self.sale_value)
    }
}

/// Read-only snapshot describing all towers placed within the maze.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Target assignment produced by the tower targeting system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerTarget {
    /// Tower that should fire.
    pub tower: TowerId,
    /// Creep selected as the target.
    pub creep: CreepId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn placement_error_round_trips_through_bincode() {
        assert_round_trip(&PlacementError::BlocksPath);
    }

    #[test]
    fn creep_stats_round_trip_through_bincode() {
        let stats = CreepStats::for_wave(3).with_traits(&[CreepTrait::Flying, CreepTrait::Quick]);
        assert_round_trip(&stats);
    }

    #[test]
    fn cell_of_floors_pixel_coordinates() {
        let geometry = GridGeometry::new(10, 4, 20.0);
        assert_eq!(
            geometry.cell_of(PixelPoint::new(39.9, 0.0)),
            CellCoord::new(1, 0)
        );
        assert_eq!(
            geometry.cell_of(PixelPoint::new(40.0, 79.0)),
            CellCoord::new(2, 3)
        );
        assert_eq!(
            geometry.cell_of(PixelPoint::new(-5.0, -1.0)),
            CellCoord::new(0, 0)
        );
    }

    #[test]
    fn center_of_is_inverse_of_cell_of() {
        let geometry = GridGeometry::new(6, 6, 16.0);
        let cell = CellCoord::new(4, 2);
        let center = geometry.center_of(cell);
        assert_eq!(center, PixelPoint::new(72.0, 40.0));
        assert_eq!(geometry.cell_of(center), cell);
    }

    #[test]
    fn in_bounds_rejects_cells_past_the_edges() {
        let geometry = GridGeometry::new(3, 2, 1.0);
        assert!(geometry.in_bounds(CellCoord::new(2, 1)));
        assert!(!geometry.in_bounds(CellCoord::new(3, 0)));
        assert!(!geometry.in_bounds(CellCoord::new(0, 2)));
    }

    #[test]
    fn clamp_keeps_points_inside_the_last_cell() {
        let geometry = GridGeometry::new(4, 4, 10.0);
        let clamped = geometry.clamp(PixelPoint::new(55.0, -3.0));
        assert_eq!(geometry.cell_of(clamped), CellCoord::new(3, 0));
    }

    #[test]
    #[should_panic(expected = "cell length must be positive")]
    fn zero_cell_length_is_rejected() {
        let _ = GridGeometry::new(4, 4, 0.0);
    }

    #[test]
    fn move_towards_snaps_when_close() {
        let from = PixelPoint::new(0.0, 0.0);
        let target = PixelPoint::new(3.0, 4.0);
        assert_eq!(from.move_towards(target, 10.0), target);
        let halfway = from.move_towards(target, 2.5);
        assert!((halfway.x() - 1.5).abs() < 1e-5);
        assert!((halfway.y() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn offset_rejects_negative_cells() {
        let origin = CellCoord::new(0, 3);
        assert_eq!(origin.offset(-1, 0), None);
        assert_eq!(origin.offset(1, -1), Some(CellCoord::new(1, 2)));
    }

    #[test]
    fn water_hating_trait_overrides_the_water_baseline() {
        let stats = CreepStats::for_wave(1).with_traits(&[CreepTrait::WaterAdverse]);
        assert_eq!(stats.speed_multiplier(Some(TerrainKind::Water)), 0.25);
        assert_eq!(stats.speed_multiplier(Some(TerrainKind::Neutral)), 1.0);
        assert_eq!(stats.speed_multiplier(Some(TerrainKind::Mountain)), 0.75);
    }

    #[test]
    fn immune_and_flying_creeps_ignore_terrain() {
        let immune = CreepStats::for_wave(1).with_traits(&[CreepTrait::Immune]);
        let flying = CreepStats::for_wave(1).with_traits(&[CreepTrait::Flying]);
        for kind in TerrainKind::ALL {
            assert_eq!(immune.speed_multiplier(Some(kind)), 1.0);
            assert_eq!(flying.speed_multiplier(Some(kind)), 1.0);
        }
        assert!(flying.flying);
    }

    #[test]
    fn wave_scaling_matches_bounty_and_health_curve() {
        let stats = CreepStats::for_wave(2);
        assert_eq!(stats.health, Health::new(19));
        assert_eq!(stats.value, 3);

        let boss = CreepStats::for_wave(2).with_traits(&[CreepTrait::Boss]);
        assert_eq!(boss.health, Health::new(190));
        assert_eq!(boss.value, 60);
        assert_eq!(boss.describe(), "Boss Creep");
    }

    #[test]
    fn tower_stats_apply_terrain_modifiers() {
        let on_mountain =
            TowerStats::modified(TowerKind::Laser, TerrainKind::Mountain.tower_modifiers());
        assert_eq!(on_mountain.range_cells, 5.0);
        assert_eq!(on_mountain.damage, 10);

        let on_plant =
            TowerStats::modified(TowerKind::Cannon, TerrainKind::PowerPlant.tower_modifiers());
        assert_eq!(on_plant.damage, 200);
        assert_eq!(on_plant.reload, Duration::from_millis(1_000));
    }

    #[test]
    fn tower_refund_is_three_quarters_of_sale_value() {
        assert_eq!(TowerKind::Missile.refund(), 75);
        assert_eq!(TowerKind::Laser.refund(), 9);
    }

    #[test]
    fn upgrades_scale_stats_per_kind() {
        let missile = TowerStats::modified(TowerKind::Missile, TowerModifiers::NEUTRAL)
            .upgraded(TowerKind::Missile);
        assert_eq!(missile.damage, 12_500);
        assert_eq!(missile.range_cells, 6.0);
        assert_eq!(missile.reload, Duration::from_millis(2_000));

        let laser = TowerStats::modified(TowerKind::Laser, TowerModifiers::NEUTRAL)
            .upgraded(TowerKind::Laser);
        assert_eq!(laser.damage, 20);
        assert_eq!(laser.range_cells, 4.25);
        assert_eq!(laser.reload, Duration::from_millis(240));

        let gatling = TowerStats::modified(TowerKind::Gatling, TowerModifiers::NEUTRAL)
            .upgraded(TowerKind::Gatling);
        assert_eq!(gatling.damage, 125);
        assert_eq!(gatling.reload, Duration::from_millis(95));
    }

    #[test]
    fn gatling_waits_for_the_volley_pause_after_its_last_shot() {
        let kind = TowerKind::Gatling;
        let mut snapshot = TowerSnapshot {
            id: TowerId::new(1),
            kind,
            cell: CellCoord::new(0, 0),
            stats: TowerStats::modified(kind, TowerModifiers::NEUTRAL),
            fired_at: Some(Duration::from_secs(10)),
            level: 1,
            sale_value: kind.sale_value(),
            upgrade_cost: kind.upgrade_cost(),
            shots_left: 5,
        };
        assert!(snapshot.weapon_ready(Duration::from_millis(10_101)));

        snapshot.shots_left = 0;
        assert!(!snapshot.weapon_ready(Duration::from_millis(10_101)));
        assert!(!snapshot.weapon_ready(Duration::from_millis(12_000)));
        assert!(snapshot.weapon_ready(Duration::from_millis(12_001)));
        assert_eq!(snapshot.refund(), 37);
    }

    #[test]
    fn adjacency_covers_diagonals_but_not_self() {
        let cell = CellCoord::new(2, 2);
        assert!(cell.is_adjacent(CellCoord::new(3, 3)));
        assert!(cell.is_adjacent(CellCoord::new(2, 1)));
        assert!(!cell.is_adjacent(cell));
        assert!(!cell.is_adjacent(CellCoord::new(4, 2)));
    }
}
