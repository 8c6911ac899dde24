//! Static terrain layout of the maze.

use creep_defence_core::{CellCoord, TerrainKind};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

const WATER_PERCENT: u32 = 8;
const MOUNTAIN_PERCENT: u32 = 6;
const POWER_PLANT_PERCENT: u32 = 2;

/// Reasons a terrain map cannot be constructed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TerrainError {
    /// The map needs at least two columns and one row.
    #[error("terrain map needs at least 2 columns and 1 row, got {columns}x{rows}")]
    TooSmall {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
    /// A row of a hand-built map has a different width than the first row.
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: u32,
        /// Width of the first row.
        expected: u32,
        /// Width of the offending row.
        found: u32,
    },
    /// A hand-built map contains a character with no terrain meaning.
    #[error("unknown terrain symbol {symbol:?} at ({column}, {row})")]
    UnknownSymbol {
        /// Offending character.
        symbol: char,
        /// Column of the character.
        column: u32,
        /// Row of the character.
        row: u32,
    },
    /// A hand-built map does not contain exactly one entrance.
    #[error("map must contain exactly one entrance, found {0}")]
    EntranceCount(usize),
    /// A hand-built map does not contain exactly one exit.
    #[error("map must contain exactly one exit, found {0}")]
    ExitCount(usize),
}

/// Dense row-major grid of terrain kinds with the entrance and exit cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerrainMap {
    columns: u32,
    rows: u32,
    cells: Vec<TerrainKind>,
    entrance: CellCoord,
    exit: CellCoord,
}

impl TerrainMap {
    /// Generates a map with the entrance on the first column and the exit on
    /// the last column, scattering water, mountains and power plants.
    pub fn generate(columns: u32, rows: u32, seed: u64) -> Result<Self, TerrainError> {
        if columns < 2 || rows == 0 {
            return Err(TerrainError::TooSmall { columns, rows });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let entrance = CellCoord::new(0, rng.gen_range(0..rows));
        let exit = CellCoord::new(columns - 1, rng.gen_range(0..rows));

        let mut cells = Vec::with_capacity(cell_capacity(columns, rows));
        for row in 0..rows {
            for column in 0..columns {
                let cell = CellCoord::new(column, row);
                let kind = if cell == entrance {
                    TerrainKind::Entrance
                } else if cell == exit {
                    TerrainKind::Exit
                } else {
                    roll_terrain(rng.gen_range(0..100))
                };
                cells.push(kind);
            }
        }

        Ok(Self {
            columns,
            rows,
            cells,
            entrance,
            exit,
        })
    }

    /// Builds a map from text rows.
    ///
    /// Symbols: `.` neutral, `~` water, `^` mountain, `*` power plant,
    /// `E` entrance and `X` exit.
    pub fn from_rows(rows: &[&str]) -> Result<Self, TerrainError> {
        let row_count = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let columns = rows
            .first()
            .map_or(0, |row| u32::try_from(row.chars().count()).unwrap_or(u32::MAX));
        if columns < 2 || row_count == 0 {
            return Err(TerrainError::TooSmall {
                columns,
                rows: row_count,
            });
        }

        let mut cells = Vec::with_capacity(cell_capacity(columns, row_count));
        let mut entrances = Vec::new();
        let mut exits = Vec::new();
        for (row, text) in (0_u32..).zip(rows) {
            let found = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
            if found != columns {
                return Err(TerrainError::RaggedRow {
                    row,
                    expected: columns,
                    found,
                });
            }

            for (column, symbol) in (0_u32..).zip(text.chars()) {
                let kind = match symbol {
                    '.' => TerrainKind::Neutral,
                    '~' => TerrainKind::Water,
                    '^' => TerrainKind::Mountain,
                    '*' => TerrainKind::PowerPlant,
                    'E' => TerrainKind::Entrance,
                    'X' => TerrainKind::Exit,
                    _ => {
                        return Err(TerrainError::UnknownSymbol {
                            symbol,
                            column,
                            row,
                        })
                    }
                };
                match kind {
                    TerrainKind::Entrance => entrances.push(CellCoord::new(column, row)),
                    TerrainKind::Exit => exits.push(CellCoord::new(column, row)),
                    _ => {}
                }
                cells.push(kind);
            }
        }

        let &[entrance] = entrances.as_slice() else {
            return Err(TerrainError::EntranceCount(entrances.len()));
        };
        let &[exit] = exits.as_slice() else {
            return Err(TerrainError::ExitCount(exits.len()));
        };

        Ok(Self {
            columns,
            rows: row_count,
            cells,
            entrance,
            exit,
        })
    }

    /// Number of columns in the map.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the map.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Cell where creeps enter.
    #[must_use]
    pub const fn entrance(&self) -> CellCoord {
        self.entrance
    }

    /// Cell creeps try to reach.
    #[must_use]
    pub const fn exit(&self) -> CellCoord {
        self.exit
    }

    /// Terrain of the cell, or `None` outside the map.
    #[must_use]
    pub fn terrain_at(&self, cell: CellCoord) -> Option<TerrainKind> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        self.cells.get(row * width + column).copied()
    }
}

fn roll_terrain(roll: u32) -> TerrainKind {
    if roll < WATER_PERCENT {
        TerrainKind::Water
    } else if roll < WATER_PERCENT + MOUNTAIN_PERCENT {
        TerrainKind::Mountain
    } else if roll < WATER_PERCENT + MOUNTAIN_PERCENT + POWER_PLANT_PERCENT {
        TerrainKind::PowerPlant
    } else {
        TerrainKind::Neutral
    }
}

fn cell_capacity(columns: u32, rows: u32) -> usize {
    usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_maps_place_entrance_and_exit_on_opposite_edges() {
        let map = TerrainMap::generate(20, 12, 7).expect("valid dimensions");
        assert_eq!(map.entrance().column(), 0);
        assert_eq!(map.exit().column(), 19);
        assert_eq!(map.terrain_at(map.entrance()), Some(TerrainKind::Entrance));
        assert_eq!(map.terrain_at(map.exit()), Some(TerrainKind::Exit));
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let first = TerrainMap::generate(16, 9, 42).expect("valid dimensions");
        let second = TerrainMap::generate(16, 9, 42).expect("valid dimensions");
        assert_eq!(first, second);
    }

    #[test]
    fn generation_rejects_degenerate_maps() {
        assert_eq!(
            TerrainMap::generate(1, 5, 0),
            Err(TerrainError::TooSmall {
                columns: 1,
                rows: 5
            })
        );
    }

    #[test]
    fn from_rows_parses_symbols() {
        let map = TerrainMap::from_rows(&["E.~", "^*X"]).expect("valid map");
        assert_eq!(map.columns(), 3);
        assert_eq!(map.rows(), 2);
        assert_eq!(map.entrance(), CellCoord::new(0, 0));
        assert_eq!(map.exit(), CellCoord::new(2, 1));
        assert_eq!(
            map.terrain_at(CellCoord::new(2, 0)),
            Some(TerrainKind::Water)
        );
        assert_eq!(
            map.terrain_at(CellCoord::new(0, 1)),
            Some(TerrainKind::Mountain)
        );
        assert_eq!(
            map.terrain_at(CellCoord::new(1, 1)),
            Some(TerrainKind::PowerPlant)
        );
        assert_eq!(map.terrain_at(CellCoord::new(3, 0)), None);
    }

    #[test]
    fn from_rows_rejects_ragged_rows_and_missing_exits() {
        assert_eq!(
            TerrainMap::from_rows(&["E.X", ".."]),
            Err(TerrainError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            TerrainMap::from_rows(&["E..", "..."]),
            Err(TerrainError::ExitCount(0))
        );
        assert_eq!(
            TerrainMap::from_rows(&["E?X"]),
            Err(TerrainError::UnknownSymbol {
                symbol: '?',
                column: 1,
                row: 0
            })
        );
    }
}
