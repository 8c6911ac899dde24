//! Build legality: would a tower on a cell still leave the entrance and every
//! walking creep a route to the exit?

use creep_defence_core::{CellCoord, GridGeometry, PlacementError};
use thiserror::Error;

use crate::{
    occupancy::Occupancy,
    pathfinding::{self, PathError, PathMemo},
};

const DIAGONAL_NEIGHBORS: [(i32, i32); 4] = [(1, 1), (-1, -1), (1, -1), (-1, 1)];

/// Outcome of a placement check that did not approve the cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GateError {
    /// The placement is not allowed.
    #[error(transparent)]
    Rejected(#[from] PlacementError),
    /// The committed occupancy already has no route; the session cannot continue.
    #[error("committed occupancy has no route to the exit: {source}")]
    CommittedRouteMissing {
        /// Failed search.
        source: PathError,
    },
}

/// Per-cell cache of legality answers, cleared on every occupancy change.
#[derive(Clone, Debug)]
pub(crate) struct LegalityCache {
    geometry: GridGeometry,
    answers: Vec<Option<bool>>,
}

impl LegalityCache {
    pub(crate) fn new(geometry: GridGeometry) -> Self {
        Self {
            geometry,
            answers: vec![None; geometry.cell_count()],
        }
    }

    pub(crate) fn get(&self, cell: CellCoord) -> Option<bool> {
        let index = self.geometry.index(cell)?;
        self.answers.get(index).copied().flatten()
    }

    fn store(&mut self, cell: CellCoord, legal: bool) {
        if let Some(slot) = self
            .geometry
            .index(cell)
            .and_then(|index| self.answers.get_mut(index))
        {
            *slot = Some(legal);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.answers.fill(None);
    }
}

/// Borrowed view of the world state the gate works on.
pub(crate) struct Gate<'a> {
    pub(crate) geometry: &'a GridGeometry,
    pub(crate) entrance: CellCoord,
    pub(crate) exit: CellCoord,
    pub(crate) occupancy: &'a mut Occupancy,
    pub(crate) memo: &'a mut PathMemo,
    pub(crate) legality: &'a mut LegalityCache,
    pub(crate) walker_cells: &'a [CellCoord],
}

impl Gate<'_> {
    /// Decides whether a tower may be committed on `cell`.
    ///
    /// The memo is left freshly invalidated and no hypothetical cell remains
    /// set, whatever the outcome.
    ///
    /// # Panics
    ///
    /// Panics when another placement check is still considering a cell.
    pub(crate) fn check(&mut self, cell: CellCoord) -> Result<(), GateError> {
        assert!(
            self.occupancy.considering().is_none(),
            "placement check re-entered while another cell is under consideration"
        );

        let result = self.evaluate(cell);
        self.occupancy.end_considering();
        let _ = self.memo.invalidate();
        result
    }

    fn evaluate(&mut self, cell: CellCoord) -> Result<(), GateError> {
        if !self.geometry.in_bounds(cell) {
            return Err(PlacementError::OutOfBounds.into());
        }
        if self.occupancy.tower_at(cell).is_some() {
            return Err(PlacementError::Occupied.into());
        }
        if cell == self.entrance || cell == self.exit {
            return Err(PlacementError::Reserved.into());
        }

        if let Some(legal) = self.legality.get(cell) {
            return verdict(legal);
        }

        self.learn_committed_routes()?;
        let legal = if self.on_known_path(cell) || !self.diagonals_open(cell) {
            self.routes_survive(cell)
        } else {
            true
        };

        self.legality.store(cell, legal);
        verdict(legal)
    }

    fn learn_committed_routes(&mut self) -> Result<(), GateError> {
        let entrance = self.entrance;
        let walkers = self.walker_cells;
        for start in std::iter::once(entrance).chain(walkers.iter().copied()) {
            let _ = self
                .next_hop(start)
                .map_err(|source| GateError::CommittedRouteMissing { source })?;
        }
        Ok(())
    }

    fn on_known_path(&self, cell: CellCoord) -> bool {
        self.memo.contains(cell)
    }

    fn diagonals_open(&self, cell: CellCoord) -> bool {
        DIAGONAL_NEIGHBORS.iter().all(|&(columns, rows)| {
            cell.offset(columns, rows)
                .is_some_and(|neighbor| self.occupancy.is_open(neighbor))
        })
    }

    fn routes_survive(&mut self, cell: CellCoord) -> bool {
        self.occupancy.begin_considering(cell);
        let _ = self.memo.invalidate();

        let entrance = self.entrance;
        let walkers = self.walker_cells;
        let survives = std::iter::once(entrance)
            .chain(walkers.iter().copied())
            .all(|start| self.next_hop(start).is_ok());

        self.occupancy.end_considering();
        survives
    }

    fn next_hop(&mut self, start: CellCoord) -> Result<CellCoord, PathError> {
        let occupancy = &*self.occupancy;
        pathfinding::next_hop(&mut *self.memo, self.geometry, start, |cell| {
            occupancy.is_walkable(cell)
        })
    }
}

fn verdict(legal: bool) -> Result<(), GateError> {
    if legal {
        Ok(())
    } else {
        Err(PlacementError::BlocksPath.into())
    }
}
