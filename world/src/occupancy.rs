//! Committed tower occupancy plus the single hypothetical cell used while a
//! placement is under consideration.

use creep_defence_core::{CellCoord, GridGeometry, TowerId};

/// Dense occupancy grid mirroring the terrain dimensions.
#[derive(Clone, Debug)]
pub(crate) struct Occupancy {
    geometry: GridGeometry,
    towers: Vec<Option<TowerId>>,
    considering: Option<CellCoord>,
}

impl Occupancy {
    /// Creates an empty occupancy grid for the provided geometry.
    pub(crate) fn new(geometry: GridGeometry) -> Self {
        Self {
            geometry,
            towers: vec![None; geometry.cell_count()],
            considering: None,
        }
    }

    /// Tower committed on the cell, if any.
    pub(crate) fn tower_at(&self, cell: CellCoord) -> Option<TowerId> {
        let index = self.geometry.index(cell)?;
        self.towers.get(index).copied().flatten()
    }

    /// Reports whether the cell holds a tower or is the hypothetical cell.
    pub(crate) fn is_blocked(&self, cell: CellCoord) -> bool {
        self.tower_at(cell).is_some() || self.considering == Some(cell)
    }

    /// Reports whether a creep may stand on the cell.
    pub(crate) fn is_walkable(&self, cell: CellCoord) -> bool {
        self.geometry.in_bounds(cell) && !self.is_blocked(cell)
    }

    /// Reports whether the cell is inside the map and free of committed towers.
    ///
    /// The hypothetical cell is ignored.
    pub(crate) fn is_open(&self, cell: CellCoord) -> bool {
        self.geometry.in_bounds(cell) && self.tower_at(cell).is_none()
    }

    /// Commits a tower onto the cell.
    ///
    /// Returns `false` when the cell is outside the grid or already occupied.
    pub(crate) fn place(&mut self, cell: CellCoord, tower: TowerId) -> bool {
        let Some(slot) = self
            .geometry
            .index(cell)
            .and_then(|index| self.towers.get_mut(index))
        else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(tower);
        true
    }

    /// Releases the cell, returning the tower that stood on it.
    pub(crate) fn clear(&mut self, cell: CellCoord) -> Option<TowerId> {
        let index = self.geometry.index(cell)?;
        self.towers.get_mut(index)?.take()
    }

    /// Hypothetical cell currently under consideration.
    pub(crate) fn considering(&self) -> Option<CellCoord> {
        self.considering
    }

    /// Marks the cell as hypothetically blocked.
    ///
    /// # Panics
    ///
    /// Panics when another cell is already under consideration.
    pub(crate) fn begin_considering(&mut self, cell: CellCoord) {
        assert!(
            self.considering.is_none(),
            "placement check started while {:?} is still under consideration",
            self.considering
        );
        self.considering = Some(cell);
    }

    /// Releases the hypothetical cell.
    pub(crate) fn end_considering(&mut self) {
        self.considering = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupancy() -> Occupancy {
        Occupancy::new(GridGeometry::new(4, 3, 10.0))
    }

    #[test]
    fn committed_towers_block_their_cell() {
        let mut occupancy = occupancy();
        let cell = CellCoord::new(1, 1);
        assert!(occupancy.place(cell, TowerId::new(3)));
        assert_eq!(occupancy.tower_at(cell), Some(TowerId::new(3)));
        assert!(occupancy.is_blocked(cell));
        assert!(!occupancy.is_walkable(cell));
        assert!(!occupancy.place(cell, TowerId::new(4)));
        assert_eq!(occupancy.clear(cell), Some(TowerId::new(3)));
        assert!(occupancy.is_walkable(cell));
    }

    #[test]
    fn hypothetical_cell_blocks_without_committing() {
        let mut occupancy = occupancy();
        let cell = CellCoord::new(2, 0);
        occupancy.begin_considering(cell);
        assert!(occupancy.is_blocked(cell));
        assert!(occupancy.is_open(cell));
        assert_eq!(occupancy.tower_at(cell), None);
        occupancy.end_considering();
        assert!(!occupancy.is_blocked(cell));
    }

    #[test]
    fn out_of_bounds_cells_are_not_walkable() {
        let occupancy = occupancy();
        assert!(!occupancy.is_walkable(CellCoord::new(4, 0)));
        assert!(!occupancy.is_open(CellCoord::new(0, 3)));
        assert!(!occupancy.is_blocked(CellCoord::new(9, 9)));
    }

    #[test]
    #[should_panic(expected = "still under consideration")]
    fn nested_consideration_panics() {
        let mut occupancy = occupancy();
        occupancy.begin_considering(CellCoord::new(0, 0));
        occupancy.begin_considering(CellCoord::new(1, 0));
    }
}
