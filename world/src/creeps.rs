//! Creeps walking through the maze.

use std::{collections::BTreeMap, time::Duration};

use creep_defence_core::{CellCoord, CreepId, CreepSnapshot, CreepStats, Health, PixelPoint};

/// Authoritative state of a single creep.
#[derive(Clone, Debug)]
pub(crate) struct Creep {
    pub(crate) id: CreepId,
    pub(crate) position: PixelPoint,
    pub(crate) cell: CellCoord,
    pub(crate) health: Health,
    pub(crate) stats: CreepStats,
    pub(crate) last_update: Duration,
}

impl Creep {
    pub(crate) fn snapshot(&self) -> CreepSnapshot {
        CreepSnapshot {
            id: self.id,
            position: self.position,
            cell: self.cell,
            health: self.health,
            speed: self.stats.speed,
            affinity: self.stats.affinity,
            flying: self.stats.flying,
            last_update: self.last_update,
        }
    }
}

/// Registry of live creeps keyed by identifier.
#[derive(Clone, Debug)]
pub(crate) struct CreepRoster {
    entries: BTreeMap<CreepId, Creep>,
    next_creep_id: CreepId,
}

impl CreepRoster {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_creep_id: CreepId::new(0),
        }
    }

    /// Inserts a new creep and returns its identifier.
    pub(crate) fn spawn(
        &mut self,
        stats: CreepStats,
        position: PixelPoint,
        cell: CellCoord,
        now: Duration,
    ) -> CreepId {
        let id = self.next_creep_id;
        self.next_creep_id = CreepId::new(id.get().wrapping_add(1));
        let _ = self.entries.insert(
            id,
            Creep {
                id,
                position,
                cell,
                health: stats.health,
                stats,
                last_update: now,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: CreepId) -> Option<&Creep> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: CreepId) -> Option<&mut Creep> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: CreepId) -> Option<Creep> {
        self.entries.remove(&id)
    }

    /// Removes every creep, returning how many were removed.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Creep> {
        self.entries.values()
    }

    /// Cells of every creep that follows the maze.
    pub(crate) fn walker_cells(&self) -> Vec<CellCoord> {
        self.entries
            .values()
            .filter(|creep| !creep.stats.flying)
            .map(|creep| creep.cell)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creep_defence_core::CreepTrait;

    #[test]
    fn identifiers_increase_monotonically() {
        let mut roster = CreepRoster::new();
        let first = roster.spawn(
            CreepStats::for_wave(1),
            PixelPoint::new(5.0, 5.0),
            CellCoord::new(0, 0),
            Duration::ZERO,
        );
        let second = roster.spawn(
            CreepStats::for_wave(1),
            PixelPoint::new(5.0, 5.0),
            CellCoord::new(0, 0),
            Duration::ZERO,
        );
        assert_eq!(first, CreepId::new(0));
        assert_eq!(second, CreepId::new(1));
        let _ = roster.remove(first);
        assert!(roster.get(first).is_none());
        assert_eq!(roster.iter().count(), 1);
    }

    #[test]
    fn flying_creeps_are_not_walkers() {
        let mut roster = CreepRoster::new();
        let _ = roster.spawn(
            CreepStats::for_wave(1).with_traits(&[CreepTrait::Flying]),
            PixelPoint::new(5.0, 5.0),
            CellCoord::new(0, 0),
            Duration::ZERO,
        );
        let _ = roster.spawn(
            CreepStats::for_wave(1),
            PixelPoint::new(15.0, 5.0),
            CellCoord::new(1, 0),
            Duration::ZERO,
        );
        assert_eq!(roster.walker_cells(), vec![CellCoord::new(1, 0)]);
        assert_eq!(roster.clear(), 2);
    }
}
