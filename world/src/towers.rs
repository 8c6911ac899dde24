//! Authoritative tower state management utilities.

use std::{collections::BTreeMap, time::Duration};

use creep_defence_core::{CellCoord, TowerId, TowerKind, TowerSnapshot, TowerStats};

/// Snapshot of a tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    /// Identifier allocated by the world for the tower.
    pub(crate) id: TowerId,
    /// Kind of tower that was constructed.
    pub(crate) kind: TowerKind,
    /// Cell occupied by the tower.
    pub(crate) cell: CellCoord,
    /// Statistics after terrain modifiers.
    pub(crate) stats: TowerStats,
    /// Simulated time of the last shot.
    pub(crate) fired_at: Option<Duration>,
    /// Upgrade level, starting at 1.
    pub(crate) level: u32,
    /// Gold invested so far.
    pub(crate) sale_value: u32,
    /// Price of the next upgrade.
    pub(crate) upgrade_cost: u32,
    /// Shots left in the current volley.
    pub(crate) shots_left: u32,
}

impl TowerState {
    fn new(id: TowerId, kind: TowerKind, cell: CellCoord, stats: TowerStats) -> Self {
        Self {
            id,
            kind,
            cell,
            stats,
            fired_at: None,
            level: 1,
            sale_value: kind.sale_value(),
            upgrade_cost: kind.upgrade_cost(),
            shots_left: kind.volley().map_or(0, |volley| volley.shots),
        }
    }

    pub(crate) fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            kind: self.kind,
            cell: self.cell,
            stats: self.stats,
            fired_at: self.fired_at,
            level: self.level,
            sale_value: self.sale_value,
            upgrade_cost: self.upgrade_cost,
            shots_left: self.shots_left,
        }
    }

    /// Records a shot fired at `now`. The caller checks readiness first.
    ///
    /// A volley tower that waited out its pause starts a fresh volley.
    pub(crate) fn record_shot(&mut self, now: Duration) {
        if let Some(volley) = self.kind.volley() {
            if self.shots_left == 0 {
                self.shots_left = volley.shots;
            }
            self.shots_left -= 1;
        }
        self.fired_at = Some(now);
    }

    /// Raises the tower one level and returns the gold it cost.
    pub(crate) fn upgrade(&mut self) -> u32 {
        let cost = self.upgrade_cost;
        self.level += 1;
        self.stats = self.stats.upgraded(self.kind);
        self.sale_value = self.sale_value.saturating_add(cost);
        self.upgrade_cost = cost.saturating_mul(3) / 2;
        cost
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Clone, Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Stores a new tower and returns its identifier.
    pub(crate) fn insert(&mut self, kind: TowerKind, cell: CellCoord, stats: TowerStats) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().wrapping_add(1));
        let _ = self.entries.insert(id, TowerState::new(id, kind, cell, stats));
        id
    }

    pub(crate) fn get(&self, id: TowerId) -> Option<&TowerState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: TowerId) -> Option<TowerState> {
        self.entries.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creep_defence_core::TowerModifiers;

    #[test]
    fn registry_starts_empty_with_zero_identifier() {
        let registry = TowerRegistry::new();
        assert!(registry.entries.is_empty());
        assert_eq!(registry.next_tower_id.get(), 0);
    }

    #[test]
    fn removed_identifiers_are_not_reused() {
        let mut registry = TowerRegistry::new();
        let stats = TowerStats::modified(TowerKind::Laser, TowerModifiers::NEUTRAL);
        let first = registry.insert(TowerKind::Laser, CellCoord::new(1, 1), stats);
        let removed = registry.remove(first).expect("tower exists");
        assert_eq!(removed.cell, CellCoord::new(1, 1));
        let second = registry.insert(TowerKind::Laser, CellCoord::new(1, 1), stats);
        assert_ne!(first, second);
        assert_eq!(registry.iter().count(), 1);
        assert!(registry.get(second).is_some());
    }

    #[test]
    fn upgrades_compound_cost_and_value() {
        let mut registry = TowerRegistry::new();
        let stats = TowerStats::modified(TowerKind::Cannon, TowerModifiers::NEUTRAL);
        let id = registry.insert(TowerKind::Cannon, CellCoord::new(0, 0), stats);
        let tower = registry.get_mut(id).expect("tower exists");

        assert_eq!(tower.upgrade(), 75);
        assert_eq!(tower.upgrade(), 112);
        assert_eq!(tower.level, 3);
        assert_eq!(tower.sale_value, 50 + 75 + 112);
        assert_eq!(tower.upgrade_cost, 168);
        assert_eq!(tower.stats.damage, 400);
        assert_eq!(tower.snapshot().refund(), 177);
    }

    #[test]
    fn volleys_refill_after_the_last_shot() {
        let mut registry = TowerRegistry::new();
        let stats = TowerStats::modified(TowerKind::Gatling, TowerModifiers::NEUTRAL);
        let id = registry.insert(TowerKind::Gatling, CellCoord::new(0, 0), stats);
        let tower = registry.get_mut(id).expect("tower exists");
        assert_eq!(tower.shots_left, 12);

        for shot in 0..12 {
            tower.record_shot(Duration::from_millis(shot * 200));
        }
        assert_eq!(tower.shots_left, 0);
        assert!(!tower.snapshot().weapon_ready(Duration::from_millis(2_200)));

        tower.record_shot(Duration::from_millis(5_000));
        assert_eq!(tower.shots_left, 11);
    }
}
