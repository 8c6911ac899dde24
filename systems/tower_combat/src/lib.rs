#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns target assignments into firing commands.

use std::time::Duration;

use creep_defence_core::{Command, GameOutcome, TowerId, TowerSnapshot, TowerTarget, TowerView};

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::FireAt` entries for assigned towers whose reload elapsed.
    pub fn handle(
        &mut self,
        outcome: GameOutcome,
        now: Duration,
        towers: TowerView,
        tower_targets: &[TowerTarget],
        out: &mut Vec<Command>,
    ) {
        if !outcome.is_in_progress() || tower_targets.is_empty() {
            return;
        }

        let towers = towers.into_vec();
        if towers.is_empty() {
            return;
        }

        self.scratch.clear();

        for target in tower_targets {
            if let Some(snapshot) = find_tower(&towers, target.tower) {
                if snapshot.weapon_ready(now) {
                    self.scratch.push(Command::FireAt {
                        tower: target.tower,
                        creep: target.creep,
                    });
                }
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

fn find_tower(towers: &[TowerSnapshot], tower: TowerId) -> Option<&TowerSnapshot> {
    towers
        .binary_search_by_key(&tower, |snapshot| snapshot.id)
        .ok()
        .map(|index| &towers[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use creep_defence_core::{CellCoord, CreepId, TowerKind, TowerModifiers, TowerStats};

    fn tower(id: u32, fired_at: Option<Duration>) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(id),
            kind: TowerKind::Cannon,
            cell: CellCoord::new(id, 0),
            stats: TowerStats::modified(TowerKind::Cannon, TowerModifiers::NEUTRAL),
            fired_at,
            level: 1,
            sale_value: TowerKind::Cannon.sale_value(),
            upgrade_cost: TowerKind::Cannon.upgrade_cost(),
            shots_left: 0,
        }
    }

    fn target(tower: u32, creep: u32) -> TowerTarget {
        TowerTarget {
            tower: TowerId::new(tower),
            creep: CreepId::new(creep),
        }
    }

    fn fire(id: u32, creep: u32) -> Command {
        Command::FireAt {
            tower: TowerId::new(id),
            creep: CreepId::new(creep),
        }
    }

    #[test]
    fn emits_fire_for_towers_that_never_fired() {
        let mut combat = TowerCombat::new();
        let mut out = Vec::new();
        combat.handle(
            GameOutcome::InProgress,
            Duration::ZERO,
            TowerView::from_snapshots(vec![tower(2, None), tower(1, None)]),
            &[target(1, 7), target(2, 8)],
            &mut out,
        );
        assert_eq!(out, vec![fire(1, 7), fire(2, 8)]);
    }

    #[test]
    fn reloading_towers_hold_fire() {
        let mut combat = TowerCombat::new();
        let mut out = Vec::new();
        combat.handle(
            GameOutcome::InProgress,
            Duration::from_millis(1_000),
            TowerView::from_snapshots(vec![
                tower(1, Some(Duration::ZERO)),
                tower(2, Some(Duration::from_millis(500))),
            ]),
            &[target(1, 3), target(2, 3)],
            &mut out,
        );
        assert!(out.is_empty(), "reload must strictly elapse");

        combat.handle(
            GameOutcome::InProgress,
            Duration::from_millis(1_001),
            TowerView::from_snapshots(vec![
                tower(1, Some(Duration::ZERO)),
                tower(2, Some(Duration::from_millis(500))),
            ]),
            &[target(1, 3), target(2, 3)],
            &mut out,
        );
        assert_eq!(out, vec![fire(1, 3)]);
    }

    #[test]
    fn unknown_towers_are_skipped() {
        let mut combat = TowerCombat::new();
        let mut out = Vec::new();
        combat.handle(
            GameOutcome::InProgress,
            Duration::ZERO,
            TowerView::from_snapshots(vec![tower(1, None)]),
            &[target(9, 1)],
            &mut out,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn finished_sessions_do_not_fire() {
        let mut combat = TowerCombat::new();
        let mut out = Vec::new();
        combat.handle(
            GameOutcome::Lost,
            Duration::ZERO,
            TowerView::from_snapshots(vec![tower(1, None)]),
            &[target(1, 1)],
            &mut out,
        );
        assert!(out.is_empty());
    }
}
