#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes deterministic tower targets from world snapshots.

use creep_defence_core::{
    CreepId, CreepView, GameOutcome, GridGeometry, PixelPoint, TowerId, TowerTarget, TowerView,
};

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    creep_workspace: Vec<CreepCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns every tower the nearest creep strictly inside its range.
    ///
    /// The output buffer is cleared before populating it with the latest
    /// assignments.
    pub fn handle(
        &mut self,
        outcome: GameOutcome,
        towers: &TowerView,
        creeps: &CreepView,
        geometry: &GridGeometry,
        out: &mut Vec<TowerTarget>,
    ) {
        out.clear();

        if !outcome.is_in_progress() || creeps.is_empty() {
            return;
        }

        self.creep_workspace.clear();
        self.creep_workspace
            .extend(creeps.iter().map(|snapshot| CreepCandidate {
                id: snapshot.id,
                position: snapshot.position,
            }));

        for tower in towers.iter() {
            let center = geometry.center_of(tower.cell);
            let range = tower.stats.range_cells * geometry.cell_length();

            let mut best: Option<BestCandidate> = None;
            for candidate in &self.creep_workspace {
                let distance = center.distance(candidate.position);
                if distance >= range {
                    continue;
                }

                let current = BestCandidate {
                    distance,
                    creep: candidate.id,
                };
                match &mut best {
                    Some(existing) => {
                        if current.precedes(existing) {
                            *existing = current;
                        }
                    }
                    None => best = Some(current),
                }
            }

            if let Some(best) = best {
                out.push(TowerTarget {
                    tower: tower.id,
                    creep: best.creep,
                });
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CreepCandidate {
    id: CreepId,
    position: PixelPoint,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BestCandidate {
    distance: f32,
    creep: CreepId,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance != other.distance {
            return self.distance < other.distance;
        }

        self.creep < other.creep
    }
}

/// Finds the assignment of a single tower.
#[must_use]
pub fn target_of(targets: &[TowerTarget], tower: TowerId) -> Option<CreepId> {
    targets
        .iter()
        .find(|target| target.tower == tower)
        .map(|target| target.creep)
}
