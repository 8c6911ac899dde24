#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Creep movement driver.
//!
//! On every tick each creep is advanced toward the centre of the next cell on
//! its shortest route to the exit, carrying on to later cells when the tick
//! leaves time to spare. Creeps standing on the exit are handed back
//! to the world for removal, and a creep without a route ends the session.

use std::time::Duration;

use creep_defence_core::{
    CellCoord, Command, CreepSnapshot, CreepView, Event, GridGeometry, SessionAbort, TerrainKind,
};
use creep_defence_world::{self as world, query, PathError, World};

/// Route and terrain lookups the driver needs from the world.
pub trait Navigation {
    /// Grid layout of the map.
    fn geometry(&self) -> GridGeometry;

    /// Cell creeps try to reach.
    fn exit(&self) -> CellCoord;

    /// Terrain of the cell, or `None` outside the map.
    fn terrain_at(&self, cell: CellCoord) -> Option<TerrainKind>;

    /// First hop of a shortest route from `start` to the exit.
    fn next_hop(&mut self, start: CellCoord) -> Result<CellCoord, PathError>;
}

impl Navigation for World {
    fn geometry(&self) -> GridGeometry {
        *query::geometry(self)
    }

    fn exit(&self) -> CellCoord {
        query::exit(self)
    }

    fn terrain_at(&self, cell: CellCoord) -> Option<TerrainKind> {
        query::terrain_at(self, cell)
    }

    fn next_hop(&mut self, start: CellCoord) -> Result<CellCoord, PathError> {
        world::next_hop(self, start)
    }
}

/// Pure system that reacts to clock events and emits movement commands.
#[derive(Debug, Default)]
pub struct Movement;

impl Movement {
    /// Consumes world events and the creep view to emit movement commands.
    ///
    /// Every creep that is not escaping receives at least one
    /// [`Command::MoveCreep`], so its last update time follows the clock even
    /// when it stands still.
    pub fn handle<N>(
        &mut self,
        events: &[Event],
        creeps: &CreepView,
        navigation: &mut N,
        out: &mut Vec<Command>,
    ) where
        N: Navigation,
    {
        let Some(now) = events.iter().rev().find_map(|event| match event {
            Event::TimeAdvanced { now, .. } => Some(*now),
            _ => None,
        }) else {
            return;
        };

        let geometry = navigation.geometry();
        let exit = navigation.exit();
        for creep in creeps.iter() {
            if geometry.cell_of(creep.position) == exit {
                out.push(Command::EscapeCreep { creep: creep.id });
                continue;
            }

            if creep.flying {
                let step = creep.speed * elapsed_seconds(now, creep.last_update);
                let position = creep.position.move_towards(geometry.center_of(exit), step);
                out.push(Command::MoveCreep {
                    creep: creep.id,
                    position: geometry.clamp(position),
                });
                continue;
            }

            if let Err(PathError::Unreachable { start }) =
                walk(creep, now, &geometry, exit, navigation, out)
            {
                tracing::error!(
                    creep = creep.id.get(),
                    cell = ?start,
                    "creep has no route to the exit"
                );
                out.push(Command::AbortSession {
                    reason: SessionAbort::PathfindingFailed {
                        creep: Some(creep.id),
                        cell: start,
                    },
                });
                return;
            }
        }
    }
}

/// Spends the time elapsed since the creep's last update hop by hop.
///
/// Each reached cell centre is emitted as its own move so the world reports
/// every cell entered. Walking stops when the time is used up or the creep
/// stands on the exit.
fn walk<N>(
    creep: &CreepSnapshot,
    now: Duration,
    geometry: &GridGeometry,
    exit: CellCoord,
    navigation: &mut N,
    out: &mut Vec<Command>,
) -> Result<(), PathError>
where
    N: Navigation,
{
    let mut position = creep.position;
    let mut remaining = elapsed_seconds(now, creep.last_update);
    let mut reported = None;
    for _ in 0..geometry.cell_count() {
        let cell = geometry.cell_of(position);
        if remaining <= 0.0 || cell == exit {
            break;
        }
        let speed = creep.speed * speed_multiplier(creep, navigation.terrain_at(cell));
        if speed <= 0.0 {
            break;
        }

        let target = geometry.center_of(navigation.next_hop(cell)?);
        let distance = position.distance(target);
        let reach = speed * remaining;
        if reach < distance {
            position = position.move_towards(target, reach);
            break;
        }
        position = target;
        remaining -= distance / speed;
        out.push(Command::MoveCreep {
            creep: creep.id,
            position,
        });
        reported = Some(position);
    }

    if reported != Some(position) {
        out.push(Command::MoveCreep {
            creep: creep.id,
            position: geometry.clamp(position),
        });
    }
    Ok(())
}

fn speed_multiplier(creep: &CreepSnapshot, terrain: Option<TerrainKind>) -> f32 {
    if creep.flying {
        return 1.0;
    }
    terrain.map_or(1.0, |kind| creep.affinity.multiplier(kind))
}

fn elapsed_seconds(now: Duration, last_update: Duration) -> f32 {
    now.saturating_sub(last_update).as_secs_f32()
}
