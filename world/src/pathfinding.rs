//! A* search toward the exit with a memo of known best paths.
//!
//! Every successful search writes the first hop and remaining cost of each
//! cell on the discovered route into the memo, so later searches stop as soon
//! as they reach any memoized cell. The memo is valid for one epoch; any
//! occupancy change must open a new epoch through [`PathMemo::invalidate`].

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
};

use creep_defence_core::{CellCoord, GridGeometry};
use thiserror::Error;

/// Cost of a single orthogonal step.
pub const ORTHOGONAL_STEP_COST: u32 = 10;
/// Cost of a single diagonal step.
pub const DIAGONAL_STEP_COST: u32 = 14;

const ORTHOGONAL_OFFSETS: [(i32, i32); 4] = [(0, 1), (1, 0), (-1, 0), (0, -1)];
const DIAGONAL_OFFSETS: [(i32, i32); 4] = [(1, 1), (-1, -1), (1, -1), (-1, 1)];

/// Failure to reach the exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PathError {
    /// The frontier ran dry before reaching any memoized cell.
    #[error("no route from ({}, {}) to the exit", start.column(), start.row())]
    Unreachable {
        /// Cell the search started from.
        start: CellCoord,
    },
}

/// Memoized first hop and remaining cost of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MemoEntry {
    pub(crate) cost_to_exit: u32,
    pub(crate) next: CellCoord,
}

/// Known best paths of the current epoch.
#[derive(Clone, Debug)]
pub(crate) struct PathMemo {
    exit: CellCoord,
    entries: HashMap<CellCoord, MemoEntry>,
    epoch: u64,
}

impl PathMemo {
    /// Creates an empty memo seeded with the exit.
    pub(crate) fn new(exit: CellCoord) -> Self {
        Self {
            exit,
            entries: HashMap::new(),
            epoch: 0,
        }
    }

    /// Memo entry of the cell. The exit always answers with itself.
    pub(crate) fn entry(&self, cell: CellCoord) -> Option<MemoEntry> {
        if cell == self.exit {
            return Some(MemoEntry {
                cost_to_exit: 0,
                next: self.exit,
            });
        }
        self.entries.get(&cell).copied()
    }

    /// Reports whether the cell lies on a known best path.
    pub(crate) fn contains(&self, cell: CellCoord) -> bool {
        self.entry(cell).is_some()
    }

    /// Number of learned entries, excluding the exit seed.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Identifier of the open epoch.
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Discards every learned entry and opens a new epoch.
    pub(crate) fn invalidate(&mut self) -> u64 {
        self.entries.clear();
        self.epoch = self.epoch.wrapping_add(1);
        tracing::debug!(epoch = self.epoch, "path memo invalidated");
        self.epoch
    }

    /// Replaces the exit, discarding every learned entry.
    pub(crate) fn reset(&mut self, exit: CellCoord) -> u64 {
        self.exit = exit;
        self.invalidate()
    }

    fn record(&mut self, cell: CellCoord, entry: MemoEntry) {
        let _ = self.entries.insert(cell, entry);
    }

    fn estimate(&self, cell: CellCoord) -> u32 {
        match self.entry(cell) {
            Some(entry) => entry.cost_to_exit,
            None => octile_distance(cell, self.exit),
        }
    }
}

/// Octile distance using the orthogonal and diagonal step costs.
#[must_use]
pub fn octile_distance(from: CellCoord, to: CellCoord) -> u32 {
    let dx = from.column().abs_diff(to.column());
    let dy = from.row().abs_diff(to.row());
    let diagonal = dx.min(dy);
    let straight = dx.max(dy) - diagonal;
    diagonal * DIAGONAL_STEP_COST + straight * ORTHOGONAL_STEP_COST
}

#[derive(Clone, Copy, Debug)]
struct SearchNode {
    cell: CellCoord,
    parent: Option<usize>,
    cost: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Frontier {
    estimate: u32,
    sequence: u64,
    node: usize,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Returns the first hop of a shortest route from `start` to the exit.
///
/// `is_walkable` must report `false` for out-of-bounds and blocked cells.
/// The start cell itself is never tested, so a creep standing on a cell that
/// just became blocked can still walk off it.
///
/// # Panics
///
/// Panics when `start` lies outside the grid.
pub(crate) fn next_hop<F>(
    memo: &mut PathMemo,
    geometry: &GridGeometry,
    start: CellCoord,
    is_walkable: F,
) -> Result<CellCoord, PathError>
where
    F: Fn(CellCoord) -> bool,
{
    assert!(
        geometry.in_bounds(start),
        "pathfinding started outside the grid at ({}, {})",
        start.column(),
        start.row()
    );

    if let Some(entry) = memo.entry(start) {
        return Ok(entry.next);
    }

    let mut nodes = vec![SearchNode {
        cell: start,
        parent: None,
        cost: 0,
    }];
    let mut frontier = BinaryHeap::new();
    let mut closed = HashSet::new();
    let mut sequence = 0_u64;
    frontier.push(Frontier {
        estimate: memo.estimate(start),
        sequence,
        node: 0,
    });

    while let Some(Frontier { node, .. }) = frontier.pop() {
        let current = nodes[node];
        if !closed.insert(current.cell) {
            continue;
        }

        if let Some(entry) = memo.entry(current.cell) {
            return Ok(write_back(memo, &nodes, node, entry.cost_to_exit));
        }

        for (offset, step_cost) in successors() {
            let Some(neighbor) = current.cell.offset(offset.0, offset.1) else {
                continue;
            };
            if closed.contains(&neighbor) || !is_walkable(neighbor) {
                continue;
            }
            let diagonal = step_cost == DIAGONAL_STEP_COST;
            if diagonal && !diagonal_is_open(current.cell, offset, &is_walkable) {
                continue;
            }

            let cost = current.cost + step_cost;
            sequence += 1;
            nodes.push(SearchNode {
                cell: neighbor,
                parent: Some(node),
                cost,
            });
            frontier.push(Frontier {
                estimate: cost + memo.estimate(neighbor),
                sequence,
                node: nodes.len() - 1,
            });
        }
    }

    Err(PathError::Unreachable { start })
}

fn successors() -> impl Iterator<Item = ((i32, i32), u32)> {
    ORTHOGONAL_OFFSETS
        .into_iter()
        .map(|offset| (offset, ORTHOGONAL_STEP_COST))
        .chain(
            DIAGONAL_OFFSETS
                .into_iter()
                .map(|offset| (offset, DIAGONAL_STEP_COST)),
        )
}

fn diagonal_is_open<F>(cell: CellCoord, offset: (i32, i32), is_walkable: &F) -> bool
where
    F: Fn(CellCoord) -> bool,
{
    let horizontal = cell.offset(offset.0, 0);
    let vertical = cell.offset(0, offset.1);
    match (horizontal, vertical) {
        (Some(horizontal), Some(vertical)) => is_walkable(horizontal) && is_walkable(vertical),
        _ => false,
    }
}

/// Records every ancestor of `reached` and returns the start's first hop.
fn write_back(
    memo: &mut PathMemo,
    nodes: &[SearchNode],
    reached: usize,
    base_cost: u32,
) -> CellCoord {
    let mut child = reached;
    let mut first_hop = nodes[reached].cell;
    let mut written = 0_usize;
    while let Some(parent) = nodes[child].parent {
        let remaining = base_cost + (nodes[reached].cost - nodes[parent].cost);
        memo.record(
            nodes[parent].cell,
            MemoEntry {
                cost_to_exit: remaining,
                next: nodes[child].cell,
            },
        );
        first_hop = nodes[child].cell;
        written += 1;
        child = parent;
    }
    tracing::trace!(
        epoch = memo.epoch(),
        written,
        learned = memo.len(),
        "memoized route"
    );
    first_hop
}
