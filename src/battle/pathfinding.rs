//! A* pathfinding for battle maps
//!
//! Every step costs 1. Walkability is supplied by the caller so the same
//! search serves movement (occupancy-aware), melee reach and ranged distance.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::battle::battle_map::HexGrid;
use crate::battle::hex::HexCoord;
use crate::core::error::UnreachableWarning;

/// Distance estimate used to order the open set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    /// Exact cube distance; a true lower bound, paths are optimal
    #[default]
    HexDistance,
    /// `max(dx, dy) + floor(min(dx, dy) / 2)` over offset deltas
    OffsetEstimate,
}

impl Heuristic {
    pub fn estimate(&self, from: HexCoord, to: HexCoord) -> u32 {
        match self {
            Heuristic::HexDistance => from.distance(&to),
            Heuristic::OffsetEstimate => from.offset_estimate(&to),
        }
    }
}

/// Find path using A* with the default heuristic
///
/// Returns the full path including `start`. When no route exists the result
/// is `[start]`; callers must read a single-cell result as "unreachable".
pub fn find_path<F>(grid: &HexGrid, start: HexCoord, goal: HexCoord, is_walkable: F) -> Vec<HexCoord>
where
    F: Fn(HexCoord) -> bool,
{
    find_path_with(grid, start, goal, Heuristic::default(), is_walkable)
}

/// Find path using A* with an explicit heuristic
///
/// Ties on f-score go to the lexicographically smallest coordinate, so the
/// same inputs always yield the same path.
pub fn find_path_with<F>(
    grid: &HexGrid,
    start: HexCoord,
    goal: HexCoord,
    heuristic: Heuristic,
    is_walkable: F,
) -> Vec<HexCoord>
where
    F: Fn(HexCoord) -> bool,
{
    if start == goal {
        return vec![start];
    }

    let mut open_set: BinaryHeap<Reverse<(u32, HexCoord)>> = BinaryHeap::new();
    let mut closed: AHashSet<HexCoord> = AHashSet::new();
    let mut came_from: AHashMap<HexCoord, HexCoord> = AHashMap::new();
    let mut g_scores: AHashMap<HexCoord, u32> = AHashMap::new();

    g_scores.insert(start, 0);
    open_set.push(Reverse((heuristic.estimate(start, goal), start)));

    while let Some(Reverse((_, current))) = open_set.pop() {
        if current == goal {
            return reconstruct_path(&came_from, current);
        }

        // Stale heap entry for an already expanded node
        if !closed.insert(current) {
            continue;
        }

        let current_g = g_scores.get(&current).copied().unwrap_or(u32::MAX);

        for neighbor in grid.neighbors(current) {
            if closed.contains(&neighbor) || !is_walkable(neighbor) {
                continue;
            }

            let tentative_g = current_g + 1;
            let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current);
                g_scores.insert(neighbor, tentative_g);
                let f_score = tentative_g + heuristic.estimate(neighbor, goal);
                open_set.push(Reverse((f_score, neighbor)));
            }
        }
    }

    vec![start]
}

/// Like [`find_path_with`], but a start-only fallback becomes an explicit warning
pub fn try_find_path<F>(
    grid: &HexGrid,
    start: HexCoord,
    goal: HexCoord,
    heuristic: Heuristic,
    is_walkable: F,
) -> Result<Vec<HexCoord>, UnreachableWarning>
where
    F: Fn(HexCoord) -> bool,
{
    let path = find_path_with(grid, start, goal, heuristic, is_walkable);
    if path.len() < 2 {
        return Err(UnreachableWarning {
            from: start,
            to: goal,
        });
    }
    Ok(path)
}

/// Shortest route for a unit that ignores terrain
///
/// Every in-bounds cell is open and the exact hex-distance heuristic is used,
/// so the path always takes `start.distance(&goal)` steps.
pub fn flight_path(
    grid: &HexGrid,
    start: HexCoord,
    goal: HexCoord,
) -> Result<Vec<HexCoord>, UnreachableWarning> {
    try_find_path(grid, start, goal, Heuristic::HexDistance, |c| grid.in_bounds(c))
}

/// Reconstruct path from came_from map
fn reconstruct_path(came_from: &AHashMap<HexCoord, HexCoord>, mut current: HexCoord) -> Vec<HexCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Number of steps a path takes (cells minus the start)
pub fn path_steps(path: &[HexCoord]) -> usize {
    path.len().saturating_sub(1)
}
