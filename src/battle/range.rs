//! Movement and attack range queries
//!
//! Static walkability comes from the grid; living units are layered on top
//! through an [`Occupancy`] overlay built per query.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::battle::battle_map::HexGrid;
use crate::battle::hex::HexCoord;
use crate::battle::pathfinding::{find_path_with, Heuristic};
use crate::battle::units::CombatUnit;
use crate::core::types::UnitId;
use crate::skills::definitions::SkillRange;

/// A cell the active unit can reach this turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkableNode {
    pub coord: HexCoord,
    /// Minimal number of steps from the unit's cell
    pub distance: u32,
}

/// An enemy the active unit can hit with the selected skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackableNode {
    pub coord: HexCoord,
    pub unit_id: UnitId,
    pub distance: u32,
}

/// Cells blocked by living units for one query
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    cells: AHashSet<HexCoord>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: impl IntoIterator<Item = HexCoord>) -> Self {
        Self {
            cells: cells.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, coord: HexCoord) {
        self.cells.insert(coord);
    }

    pub fn remove(&mut self, coord: HexCoord) {
        self.cells.remove(&coord);
    }

    pub fn is_occupied(&self, coord: HexCoord) -> bool {
        self.cells.contains(&coord)
    }

    /// Walkable on the grid and not under a unit
    pub fn is_open(&self, grid: &HexGrid, coord: HexCoord) -> bool {
        grid.is_walkable(coord) && !self.is_occupied(coord)
    }
}

/// Distance band a skill (or basic attack) can hit at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackReach {
    pub min: u32,
    pub max: u32,
}

impl AttackReach {
    /// A reach of one hex means the attacker has to walk up to the target
    pub fn is_melee(&self) -> bool {
        self.max <= 1
    }
}

/// Resolve the reach of a skill for an attacker
///
/// `distance`, then `max_distance`, then the unit's own attack range decide the
/// upper bound. The lower bound is `min_distance`, or 0 when the skill does not
/// set one; without a skill the unit's attack range applies as is.
pub fn effective_reach(attacker: &CombatUnit, range: Option<&SkillRange>) -> AttackReach {
    match range {
        Some(range) => AttackReach {
            min: range.min_distance.unwrap_or(0),
            max: range
                .distance
                .or(range.max_distance)
                .unwrap_or(attacker.attack_range.max),
        },
        None => AttackReach {
            min: attacker.attack_range.min,
            max: attacker.attack_range.max,
        },
    }
}

/// Breadth-first movement range
///
/// Every reachable cell appears once with its minimal step count; the start
/// cell is always included at distance 0. Expansion follows the row's
/// direction order, so the result order is stable.
pub fn walkable_nodes(
    grid: &HexGrid,
    occupancy: &Occupancy,
    start: HexCoord,
    move_range: u32,
) -> Vec<WalkableNode> {
    let mut nodes = vec![WalkableNode {
        coord: start,
        distance: 0,
    }];
    let mut visited: AHashSet<HexCoord> = AHashSet::new();
    visited.insert(start);

    let mut frontier = VecDeque::new();
    frontier.push_back((start, 0u32));

    while let Some((current, distance)) = frontier.pop_front() {
        if distance >= move_range {
            continue;
        }

        for neighbor in grid.neighbors(current) {
            if visited.contains(&neighbor) || !occupancy.is_open(grid, neighbor) {
                continue;
            }
            visited.insert(neighbor);
            nodes.push(WalkableNode {
                coord: neighbor,
                distance: distance + 1,
            });
            frontier.push_back((neighbor, distance + 1));
        }
    }

    nodes
}

/// Movement range of a unit that ignores terrain
///
/// Every in-bounds cell within `move_range` hexes of the start, obstacles
/// included, except cells under other units. The start comes first at
/// distance 0; the rest follow by distance, then coordinate.
pub fn flyable_nodes(
    grid: &HexGrid,
    occupancy: &Occupancy,
    start: HexCoord,
    move_range: u32,
) -> Vec<WalkableNode> {
    let mut nodes: Vec<WalkableNode> = grid
        .cells()
        .map(|cell| WalkableNode {
            coord: cell.coord,
            distance: start.distance(&cell.coord),
        })
        .filter(|n| n.coord != start && n.distance <= move_range)
        .filter(|n| !occupancy.is_occupied(n.coord))
        .collect();
    nodes.sort_by_key(|n| (n.distance, n.coord));

    nodes.insert(
        0,
        WalkableNode {
            coord: start,
            distance: 0,
        },
    );
    nodes
}

/// Movement range for this unit, honoring its ability to fly over terrain
pub fn movement_nodes(
    grid: &HexGrid,
    occupancy: &Occupancy,
    unit: &CombatUnit,
) -> Vec<WalkableNode> {
    if unit.can_ignore_obstacles {
        flyable_nodes(grid, occupancy, unit.coord, unit.move_range)
    } else {
        walkable_nodes(grid, occupancy, unit.coord, unit.move_range)
    }
}

/// Enemies the attacker can hit this turn
///
/// Melee reach walks: the enemy's cell is opened for the search, and the
/// enemy counts when the path ends next to it within `move_budget` steps.
/// Ranged reach measures hop distance with every in-bounds cell open and
/// ignores the budget.
pub fn attackable_nodes<'a>(
    grid: &HexGrid,
    occupancy: &Occupancy,
    attacker: &CombatUnit,
    enemies: impl IntoIterator<Item = &'a CombatUnit>,
    reach: AttackReach,
    move_budget: u32,
    heuristic: Heuristic,
) -> Vec<AttackableNode> {
    let mut nodes = Vec::new();

    for enemy in enemies {
        if !enemy.is_alive() || enemy.owner == attacker.owner {
            continue;
        }

        if reach.is_melee() {
            let goal = enemy.coord;
            let closes_in = if attacker.can_ignore_obstacles {
                can_land_next_to(grid, occupancy, attacker.coord, goal, move_budget)
            } else {
                let path = find_path_with(grid, attacker.coord, goal, heuristic, |c| {
                    c == goal || occupancy.is_open(grid, c)
                });
                // Length 1 is the unreachable fallback
                path.len() >= 2 && (path.len() - 2) as u32 <= move_budget
            };
            if closes_in {
                nodes.push(AttackableNode {
                    coord: goal,
                    unit_id: enemy.id,
                    distance: 1,
                });
            }
        } else {
            let path = find_path_with(grid, attacker.coord, enemy.coord, heuristic, |c| {
                grid.in_bounds(c)
            });
            if path.len() < 2 {
                continue;
            }
            let distance = (path.len() - 1) as u32;
            if reach.min <= distance && distance <= reach.max {
                nodes.push(AttackableNode {
                    coord: enemy.coord,
                    unit_id: enemy.id,
                    distance,
                });
            }
        }
    }

    nodes
}

/// A flyer needs a free cell next to the target within its flight budget
fn can_land_next_to(
    grid: &HexGrid,
    occupancy: &Occupancy,
    from: HexCoord,
    target: HexCoord,
    budget: u32,
) -> bool {
    from.is_adjacent(&target)
        || grid
            .neighbors(target)
            .any(|landing| !occupancy.is_occupied(landing) && from.distance(&landing) <= budget)
}

/// Cheap pre-filter: could the attacker possibly reach the target this turn?
///
/// Uses chebyshev distance on raw offsets against `move_range + reach.max`.
/// Only the hop-based queries above are authoritative.
pub fn is_in_attack_range(
    attacker: &CombatUnit,
    target: &CombatUnit,
    reach: AttackReach,
) -> (bool, u32) {
    let distance = attacker.coord.chebyshev(&target.coord);
    (distance <= attacker.move_range + reach.max, distance)
}
