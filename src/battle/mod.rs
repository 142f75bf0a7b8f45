//! Battle system - hex grid, pathfinding, range queries and the turn cycle
//!
//! Queries flow grid → pathfinder → range calculator. All mutation goes
//! through [`CombatMatch`], which drives skills and effects for the active
//! unit.

pub mod battle_map;
pub mod controller;
pub mod events;
pub mod hex;
pub mod pathfinding;
pub mod range;
pub mod scenario;
pub mod turns;
pub mod units;

// Re-exports for convenient access
pub use battle_map::{CellType, GridCell, HexGrid, MapDirection, MapModel};
pub use controller::{CombatMatch, LegalActions, MatchOutcome};
pub use events::{CombatEvent, CombatEventKind, EffectReport, EventLog};
pub use hex::HexCoord;
pub use pathfinding::{
    find_path, find_path_with, flight_path, path_steps, try_find_path, Heuristic,
};
pub use range::{
    attackable_nodes, effective_reach, flyable_nodes, is_in_attack_range, movement_nodes,
    walkable_nodes, AttackReach, AttackableNode, Occupancy, WalkableNode,
};
pub use scenario::{Scenario, UnitSpec};
pub use turns::{CombatRound, CombatTurn, TurnStatus};
pub use units::{AttackRange, CombatUnit, Pool, Roster, Stats, UnitStatus};
