//! Hex Tactics - combat resolution core for a hex-grid tactics game
//!
//! Spatial model, pathfinding, range queries, the turn/round state machine
//! and the skill and status-effect engine. Rendering, transport and
//! persistence live elsewhere.

pub mod battle;
pub mod core;
pub mod effects;
pub mod skills;
