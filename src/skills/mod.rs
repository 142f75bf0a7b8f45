//! Skills: catalog, definitions, passive triggers and the per-match resolver
//!
//! Active skills are chosen by the turn owner; passive skills respond to
//! combat events through trigger predicates.

pub mod catalog;
pub mod definitions;
pub mod resolver;
pub mod triggers;

pub use catalog::SkillCatalog;
pub use definitions::{Skill, SkillCost, SkillKind, SkillRange};
pub use resolver::{check_cost, facts_for, PassiveFiring, SkillResolution, SkillResolver};
pub use triggers::{CompareOp, Condition, FactSet, FactValue, TriggerCondition, TriggerEvent};
