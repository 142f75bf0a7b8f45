pub mod config;
pub mod error;
pub mod types;

pub use config::CombatConfig;
pub use error::{
    EngineError, LoadError, NotFoundError, ResourceKind, Result, UnreachableWarning, ValidationError,
};
pub use types::{EffectId, MatchId, OwnerId, RoundNo, SkillId, UnitId};
