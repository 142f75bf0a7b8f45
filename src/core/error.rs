use thiserror::Error;

use crate::battle::hex::HexCoord;
use crate::battle::turns::TurnStatus;
use crate::core::types::{SkillId, UnitId};

/// Which pool a skill cost is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Hp,
    Mp,
    Stamina,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Hp => f.write_str("hp"),
            ResourceKind::Mp => f.write_str("mp"),
            ResourceKind::Stamina => f.write_str("stamina"),
        }
    }
}

/// An action was well-formed but is not legal in the current state
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{unit} does not own the active turn")]
    NotTurnOwner { unit: UnitId, active: Option<UnitId> },

    #[error("{unit} is not next in turn order")]
    OutOfTurnOrder { unit: UnitId, expected: Option<UnitId> },

    #[error("turn is in {actual:?}, expected {expected:?}")]
    WrongPhase {
        expected: TurnStatus,
        actual: TurnStatus,
    },

    #[error("no turn is active")]
    NoActiveTurn,

    #[error("a turn is already active for {0}")]
    TurnAlreadyActive(UnitId),

    #[error("no round is in progress")]
    NoRound,

    #[error("round {0} is still in progress")]
    RoundInProgress(u32),

    #[error("round is malformed: {0}")]
    InvalidRound(String),

    #[error("{target} is out of range")]
    TargetOutOfRange { target: UnitId },

    #[error("{0} is not a valid target")]
    InvalidTarget(UnitId),

    #[error("skill {0} needs a target")]
    MissingTarget(SkillId),

    #[error("no path from {from} to {to}")]
    Unreachable { from: HexCoord, to: HexCoord },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("cell {0} is occupied")]
    CellOccupied(HexCoord),

    #[error("not enough {resource}: need {required}, have {available}")]
    InsufficientResources {
        resource: ResourceKind,
        required: i32,
        available: i32,
    },

    #[error("skill {skill} is on cooldown for {remaining} more turn(s)")]
    SkillOnCooldown { skill: SkillId, remaining: u32 },

    #[error("skill {0} is passive and cannot be used directly")]
    PassiveSkill(SkillId),

    #[error("skill {0} is not available right now")]
    SkillUnavailable(SkillId),

    #[error("{0} does not know skill {1}")]
    SkillNotKnown(UnitId, SkillId),

    #[error("{0} has no usable skill")]
    NoSkill(UnitId),

    #[error("{0} is stunned")]
    UnitStunned(UnitId),

    #[error("{0} is defeated")]
    UnitDefeated(UnitId),

    #[error("invalid setup: {0}")]
    InvalidSetup(String),
}

/// A reference to something the match does not know about
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotFoundError {
    #[error("unit not found: {0}")]
    Unit(UnitId),

    #[error("skill not found: {0}")]
    Skill(SkillId),

    #[error("coordinate out of bounds: {0}")]
    Coordinate(HexCoord),
}

/// The pathfinder fell back to a start-only path
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no path from {from} to {to}")]
pub struct UnreachableWarning {
    pub from: HexCoord,
    pub to: HexCoord,
}

/// Typed rejection returned by every public engine operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}

impl From<UnreachableWarning> for EngineError {
    fn from(warning: UnreachableWarning) -> Self {
        EngineError::Validation(ValidationError::Unreachable {
            from: warning.from,
            to: warning.to,
        })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while loading catalogs, configs and scenarios
#[derive(Debug, Error)]
pub enum LoadError {
    /// JSON parsing failed
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
    /// File I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// The same skill id appears twice in a catalog
    #[error("duplicate skill id: {0}")]
    DuplicateSkill(SkillId),
    /// Loaded values are internally inconsistent
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// The loaded data could not be turned into a match
    #[error(transparent)]
    Engine(#[from] EngineError),
}
