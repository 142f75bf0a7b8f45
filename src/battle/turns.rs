//! Rounds and turns
//!
//! A round is an ordered list of turns, one per unit, generated by whoever
//! decides initiative. Only the match controller moves a turn through its
//! states.

use serde::{Deserialize, Serialize};

use crate::core::types::{RoundNo, SkillId, UnitId};

/// Phase of a single turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    #[default]
    Pending,
    /// The unit may still move
    ActiveMove,
    /// Movement is over; the unit may act
    ActiveAction,
    Done,
}

impl TurnStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, TurnStatus::ActiveMove | TurnStatus::ActiveAction)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatTurn {
    pub unit_id: UnitId,
    pub status: TurnStatus,
    #[serde(default)]
    pub skill_selection: Option<SkillId>,
}

impl CombatTurn {
    pub fn new(unit_id: UnitId) -> Self {
        Self {
            unit_id,
            status: TurnStatus::Pending,
            skill_selection: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatRound {
    pub no: RoundNo,
    pub turns: Vec<CombatTurn>,
}

impl CombatRound {
    /// A fresh round with every turn pending, in the given order
    pub fn new(no: RoundNo, order: impl IntoIterator<Item = UnitId>) -> Self {
        Self {
            no,
            turns: order.into_iter().map(CombatTurn::new).collect(),
        }
    }

    /// Index of the first turn still waiting
    pub fn first_pending(&self) -> Option<usize> {
        self.turns
            .iter()
            .position(|t| t.status == TurnStatus::Pending)
    }

    /// Index of the turn in ActiveMove or ActiveAction
    pub fn active_index(&self) -> Option<usize> {
        self.turns.iter().position(|t| t.status.is_active())
    }

    pub fn turn_of(&self, unit: UnitId) -> Option<&CombatTurn> {
        self.turns.iter().find(|t| t.unit_id == unit)
    }

    /// Every turn is done
    pub fn is_complete(&self) -> bool {
        self.turns.iter().all(|t| t.status == TurnStatus::Done)
    }
}
