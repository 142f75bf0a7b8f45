//! Resolution notifications
//!
//! Every mutation the controller performs is mirrored by one event. The log
//! is append-only with a monotonically increasing sequence number; callers
//! drain it to drive playback or to persist a replay.

use serde::{Deserialize, Serialize};

use crate::battle::hex::HexCoord;
use crate::core::types::{EffectId, RoundNo, SkillId, UnitId};
use crate::skills::triggers::TriggerEvent;

/// Outcome of one effect landing on (or pulsing on) one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectReport {
    pub unit: UnitId,
    pub effect: EffectId,
    pub kind: String,
    #[serde(default)]
    pub hp_delta: i32,
    #[serde(default)]
    pub mp_delta: i32,
    #[serde(default)]
    pub shield_absorbed: i32,
    #[serde(default)]
    pub critical: bool,
    /// The effect left the unit (expiry or depleted shield)
    #[serde(default)]
    pub expired: bool,
}

impl EffectReport {
    pub fn new(unit: UnitId, effect: EffectId, kind: &str) -> Self {
        Self {
            unit,
            effect,
            kind: kind.to_string(),
            hp_delta: 0,
            mp_delta: 0,
            shield_absorbed: 0,
            critical: false,
            expired: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEventKind {
    RoundStart {
        order: Vec<UnitId>,
    },
    TurnStart {
        unit: UnitId,
    },
    Move {
        unit: UnitId,
        path: Vec<HexCoord>,
    },
    Attack {
        unit: UnitId,
        target: UnitId,
        skill: SkillId,
        reports: Vec<EffectReport>,
        defeated: Vec<UnitId>,
    },
    Skill {
        unit: UnitId,
        target: Option<UnitId>,
        skill: SkillId,
        reports: Vec<EffectReport>,
        defeated: Vec<UnitId>,
    },
    /// A passive skill fired in response to a trigger
    Passive {
        unit: UnitId,
        skill: SkillId,
        trigger: TriggerEvent,
        reports: Vec<EffectReport>,
        defeated: Vec<UnitId>,
    },
    TurnEnd {
        unit: UnitId,
    },
    RoundEnd {
        /// Effect ticks applied at the round boundary
        ticks: Vec<EffectReport>,
        defeated: Vec<UnitId>,
    },
}

impl CombatEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            CombatEventKind::RoundStart { .. } => "round_start",
            CombatEventKind::TurnStart { .. } => "turn_start",
            CombatEventKind::Move { .. } => "move",
            CombatEventKind::Attack { .. } => "attack",
            CombatEventKind::Skill { .. } => "skill",
            CombatEventKind::Passive { .. } => "passive",
            CombatEventKind::TurnEnd { .. } => "turn_end",
            CombatEventKind::RoundEnd { .. } => "round_end",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub seq: u64,
    pub round: RoundNo,
    #[serde(flatten)]
    pub kind: CombatEventKind,
}

/// Append-only notification log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    next_seq: u64,
    pending: Vec<CombatEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, round: RoundNo, kind: CombatEventKind) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(CombatEvent { seq, round, kind });
        seq
    }

    /// Events not yet drained
    pub fn pending(&self) -> &[CombatEvent] {
        &self.pending
    }

    /// Take all undrained events; sequence numbers keep counting
    pub fn drain(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Total number of events ever pushed
    pub fn total(&self) -> u64 {
        self.next_seq
    }
}
