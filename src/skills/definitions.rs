//! Skill definitions as loaded from the catalog

use serde::{Deserialize, Serialize};

use crate::core::types::SkillId;
use crate::effects::effect::{Effect, EffectTarget};
use crate::skills::triggers::{Condition, TriggerCondition, TriggerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    #[default]
    Active,
    Passive,
}

/// Targeting distance of a skill
///
/// `distance` is a fixed reach; `min_distance`/`max_distance` describe a band.
/// Anything left unset falls back to the caster's own attack range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SkillRange {
    #[serde(default)]
    pub distance: Option<u32>,
    #[serde(default)]
    pub min_distance: Option<u32>,
    #[serde(default)]
    pub max_distance: Option<u32>,
}

/// Resources drawn when an active skill resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillCost {
    pub mp: i32,
    pub hp: i32,
    pub stamina: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: SkillKind,
    #[serde(default)]
    pub range: SkillRange,
    #[serde(default)]
    pub cost: SkillCost,
    /// Turns before the skill can be used again
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default)]
    pub effects: Vec<Effect>,
    /// Events that fire a passive skill
    #[serde(default)]
    pub triggers: Vec<TriggerCondition>,
    /// Extra gate for active use
    #[serde(default)]
    pub availability: Option<Condition>,
    /// A hit with this skill lets the target's `on_hit` passives respond
    #[serde(default)]
    pub can_trigger_counter: bool,
    /// Higher goes first when picking a default skill
    #[serde(default)]
    pub priority: i32,
}

impl Skill {
    pub fn new(id: impl Into<SkillId>, kind: SkillKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind,
            range: SkillRange::default(),
            cost: SkillCost::default(),
            cooldown: 0,
            effects: Vec::new(),
            triggers: Vec::new(),
            availability: None,
            can_trigger_counter: false,
            priority: 0,
        }
    }

    pub fn active(id: impl Into<SkillId>) -> Self {
        Self::new(id, SkillKind::Active)
    }

    pub fn passive(id: impl Into<SkillId>) -> Self {
        Self::new(id, SkillKind::Passive)
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_cost(mut self, cost: SkillCost) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_cooldown(mut self, cooldown: u32) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_range(mut self, range: SkillRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_trigger(mut self, trigger: TriggerCondition) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_active(&self) -> bool {
        self.kind == SkillKind::Active
    }

    pub fn is_passive(&self) -> bool {
        self.kind == SkillKind::Passive
    }

    /// At least one harmful effect lands on the chosen target. Such skills
    /// need a living enemy in reach; the rest may go to allies or the caster.
    pub fn is_offensive(&self) -> bool {
        self.effects
            .iter()
            .any(|e| e.recipient() == EffectTarget::Target && e.kind.is_harmful())
    }

    /// Does any trigger listen for this event?
    pub fn listens_to(&self, event: TriggerEvent) -> bool {
        self.triggers.iter().any(|t| t.event == event)
    }
}
