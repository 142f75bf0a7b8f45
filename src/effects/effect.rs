//! Effect definitions as they appear in the skill catalog, and the
//! per-unit record of an effect that is currently active.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::{EffectId, UnitId};

/// A unit attribute that buffs and debuffs can modify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Attack,
    Defense,
    Intelligence,
    CritRate,
    StatusResistance,
}

impl Stat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stat::Attack => "attack",
            Stat::Defense => "defense",
            Stat::Intelligence => "intelligence",
            Stat::CritRate => "crit_rate",
            Stat::StatusResistance => "status_resistance",
        }
    }

    pub fn all() -> [Stat; 5] {
        [
            Stat::Attack,
            Stat::Defense,
            Stat::Intelligence,
            Stat::CritRate,
            Stat::StatusResistance,
        ]
    }
}

/// How a modifier value combines with the current stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierType {
    /// `stat + value`
    #[default]
    Additive,
    /// `stat * (1 + value)`
    Multiplicative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    #[default]
    Physical,
    Magical,
}

/// Damage reduction beyond a distance threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageFalloff {
    pub full_damage_range: u32,
    /// Fraction of the value kept past `full_damage_range` (0.0..=1.0)
    pub min_damage_percent: f32,
}

/// Who receives an effect when a skill resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTarget {
    Caster,
    Target,
}

/// What an effect does, with the data each kind needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKind {
    Buff {
        modifiers: BTreeMap<Stat, f32>,
        #[serde(default)]
        modifier_type: ModifierType,
    },
    Debuff {
        modifiers: BTreeMap<Stat, f32>,
        #[serde(default)]
        modifier_type: ModifierType,
    },
    /// Damage on application and again every round it survives
    Dot {
        value: f32,
        /// When set, the value runs through the damage formula once at application
        #[serde(default)]
        damage_type: Option<DamageType>,
    },
    Hot {
        value: f32,
    },
    Stun,
    Shield {
        value: f32,
    },
    MpDrain {
        value: f32,
    },
    MpRestore {
        value: f32,
    },
    /// Instantaneous damage through the damage formula
    Damage {
        value: f32,
        #[serde(default)]
        damage_type: DamageType,
    },
    Heal {
        value: f32,
    },
}

impl EffectKind {
    /// Catalog name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::Buff { .. } => "buff",
            EffectKind::Debuff { .. } => "debuff",
            EffectKind::Dot { .. } => "dot",
            EffectKind::Hot { .. } => "hot",
            EffectKind::Stun => "stun",
            EffectKind::Shield { .. } => "shield",
            EffectKind::MpDrain { .. } => "mp_drain",
            EffectKind::MpRestore { .. } => "mp_restore",
            EffectKind::Damage { .. } => "damage",
            EffectKind::Heal { .. } => "heal",
        }
    }

    /// Recipient when the effect does not name one
    pub fn default_recipient(&self) -> EffectTarget {
        match self {
            EffectKind::Buff { .. }
            | EffectKind::Hot { .. }
            | EffectKind::MpRestore { .. }
            | EffectKind::Shield { .. } => EffectTarget::Caster,
            _ => EffectTarget::Target,
        }
    }

    /// Scalar value carried by the kind, if any
    pub fn value(&self) -> Option<f32> {
        match self {
            EffectKind::Dot { value, .. }
            | EffectKind::Hot { value }
            | EffectKind::Shield { value }
            | EffectKind::MpDrain { value }
            | EffectKind::MpRestore { value }
            | EffectKind::Damage { value, .. }
            | EffectKind::Heal { value } => Some(*value),
            _ => None,
        }
    }

    /// Copy of the kind with its scalar value replaced
    pub fn with_value(&self, new_value: f32) -> EffectKind {
        let mut kind = self.clone();
        match &mut kind {
            EffectKind::Dot { value, .. }
            | EffectKind::Hot { value }
            | EffectKind::Shield { value }
            | EffectKind::MpDrain { value }
            | EffectKind::MpRestore { value }
            | EffectKind::Damage { value, .. }
            | EffectKind::Heal { value } => *value = new_value,
            _ => {}
        }
        kind
    }

    /// Duration is stretched by the caster's intelligence
    pub fn is_beneficial_over_time(&self) -> bool {
        matches!(self, EffectKind::Buff { .. } | EffectKind::Hot { .. })
    }

    /// Duration is shortened by the recipient's status resistance
    pub fn is_harmful_over_time(&self) -> bool {
        matches!(self, EffectKind::Debuff { .. } | EffectKind::Dot { .. })
    }

    /// Kinds that hurt or hinder whoever receives them
    pub fn is_harmful(&self) -> bool {
        matches!(
            self,
            EffectKind::Damage { .. }
                | EffectKind::Dot { .. }
                | EffectKind::Debuff { .. }
                | EffectKind::Stun
                | EffectKind::MpDrain { .. }
        )
    }

    /// Kinds that never persist, whatever their declared duration
    pub fn is_instant(&self) -> bool {
        matches!(self, EffectKind::Damage { .. } | EffectKind::Heal { .. })
    }
}

/// One effect entry of a skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub id: EffectId,
    #[serde(flatten)]
    pub kind: EffectKind,
    /// Rounds the effect stays active; 0 means instant only
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub target: Option<EffectTarget>,
    /// Also lands on the recipient's allies within this hex distance
    #[serde(default)]
    pub area_radius: Option<u32>,
    #[serde(default)]
    pub falloff: Option<DamageFalloff>,
}

impl Effect {
    pub fn new(id: impl Into<EffectId>, kind: EffectKind) -> Self {
        Self {
            id: id.into(),
            kind,
            duration: 0,
            target: None,
            area_radius: None,
            falloff: None,
        }
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_target(mut self, target: EffectTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_area(mut self, radius: u32) -> Self {
        self.area_radius = Some(radius);
        self
    }

    pub fn with_falloff(mut self, full_damage_range: u32, min_damage_percent: f32) -> Self {
        self.falloff = Some(DamageFalloff {
            full_damage_range,
            min_damage_percent,
        });
        self
    }

    /// Resolved recipient: explicit override, else the kind's default
    pub fn recipient(&self) -> EffectTarget {
        self.target.unwrap_or_else(|| self.kind.default_recipient())
    }
}

/// An effect currently attached to a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub id: EffectId,
    /// Kind with its value already resolved against caster and recipient
    pub kind: EffectKind,
    pub remaining: u32,
    pub source: UnitId,
    /// Stat deltas actually applied, reverted on removal
    #[serde(default)]
    pub applied: BTreeMap<Stat, f32>,
}

impl ActiveEffect {
    pub fn is_stun(&self) -> bool {
        matches!(self.kind, EffectKind::Stun)
    }

    pub fn is_shield(&self) -> bool {
        matches!(self.kind, EffectKind::Shield { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_from_json_tagged() {
        let json = r#"{"id": "burn", "type": "dot", "value": 12.0, "duration": 3}"#;
        let effect: Effect = serde_json::from_str(json).unwrap();
        assert_eq!(effect.id, EffectId::new("burn"));
        assert_eq!(effect.duration, 3);
        assert_eq!(
            effect.kind,
            EffectKind::Dot {
                value: 12.0,
                damage_type: None
            }
        );
    }

    #[test]
    fn test_buff_modifiers_from_json() {
        let json = r#"{
            "id": "war_cry",
            "type": "buff",
            "modifiers": {"attack": 0.2, "crit_rate": 0.1},
            "modifier_type": "multiplicative",
            "duration": 2
        }"#;
        let effect: Effect = serde_json::from_str(json).unwrap();
        match effect.kind {
            EffectKind::Buff {
                modifiers,
                modifier_type,
            } => {
                assert_eq!(modifier_type, ModifierType::Multiplicative);
                assert_eq!(modifiers.get(&Stat::Attack), Some(&0.2));
                assert_eq!(modifiers.get(&Stat::CritRate), Some(&0.1));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_stun_has_no_payload() {
        let effect: Effect =
            serde_json::from_str(r#"{"id": "daze", "type": "stun", "duration": 1}"#).unwrap();
        assert_eq!(effect.kind, EffectKind::Stun);
        assert_eq!(effect.recipient(), EffectTarget::Target);
    }

    #[test]
    fn test_default_recipients() {
        let shield = Effect::new("ward", EffectKind::Shield { value: 30.0 });
        assert_eq!(shield.recipient(), EffectTarget::Caster);

        let drain = Effect::new("siphon", EffectKind::MpDrain { value: 5.0 });
        assert_eq!(drain.recipient(), EffectTarget::Target);

        let overridden = drain.with_target(EffectTarget::Caster);
        assert_eq!(overridden.recipient(), EffectTarget::Caster);
    }

    #[test]
    fn test_with_value_keeps_kind() {
        let kind = EffectKind::Damage {
            value: 10.0,
            damage_type: DamageType::Magical,
        };
        assert_eq!(
            kind.with_value(4.0),
            EffectKind::Damage {
                value: 4.0,
                damage_type: DamageType::Magical
            }
        );
        assert_eq!(EffectKind::Stun.with_value(3.0), EffectKind::Stun);
    }
}
