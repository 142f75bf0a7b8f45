//! Damage, healing and duration formulas
//!
//! Pure functions over stats and a [`CombatConfig`]; the only randomness is
//! the crit roll, which takes the caller's RNG.

use rand::Rng;

use crate::battle::units::Stats;
use crate::core::config::CombatConfig;
use crate::effects::effect::{DamageFalloff, DamageType, EffectKind};

/// `1 + attack * attack_coefficient`
pub fn attack_multiplier(config: &CombatConfig, attack: f32) -> f32 {
    1.0 + attack * config.attack_coefficient
}

/// `1 + int * linear + floor(int / step) * step_bonus`
pub fn intelligence_multiplier(config: &CombatConfig, intelligence: f32) -> f32 {
    let steps = (intelligence / config.intelligence_step).floor();
    1.0 + intelligence * config.intelligence_linear + steps * config.intelligence_step_bonus
}

/// `1 + def * linear + floor(def / step) * step_bonus`
pub fn defense_multiplier(config: &CombatConfig, defense: f32) -> f32 {
    let steps = (defense / config.defense_step).floor();
    1.0 + defense * config.defense_linear + steps * config.defense_step_bonus
}

/// Fraction of damage that gets through: `1 - def / (def + constant)`
pub fn defense_factor(config: &CombatConfig, defense: f32) -> f32 {
    let defense = defense.max(0.0);
    1.0 - defense / (defense + config.defense_constant)
}

/// Crit chance is `min(crit_rate, 100) / 100`
pub fn roll_crit<R: Rng + ?Sized>(rng: &mut R, crit_rate: f32) -> bool {
    let chance = (crit_rate.clamp(0.0, 100.0) / 100.0) as f64;
    // Always draw so the RNG stream does not depend on crit rate
    let roll: f64 = rng.gen();
    roll < chance
}

/// Damage before shield absorption
pub fn compute_damage(
    config: &CombatConfig,
    base: f32,
    attacker: &Stats,
    defender: &Stats,
    damage_type: DamageType,
    critical: bool,
) -> f32 {
    let mut damage = base * attack_multiplier(config, attacker.attack);
    if damage_type == DamageType::Magical {
        damage *= intelligence_multiplier(config, attacker.intelligence);
    }
    damage *= defense_factor(config, defender.defense);
    if critical {
        damage *= config.crit_multiplier;
    }
    damage.max(0.0)
}

/// Beyond `full_damage_range` only `min_damage_percent` of the value applies
pub fn apply_falloff(value: f32, falloff: Option<&DamageFalloff>, distance: u32) -> f32 {
    match falloff {
        Some(f) if distance > f.full_damage_range => value * f.min_damage_percent,
        _ => value,
    }
}

/// Heal-type values scale with caster intelligence
pub fn scale_heal(config: &CombatConfig, value: f32, caster: &Stats) -> f32 {
    value * intelligence_multiplier(config, caster.intelligence)
}

/// Shields scale with both caster intelligence and defense
pub fn scale_shield(config: &CombatConfig, value: f32, caster: &Stats) -> f32 {
    value
        * intelligence_multiplier(config, caster.intelligence)
        * defense_multiplier(config, caster.defense)
}

/// Effective duration after caster and recipient attributes
///
/// Buffs and heals-over-time last longer with caster intelligence; debuffs
/// and damage-over-time shrink with recipient status resistance.
pub fn scale_duration(
    config: &CombatConfig,
    kind: &EffectKind,
    duration: u32,
    caster: &Stats,
    recipient: &Stats,
) -> u32 {
    let d = duration as f32;
    let scaled = if kind.is_beneficial_over_time() {
        d * (1.0 + caster.intelligence * config.duration_bonus_per_int)
    } else if kind.is_harmful_over_time() {
        d * (1.0 - recipient.status_resistance * config.duration_reduction_per_resistance)
    } else {
        d
    };
    scaled.round().max(0.0) as u32
}
