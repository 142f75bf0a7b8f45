//! Status effects: definitions, formulas and the per-unit engine

pub mod effect;
pub mod engine;
pub mod formula;

pub use effect::{
    ActiveEffect, DamageFalloff, DamageType, Effect, EffectKind, EffectTarget, ModifierType, Stat,
};
pub use engine::{absorb_damage, apply_effect, tick_effects, EffectSource};
