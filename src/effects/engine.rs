//! Applying, ticking and removing status effects on a unit
//!
//! Values are resolved once, when the effect lands: falloff, attribute
//! scaling and the crit roll are baked into the stored kind. Pulses at round
//! end reuse that value.

use rand::Rng;
use std::collections::BTreeMap;
use tracing::debug;

use crate::battle::events::EffectReport;
use crate::battle::hex::HexCoord;
use crate::battle::units::{CombatUnit, Stats, UnitStatus};
use crate::core::config::CombatConfig;
use crate::core::types::{EffectId, UnitId};
use crate::effects::effect::{ActiveEffect, Effect, EffectKind, ModifierType, Stat};
use crate::effects::formula::{
    apply_falloff, compute_damage, roll_crit, scale_duration, scale_heal, scale_shield,
};

/// Snapshot of whoever casts an effect
///
/// Taken before resolution so the caster can also be the recipient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectSource {
    pub unit: UnitId,
    pub coord: HexCoord,
    pub stats: Stats,
}

impl EffectSource {
    pub fn of(unit: &CombatUnit) -> Self {
        Self {
            unit: unit.id,
            coord: unit.coord,
            stats: unit.stats,
        }
    }
}

/// Land one effect on a recipient
///
/// Instant parts (damage, heals, mp, shield points) apply every time. The
/// persistent part is stored when the resolved duration is above zero;
/// re-applying an id that is already active refreshes it instead.
pub fn apply_effect<R: Rng + ?Sized>(
    config: &CombatConfig,
    rng: &mut R,
    effect: &Effect,
    source: &EffectSource,
    recipient: &mut CombatUnit,
) -> EffectReport {
    let mut report = EffectReport::new(recipient.id, effect.id.clone(), effect.kind.name());
    let distance = source.coord.distance(&recipient.coord);

    let duration = if effect.kind.is_instant() {
        0
    } else {
        scale_duration(
            config,
            &effect.kind,
            effect.duration,
            &source.stats,
            &recipient.stats,
        )
    };

    let resolved = resolve_kind(config, rng, effect, source, recipient, distance, &mut report);
    let existing = recipient
        .active_effects
        .iter()
        .position(|e| e.id == effect.id);

    match &resolved {
        EffectKind::Buff {
            modifiers,
            modifier_type,
        } => {
            if existing.is_none() && duration > 0 {
                let applied = apply_modifiers(&mut recipient.stats, modifiers, *modifier_type, 1.0);
                store(recipient, effect, resolved.clone(), duration, source.unit, applied);
                return report;
            }
        }
        EffectKind::Debuff {
            modifiers,
            modifier_type,
        } => {
            if existing.is_none() && duration > 0 {
                let applied =
                    apply_modifiers(&mut recipient.stats, modifiers, *modifier_type, -1.0);
                store(recipient, effect, resolved.clone(), duration, source.unit, applied);
                return report;
            }
        }
        EffectKind::Dot { value, .. } | EffectKind::Damage { value, .. } => {
            let (hp_delta, absorbed) = absorb_damage(recipient, *value);
            report.hp_delta = hp_delta;
            report.shield_absorbed = absorbed;
        }
        EffectKind::Hot { value } | EffectKind::Heal { value } => {
            report.hp_delta = recipient.hp.apply_delta(value.round() as i32);
        }
        EffectKind::Stun => {
            if duration > 0 {
                recipient.status = UnitStatus::Stunned;
            }
        }
        EffectKind::Shield { value } => {
            recipient.shield.current += value.round().max(0.0) as i32;
            recipient.shield.max = recipient.shield.max.max(recipient.shield.current);
        }
        EffectKind::MpDrain { value } => {
            report.mp_delta = recipient.mp.apply_delta(-(value.round() as i32));
        }
        EffectKind::MpRestore { value } => {
            report.mp_delta = recipient.mp.apply_delta(value.round() as i32);
        }
    }

    if duration > 0 && !effect.kind.is_instant() {
        match existing {
            Some(index) => {
                let active = &mut recipient.active_effects[index];
                active.remaining = duration;
                active.source = source.unit;
                // Modifier deltas stay as first applied
                if !matches!(active.kind, EffectKind::Buff { .. } | EffectKind::Debuff { .. }) {
                    active.kind = resolved;
                }
                debug!(unit = %recipient.id, effect = %effect.id, duration, "effect refreshed");
            }
            None => store(recipient, effect, resolved, duration, source.unit, BTreeMap::new()),
        }
    }

    // A shield that was stored and then fully spent this instant leaves at once
    if recipient.shield.current == 0 {
        drop_spent_shields(recipient);
    }

    report
}

fn resolve_kind<R: Rng + ?Sized>(
    config: &CombatConfig,
    rng: &mut R,
    effect: &Effect,
    source: &EffectSource,
    recipient: &CombatUnit,
    distance: u32,
    report: &mut EffectReport,
) -> EffectKind {
    let falloff = effect.falloff.as_ref();
    match &effect.kind {
        EffectKind::Dot {
            value,
            damage_type: Some(damage_type),
        }
        | EffectKind::Damage {
            value,
            damage_type,
        } => {
            let base = apply_falloff(*value, falloff, distance);
            let critical = roll_crit(rng, source.stats.crit_rate);
            report.critical = critical;
            let damage = compute_damage(
                config,
                base,
                &source.stats,
                &recipient.stats,
                *damage_type,
                critical,
            );
            effect.kind.with_value(damage)
        }
        EffectKind::Dot { value, .. } | EffectKind::MpDrain { value } => {
            effect.kind.with_value(apply_falloff(*value, falloff, distance))
        }
        EffectKind::Hot { value } | EffectKind::Heal { value } | EffectKind::MpRestore { value } => {
            let base = apply_falloff(*value, falloff, distance);
            effect.kind.with_value(scale_heal(config, base, &source.stats))
        }
        EffectKind::Shield { value } => {
            let base = apply_falloff(*value, falloff, distance);
            effect.kind.with_value(scale_shield(config, base, &source.stats))
        }
        EffectKind::Buff { .. } | EffectKind::Debuff { .. } | EffectKind::Stun => {
            effect.kind.clone()
        }
    }
}

fn store(
    recipient: &mut CombatUnit,
    effect: &Effect,
    kind: EffectKind,
    remaining: u32,
    source: UnitId,
    applied: BTreeMap<Stat, f32>,
) {
    debug!(unit = %recipient.id, effect = %effect.id, remaining, "effect applied");
    recipient.active_effects.push(ActiveEffect {
        id: effect.id.clone(),
        kind,
        remaining,
        source,
        applied,
    });
}

/// Apply signed modifiers and return the exact deltas written
fn apply_modifiers(
    stats: &mut Stats,
    modifiers: &BTreeMap<Stat, f32>,
    modifier_type: ModifierType,
    sign: f32,
) -> BTreeMap<Stat, f32> {
    let mut applied = BTreeMap::new();
    for (stat, value) in modifiers {
        let slot = stats.get_mut(*stat);
        let delta = match modifier_type {
            ModifierType::Additive => sign * value,
            ModifierType::Multiplicative => *slot * sign * value,
        };
        *slot += delta;
        applied.insert(*stat, delta);
    }
    applied
}

fn revert_modifiers(stats: &mut Stats, applied: &BTreeMap<Stat, f32>) {
    for (stat, delta) in applied {
        *stats.get_mut(*stat) -= delta;
    }
}

/// Route damage through the shield, then into hp
///
/// Returns `(hp_delta, shield_absorbed)`; hp never goes below zero.
pub fn absorb_damage(unit: &mut CombatUnit, amount: f32) -> (i32, i32) {
    let amount = amount.max(0.0);
    let absorbed = (unit.shield.current.max(0) as f32).min(amount);
    let absorbed_points = (absorbed.round() as i32).min(unit.shield.current.max(0));
    unit.shield.current -= absorbed_points;

    let remainder = (amount - absorbed).round().max(0.0) as i32;
    let hp_delta = unit.hp.apply_delta(-remainder);

    if unit.shield.current == 0 {
        drop_spent_shields(unit);
    }

    (hp_delta, absorbed_points)
}

fn drop_spent_shields(unit: &mut CombatUnit) {
    unit.active_effects.retain(|e| !e.is_shield());
}

/// Advance every active effect on a living unit by one round
///
/// Expired effects come off first: modifiers are reverted and stun clears
/// when no other instance remains. Leftover shield points stay on the unit.
/// Surviving damage and heal over time effects then pulse with their stored
/// value.
pub fn tick_effects(unit: &mut CombatUnit) -> Vec<EffectReport> {
    let mut reports = Vec::new();
    if !unit.is_alive() {
        return reports;
    }

    let mut kept = Vec::with_capacity(unit.active_effects.len());
    let mut expired = Vec::new();
    for mut effect in std::mem::take(&mut unit.active_effects) {
        effect.remaining = effect.remaining.saturating_sub(1);
        if effect.remaining == 0 {
            expired.push(effect);
        } else {
            kept.push(effect);
        }
    }

    for effect in &expired {
        revert_modifiers(&mut unit.stats, &effect.applied);
        let mut report = EffectReport::new(unit.id, effect.id.clone(), effect.kind.name());
        report.expired = true;
        reports.push(report);
    }
    if expired.iter().any(|e| e.is_stun()) && !kept.iter().any(|e| e.is_stun()) {
        unit.status = UnitStatus::Normal;
    }

    unit.active_effects = kept;

    // Pulses can drop spent shields, so work from a snapshot
    let pulses: Vec<(EffectId, EffectKind)> = unit
        .active_effects
        .iter()
        .filter(|e| matches!(e.kind, EffectKind::Dot { .. } | EffectKind::Hot { .. }))
        .map(|e| (e.id.clone(), e.kind.clone()))
        .collect();

    for (id, kind) in pulses {
        let mut report = EffectReport::new(unit.id, id, kind.name());
        match kind {
            EffectKind::Dot { value, .. } => {
                let (hp_delta, absorbed) = absorb_damage(unit, value);
                report.hp_delta = hp_delta;
                report.shield_absorbed = absorbed;
            }
            EffectKind::Hot { value } => {
                report.hp_delta = unit.hp.apply_delta(value.round() as i32);
            }
            _ => {}
        }
        reports.push(report);
    }

    if unit.shield.current == 0 {
        drop_spent_shields(unit);
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::OwnerId;
    use crate::effects::effect::DamageType;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn unit(id: u32) -> CombatUnit {
        CombatUnit::new(UnitId(id), OwnerId(id), HexCoord::new(id as i32, 0))
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn test_shield_then_dot_absorbs_first() {
        let config = CombatConfig::default();
        let mut rng = rng();
        let caster = unit(1);
        let mut target = unit(2);
        let source = EffectSource::of(&caster);

        let shield = Effect::new("ward", EffectKind::Shield { value: 50.0 }).with_duration(3);
        apply_effect(&config, &mut rng, &shield, &EffectSource::of(&target), &mut target);
        assert_eq!(target.shield.current, 50);

        let dot = Effect::new(
            "burn",
            EffectKind::Dot {
                value: 70.0,
                damage_type: None,
            },
        )
        .with_duration(2);
        let report = apply_effect(&config, &mut rng, &dot, &source, &mut target);

        assert_eq!(target.shield.current, 0);
        assert_eq!(target.hp.current, 80);
        assert_eq!(report.shield_absorbed, 50);
        assert_eq!(report.hp_delta, -20);
        assert!(!target.active_effects.iter().any(|e| e.is_shield()));
        assert!(target.has_effect(&EffectId::new("burn")));
    }

    #[test]
    fn test_buff_applies_and_reverts() {
        let config = CombatConfig::default();
        let mut rng = rng();
        let mut target = unit(1);
        target.stats.attack = 20.0;
        let source = EffectSource::of(&target);

        let mut modifiers = BTreeMap::new();
        modifiers.insert(Stat::Attack, 0.5);
        let buff = Effect::new(
            "fury",
            EffectKind::Buff {
                modifiers,
                modifier_type: ModifierType::Multiplicative,
            },
        )
        .with_duration(1);

        apply_effect(&config, &mut rng, &buff, &source, &mut target);
        assert!((target.stats.attack - 30.0).abs() < 1e-4);

        // Refresh does not stack the modifier
        apply_effect(&config, &mut rng, &buff, &source, &mut target);
        assert!((target.stats.attack - 30.0).abs() < 1e-4);
        assert_eq!(target.active_effects.len(), 1);

        let reports = tick_effects(&mut target);
        assert!(reports[0].expired);
        assert!((target.stats.attack - 20.0).abs() < 1e-4);
        assert!(target.active_effects.is_empty());
    }

    #[test]
    fn test_additive_debuff_lowers_stat() {
        let config = CombatConfig::default();
        let mut rng = rng();
        let caster = unit(1);
        let mut target = unit(2);
        target.stats.defense = 10.0;

        let mut modifiers = BTreeMap::new();
        modifiers.insert(Stat::Defense, 4.0);
        let debuff = Effect::new(
            "sunder",
            EffectKind::Debuff {
                modifiers,
                modifier_type: ModifierType::Additive,
            },
        )
        .with_duration(2);

        apply_effect(&config, &mut rng, &debuff, &EffectSource::of(&caster), &mut target);
        assert!((target.stats.defense - 6.0).abs() < 1e-4);
        tick_effects(&mut target);
        assert!((target.stats.defense - 6.0).abs() < 1e-4);
        tick_effects(&mut target);
        assert!((target.stats.defense - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_stun_lifecycle() {
        let config = CombatConfig::default();
        let mut rng = rng();
        let caster = unit(1);
        let mut target = unit(2);

        let stun = Effect::new("daze", EffectKind::Stun).with_duration(1);
        apply_effect(&config, &mut rng, &stun, &EffectSource::of(&caster), &mut target);
        assert!(target.is_stunned());

        tick_effects(&mut target);
        assert!(!target.is_stunned());
    }

    #[test]
    fn test_dot_pulses_once_per_round_of_duration() {
        let config = CombatConfig::default();
        let mut rng = rng();
        let caster = unit(1);
        let mut target = unit(2);

        let dot = Effect::new(
            "poison",
            EffectKind::Dot {
                value: 5.0,
                damage_type: None,
            },
        )
        .with_duration(3);
        apply_effect(&config, &mut rng, &dot, &EffectSource::of(&caster), &mut target);
        for _ in 0..5 {
            tick_effects(&mut target);
        }
        assert_eq!(target.hp.current, 85);
        assert!(target.active_effects.is_empty());
    }

    #[test]
    fn test_shield_points_outlive_expiry() {
        let config = CombatConfig::default();
        let mut rng = rng();
        let mut target = unit(1);
        let source = EffectSource::of(&target);

        let shield = Effect::new("ward", EffectKind::Shield { value: 40.0 }).with_duration(1);
        apply_effect(&config, &mut rng, &shield, &source, &mut target);
        assert_eq!(target.shield.current, 40);
        assert_eq!(target.shield.max, 40);

        let reports = tick_effects(&mut target);
        assert!(reports.iter().any(|r| r.expired));
        assert!(!target.has_effect(&EffectId::new("ward")));
        assert_eq!(target.shield.current, 40);

        // The leftover still soaks damage
        let (hp_delta, absorbed) = absorb_damage(&mut target, 30.0);
        assert_eq!((hp_delta, absorbed), (0, 30));
        assert_eq!(target.shield.current, 10);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let config = CombatConfig::default();
        let mut rng = rng();
        let mut target = unit(1);
        target.hp.current = 90;
        let source = EffectSource::of(&target);

        let heal = Effect::new("mend", EffectKind::Heal { value: 30.0 }).with_duration(5);
        let report = apply_effect(&config, &mut rng, &heal, &source, &mut target);
        assert_eq!(report.hp_delta, 10);
        assert_eq!(target.hp.current, 100);
        // Instant kinds never persist
        assert!(target.active_effects.is_empty());
    }

    #[test]
    fn test_damage_through_formula_and_defense() {
        let config = CombatConfig::default();
        let mut rng = rng();
        let caster = unit(1);
        let mut target = unit(2);
        target.stats.defense = 100.0;

        let hit = Effect::new(
            "strike",
            EffectKind::Damage {
                value: 40.0,
                damage_type: DamageType::Physical,
            },
        );
        let report = apply_effect(&config, &mut rng, &hit, &EffectSource::of(&caster), &mut target);
        assert_eq!(report.hp_delta, -20);
        assert!(!report.critical);
    }

    #[test]
    fn test_mp_drain_clamps_at_zero() {
        let config = CombatConfig::default();
        let mut rng = rng();
        let caster = unit(1);
        let mut target = unit(2);
        target.mp.current = 3;

        let drain = Effect::new("siphon", EffectKind::MpDrain { value: 10.0 });
        let report = apply_effect(&config, &mut rng, &drain, &EffectSource::of(&caster), &mut target);
        assert_eq!(report.mp_delta, -3);
        assert_eq!(target.mp.current, 0);
    }
}
