//! Skill resolution: validation, cost payment, effect dispatch and passives
//!
//! One resolver exists per match. It owns the catalog snapshot and the
//! match RNG, so identical seeds and action sequences replay identically.
//! Validation borrows state immutably; only `execute` and `fire_passives`
//! mutate, and they run after validation has passed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::events::EffectReport;
use crate::battle::units::{CombatUnit, Roster};
use crate::core::config::CombatConfig;
use crate::core::error::{EngineError, NotFoundError, ResourceKind, ValidationError};
use crate::core::types::{SkillId, UnitId};
use crate::effects::effect::{Effect, EffectTarget, Stat};
use crate::effects::engine::{apply_effect, EffectSource};
use crate::skills::catalog::SkillCatalog;
use crate::skills::definitions::{Skill, SkillCost};
use crate::skills::triggers::{FactSet, TriggerEvent};

/// What one skill use (active or passive) did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillResolution {
    pub caster: UnitId,
    pub skill: SkillId,
    pub target: Option<UnitId>,
    pub reports: Vec<EffectReport>,
    pub defeated: Vec<UnitId>,
}

/// A passive skill that fired for a trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassiveFiring {
    pub trigger: TriggerEvent,
    pub resolution: SkillResolution,
}

/// Reject when any pool is short of the cost
pub fn check_cost(unit: &CombatUnit, cost: &SkillCost) -> Result<(), ValidationError> {
    let checks = [
        (ResourceKind::Mp, cost.mp, unit.mp.current),
        (ResourceKind::Hp, cost.hp, unit.hp.current),
        (ResourceKind::Stamina, cost.stamina, unit.stamina.current),
    ];
    for (resource, required, available) in checks {
        if available < required {
            return Err(ValidationError::InsufficientResources {
                resource,
                required,
                available,
            });
        }
    }
    Ok(())
}

pub struct SkillResolver {
    catalog: SkillCatalog,
    config: CombatConfig,
    rng: ChaCha8Rng,
}

impl SkillResolver {
    pub fn new(catalog: SkillCatalog, config: CombatConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            catalog,
            config,
            rng,
        }
    }

    pub fn catalog(&self) -> &SkillCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn skill(&self, id: &SkillId) -> Result<&Skill, NotFoundError> {
        self.catalog.require(id)
    }

    /// Check that `caster` may use `skill_id` right now
    pub fn validate_use(
        &self,
        caster: &CombatUnit,
        skill_id: &SkillId,
        target: Option<&CombatUnit>,
    ) -> Result<&Skill, EngineError> {
        if !caster.is_alive() {
            return Err(ValidationError::UnitDefeated(caster.id).into());
        }
        if caster.is_stunned() {
            return Err(ValidationError::UnitStunned(caster.id).into());
        }
        if !caster.knows_skill(skill_id) {
            return Err(ValidationError::SkillNotKnown(caster.id, skill_id.clone()).into());
        }

        let skill = self.catalog.require(skill_id)?;
        if skill.is_passive() {
            return Err(ValidationError::PassiveSkill(skill_id.clone()).into());
        }

        let remaining = caster.cooldown(skill_id);
        if remaining > 0 {
            return Err(ValidationError::SkillOnCooldown {
                skill: skill_id.clone(),
                remaining,
            }
            .into());
        }

        check_cost(caster, &skill.cost)?;

        if let Some(availability) = &skill.availability {
            // No random roll here: validation must not advance the RNG
            let facts = facts_for(caster, target, None, None);
            if !availability.evaluate(&facts) {
                return Err(ValidationError::SkillUnavailable(skill_id.clone()).into());
            }
        }

        Ok(skill)
    }

    /// Usable active skills a unit knows, best first
    ///
    /// Ready skills come before ones on cooldown; within each group higher
    /// priority wins and the unit's own skill order breaks ties.
    pub fn ranked_active_skills(&self, unit: &CombatUnit) -> Vec<SkillId> {
        let mut ranked: Vec<(usize, &Skill)> = unit
            .skills
            .iter()
            .enumerate()
            .filter_map(|(i, id)| self.catalog.get(id).map(|s| (i, s)))
            .filter(|(_, s)| s.is_active())
            .collect();
        ranked.sort_by_key(|(i, s)| (unit.cooldown(&s.id) > 0, std::cmp::Reverse(s.priority), *i));
        ranked.into_iter().map(|(_, s)| s.id.clone()).collect()
    }

    /// Highest-priority ready active skill, else the first active skill
    pub fn default_skill(&self, unit: &CombatUnit) -> Option<SkillId> {
        let ready = unit
            .skills
            .iter()
            .filter_map(|id| self.catalog.get(id))
            .filter(|s| s.is_active() && unit.cooldown(&s.id) == 0)
            .fold(None::<&Skill>, |best, s| match best {
                Some(b) if b.priority >= s.priority => Some(b),
                _ => Some(s),
            });

        ready
            .or_else(|| {
                unit.skills
                    .iter()
                    .filter_map(|id| self.catalog.get(id))
                    .find(|s| s.is_active())
            })
            .map(|s| s.id.clone())
    }

    /// Resolve a validated active skill
    ///
    /// Pays the cost, starts the cooldown and lands every effect. Unit ids
    /// must exist; call [`SkillResolver::validate_use`] first.
    pub fn execute(
        &mut self,
        roster: &mut Roster,
        caster: UnitId,
        skill_id: &SkillId,
        target: Option<UnitId>,
    ) -> Result<SkillResolution, EngineError> {
        let Self {
            catalog,
            config,
            rng,
        } = self;
        let skill = catalog.require(skill_id)?;
        if let Some(target) = target {
            roster.get(target)?;
        }

        {
            let unit = roster.get_mut(caster)?;
            unit.mp.apply_delta(-skill.cost.mp);
            unit.hp.apply_delta(-skill.cost.hp);
            unit.stamina.apply_delta(-skill.cost.stamina);
            unit.set_cooldown(skill_id, skill.cooldown);
        }

        let (reports, mut defeated) = land_effects(config, rng, roster, &skill.effects, caster, target)?;
        // Paying hp can be fatal
        if roster.get_mut(caster)?.check_defeat() && !defeated.contains(&caster) {
            defeated.push(caster);
        }

        debug!(%caster, skill = %skill_id, reports = reports.len(), "skill resolved");
        Ok(SkillResolution {
            caster,
            skill: skill_id.clone(),
            target,
            reports,
            defeated,
        })
    }

    /// Fire every passive of `unit` that listens to `event`
    ///
    /// `other` is the counterpart of the event (the attacker for `on_hit`,
    /// the target for `on_attack`, the victim for `on_kill`). Passives on
    /// cooldown are skipped; the ones that fire start their cooldown.
    pub fn fire_passives(
        &mut self,
        roster: &mut Roster,
        unit: UnitId,
        event: TriggerEvent,
        other: Option<UnitId>,
    ) -> Result<Vec<PassiveFiring>, EngineError> {
        let subject = roster.get(unit)?;
        if !subject.is_alive() {
            return Ok(Vec::new());
        }
        let counterpart = match other {
            Some(id) => Some(roster.get(id)?),
            None => None,
        };

        let roll: f64 = self.rng.gen();
        let facts = facts_for(subject, counterpart, Some(event), Some(roll));

        let candidates: Vec<SkillId> = subject
            .skills
            .iter()
            .filter(|id| subject.cooldown(id) == 0)
            .filter(|id| {
                self.catalog.get(id).is_some_and(|s| {
                    s.is_passive() && s.triggers.iter().any(|t| t.matches(event, &facts))
                })
            })
            .cloned()
            .collect();

        let mut firings = Vec::new();
        let Self {
            catalog,
            config,
            rng,
        } = self;

        for skill_id in candidates {
            if !roster.get(unit)?.is_alive() {
                break;
            }
            let skill = catalog.require(&skill_id)?;
            roster.get_mut(unit)?.set_cooldown(&skill_id, skill.cooldown);

            let (reports, defeated) = land_effects(config, rng, roster, &skill.effects, unit, other)?;
            debug!(%unit, skill = %skill_id, %event, "passive fired");
            firings.push(PassiveFiring {
                trigger: event,
                resolution: SkillResolution {
                    caster: unit,
                    skill: skill_id,
                    target: other,
                    reports,
                    defeated,
                },
            });
        }

        Ok(firings)
    }
}

/// Build the fact set seen by `subject`'s conditions
pub fn facts_for(
    subject: &CombatUnit,
    other: Option<&CombatUnit>,
    event: Option<TriggerEvent>,
    roll: Option<f64>,
) -> FactSet {
    let mut facts = FactSet::new();
    facts.insert("character_hp_ratio", subject.hp.ratio() as f64);
    facts.insert("character_mp_ratio", subject.mp.ratio() as f64);
    facts.insert("hp", subject.hp.current as f64);
    facts.insert("mp", subject.mp.current as f64);
    facts.insert("stamina", subject.stamina.current as f64);
    facts.insert("shield", subject.shield.current as f64);
    facts.insert("is_stunned", subject.is_stunned());
    for stat in Stat::all() {
        facts.insert(stat.as_str(), subject.stats.get(stat) as f64);
    }

    if let Some(event) = event {
        facts.insert("event_type", event.as_str());
    }
    if let Some(roll) = roll {
        facts.insert("random_probability", roll);
    }
    if let Some(other) = other {
        let distance = subject.coord.distance(&other.coord);
        facts.insert("target_hp_ratio", other.hp.ratio() as f64);
        facts.insert("target_distance", distance as f64);
        facts.insert("is_target_adjacent", distance == 1);
        facts.insert("is_target_ally", other.owner == subject.owner);
    }
    facts
}

/// Land a list of effects from `caster`, routing each to its recipients
fn land_effects(
    config: &CombatConfig,
    rng: &mut ChaCha8Rng,
    roster: &mut Roster,
    effects: &[Effect],
    caster: UnitId,
    target: Option<UnitId>,
) -> Result<(Vec<EffectReport>, Vec<UnitId>), EngineError> {
    let mut reports = Vec::new();
    let mut defeated = Vec::new();

    for effect in effects {
        let caster_unit = roster.get(caster)?;
        if !caster_unit.is_alive() {
            break;
        }
        // Re-read every time so earlier self-buffs count
        let source = EffectSource::of(caster_unit);

        let primary = match effect.recipient() {
            EffectTarget::Caster => caster,
            EffectTarget::Target => target.unwrap_or(caster),
        };

        for recipient_id in recipients(roster, primary, effect.area_radius)? {
            let recipient = roster.get_mut(recipient_id)?;
            if !recipient.is_alive() {
                continue;
            }
            reports.push(apply_effect(config, rng, effect, &source, recipient));
            if recipient.check_defeat() {
                debug!(unit = %recipient_id, "unit defeated");
                defeated.push(recipient_id);
            }
        }
    }

    Ok((reports, defeated))
}

/// The primary recipient, then its living allies inside the area radius in id order
fn recipients(
    roster: &Roster,
    primary: UnitId,
    area_radius: Option<u32>,
) -> Result<Vec<UnitId>, NotFoundError> {
    let center = roster.get(primary)?;
    let mut ids = vec![primary];
    if let Some(radius) = area_radius {
        ids.extend(
            roster
                .allies_of(center.owner)
                .filter(|u| u.id != primary && center.coord.distance(&u.coord) <= radius)
                .map(|u| u.id),
        );
    }
    Ok(ids)
}
