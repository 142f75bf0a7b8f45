//! Combat units and the per-match roster that owns them
//!
//! Units are addressed by `UnitId` everywhere; nothing holds a reference to
//! another unit. Defeated units stay in the roster as records but leave the
//! occupancy overlay.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::battle::hex::HexCoord;
use crate::battle::range::Occupancy;
use crate::core::error::{NotFoundError, ValidationError};
use crate::core::types::{EffectId, OwnerId, SkillId, UnitId};
use crate::effects::effect::{ActiveEffect, Stat};

/// A bounded resource such as hp or mp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub current: i32,
    pub max: i32,
}

impl Pool {
    /// A full pool
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn empty(max: i32) -> Self {
        Self { current: 0, max }
    }

    /// Apply a signed delta, clamped to `[0, max]`; returns the delta actually applied
    pub fn apply_delta(&mut self, delta: i32) -> i32 {
        let before = self.current;
        self.current = (self.current + delta).clamp(0, self.max.max(0));
        self.current - before
    }

    /// current / max, 0 for an empty maximum
    pub fn ratio(&self) -> f32 {
        if self.max <= 0 {
            0.0
        } else {
            self.current as f32 / self.max as f32
        }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Combat attributes touched by the damage formula and by buffs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub attack: f32,
    pub defense: f32,
    pub intelligence: f32,
    /// Percent chance of a critical hit
    pub crit_rate: f32,
    /// Percent reduction of harmful effect durations
    pub status_resistance: f32,
}

impl Stats {
    pub fn get(&self, stat: Stat) -> f32 {
        match stat {
            Stat::Attack => self.attack,
            Stat::Defense => self.defense,
            Stat::Intelligence => self.intelligence,
            Stat::CritRate => self.crit_rate,
            Stat::StatusResistance => self.status_resistance,
        }
    }

    pub fn get_mut(&mut self, stat: Stat) -> &mut f32 {
        match stat {
            Stat::Attack => &mut self.attack,
            Stat::Defense => &mut self.defense,
            Stat::Intelligence => &mut self.intelligence,
            Stat::CritRate => &mut self.crit_rate,
            Stat::StatusResistance => &mut self.status_resistance,
        }
    }
}

/// Basic attack reach in hexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRange {
    pub min: u32,
    pub max: u32,
}

impl Default for AttackRange {
    fn default() -> Self {
        Self { min: 1, max: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Normal,
    Stunned,
}

/// A single unit taking part in a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatUnit {
    pub id: UnitId,
    pub owner: OwnerId,
    #[serde(default)]
    pub name: String,
    pub coord: HexCoord,
    pub hp: Pool,
    #[serde(default)]
    pub mp: Pool,
    #[serde(default)]
    pub stamina: Pool,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub shield: Pool,
    pub move_range: u32,
    /// Flies over terrain; still never ends a move on another unit
    #[serde(default)]
    pub can_ignore_obstacles: bool,
    #[serde(default)]
    pub attack_range: AttackRange,
    #[serde(default)]
    pub skills: Vec<SkillId>,
    #[serde(default)]
    pub cooldowns: BTreeMap<SkillId, u32>,
    #[serde(default)]
    pub active_effects: Vec<ActiveEffect>,
    #[serde(default)]
    pub status: UnitStatus,
    #[serde(default)]
    pub defeated: bool,
}

impl CombatUnit {
    /// Create a unit with 100 hp, 50 mp, 100 stamina, move range 3 and melee reach
    pub fn new(id: UnitId, owner: OwnerId, coord: HexCoord) -> Self {
        Self {
            id,
            owner,
            name: String::new(),
            coord,
            hp: Pool::new(100),
            mp: Pool::new(50),
            stamina: Pool::new(100),
            stats: Stats::default(),
            shield: Pool::empty(0),
            move_range: 3,
            can_ignore_obstacles: false,
            attack_range: AttackRange::default(),
            skills: Vec::new(),
            cooldowns: BTreeMap::new(),
            active_effects: Vec::new(),
            status: UnitStatus::Normal,
            defeated: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_hp(mut self, max: i32) -> Self {
        self.hp = Pool::new(max);
        self
    }

    pub fn with_mp(mut self, max: i32) -> Self {
        self.mp = Pool::new(max);
        self
    }

    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_move_range(mut self, move_range: u32) -> Self {
        self.move_range = move_range;
        self
    }

    pub fn with_flight(mut self) -> Self {
        self.can_ignore_obstacles = true;
        self
    }

    pub fn with_attack_range(mut self, min: u32, max: u32) -> Self {
        self.attack_range = AttackRange { min, max };
        self
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SkillId>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_alive(&self) -> bool {
        !self.defeated
    }

    pub fn is_stunned(&self) -> bool {
        self.status == UnitStatus::Stunned
    }

    pub fn knows_skill(&self, skill: &SkillId) -> bool {
        self.skills.contains(skill)
    }

    /// Remaining cooldown, 0 when ready
    pub fn cooldown(&self, skill: &SkillId) -> u32 {
        self.cooldowns.get(skill).copied().unwrap_or(0)
    }

    pub fn set_cooldown(&mut self, skill: &SkillId, turns: u32) {
        if turns == 0 {
            self.cooldowns.remove(skill);
        } else {
            self.cooldowns.insert(skill.clone(), turns);
        }
    }

    /// Decrement every running cooldown by one, dropping the ones that reach 0
    pub fn decay_cooldowns(&mut self) {
        for remaining in self.cooldowns.values_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        self.cooldowns.retain(|_, remaining| *remaining > 0);
    }

    pub fn has_effect(&self, id: &EffectId) -> bool {
        self.active_effects.iter().any(|e| &e.id == id)
    }

    /// Mark as defeated once hp has run out; returns true on the transition
    pub fn check_defeat(&mut self) -> bool {
        if self.defeated || self.hp.current > 0 {
            return false;
        }
        self.defeated = true;
        self.active_effects.clear();
        self.status = UnitStatus::Normal;
        self.shield.current = 0;
        true
    }
}

/// All units of one match, keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    units: BTreeMap<UnitId, CombatUnit>,
}

impl Roster {
    /// Build a roster, rejecting duplicate ids and stacked living units
    pub fn new(units: Vec<CombatUnit>) -> Result<Self, ValidationError> {
        let mut roster = BTreeMap::new();
        let mut taken = BTreeSet::new();

        for unit in units {
            if unit.is_alive() && !taken.insert(unit.coord) {
                return Err(ValidationError::CellOccupied(unit.coord));
            }
            let id = unit.id;
            if roster.insert(id, unit).is_some() {
                return Err(ValidationError::InvalidSetup(format!(
                    "duplicate unit id {}",
                    id
                )));
            }
        }

        Ok(Self { units: roster })
    }

    pub fn get(&self, id: UnitId) -> Result<&CombatUnit, NotFoundError> {
        self.units.get(&id).ok_or(NotFoundError::Unit(id))
    }

    pub fn get_mut(&mut self, id: UnitId) -> Result<&mut CombatUnit, NotFoundError> {
        self.units.get_mut(&id).ok_or(NotFoundError::Unit(id))
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All units in id order, defeated ones included
    pub fn iter(&self) -> impl Iterator<Item = &CombatUnit> {
        self.units.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CombatUnit> {
        self.units.values_mut()
    }

    pub fn ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    pub fn living(&self) -> impl Iterator<Item = &CombatUnit> {
        self.units.values().filter(|u| u.is_alive())
    }

    /// Living units not owned by `owner`
    pub fn enemies_of(&self, owner: OwnerId) -> impl Iterator<Item = &CombatUnit> {
        self.living().filter(move |u| u.owner != owner)
    }

    /// Living units owned by `owner`
    pub fn allies_of(&self, owner: OwnerId) -> impl Iterator<Item = &CombatUnit> {
        self.living().filter(move |u| u.owner == owner)
    }

    /// Living unit standing on `coord`
    pub fn occupant_at(&self, coord: HexCoord) -> Option<UnitId> {
        self.living().find(|u| u.coord == coord).map(|u| u.id)
    }

    /// Cells under living units, except the mover's own cell
    pub fn occupancy(&self, mover: Option<UnitId>) -> Occupancy {
        Occupancy::from_cells(
            self.living()
                .filter(|u| Some(u.id) != mover)
                .map(|u| u.coord),
        )
    }

    /// Owners that still have at least one living unit
    pub fn living_owners(&self) -> BTreeSet<OwnerId> {
        self.living().map(|u| u.owner).collect()
    }
}
