//! Turn cycle controller: the single mutation entry point of a match
//!
//! Per turn: Pending → ActiveMove → ActiveAction → Done. At most one turn is
//! current at a time. Every public operation validates completely before it
//! mutates, so a rejected action leaves the match untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::battle::battle_map::{HexGrid, MapModel};
use crate::battle::events::{CombatEvent, CombatEventKind, EffectReport, EventLog};
use crate::battle::hex::HexCoord;
use crate::battle::pathfinding::{flight_path, try_find_path};
use crate::battle::range::{
    attackable_nodes, effective_reach, movement_nodes, AttackableNode, WalkableNode,
};
use crate::battle::turns::{CombatRound, CombatTurn, TurnStatus};
use crate::battle::units::{CombatUnit, Roster};
use crate::core::config::CombatConfig;
use crate::core::error::{NotFoundError, Result, ValidationError};
use crate::core::types::{MatchId, OwnerId, RoundNo, SkillId, UnitId};
use crate::effects::engine::tick_effects;
use crate::skills::catalog::SkillCatalog;
use crate::skills::resolver::{SkillResolution, SkillResolver};
use crate::skills::triggers::TriggerEvent;

/// What the active unit may do right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalActions {
    pub unit_id: UnitId,
    pub phase: TurnStatus,
    pub walkable: Vec<WalkableNode>,
    pub attackable: Vec<AttackableNode>,
    pub selected_skill: Option<SkillId>,
}

impl LegalActions {
    fn empty(unit_id: UnitId, phase: TurnStatus, selected_skill: Option<SkillId>) -> Self {
        Self {
            unit_id,
            phase,
            walkable: Vec::new(),
            attackable: Vec::new(),
            selected_skill,
        }
    }

    pub fn can_attack(&self, target: UnitId) -> bool {
        self.attackable.iter().any(|n| n.unit_id == target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Ongoing,
    Victory(OwnerId),
    Draw,
}

/// One match: grid, units, rounds and the skill resolver
pub struct CombatMatch {
    id: MatchId,
    grid: HexGrid,
    roster: Roster,
    resolver: SkillResolver,
    round: Option<CombatRound>,
    /// Index of the current turn in the round, until `end_turn`
    current: Option<usize>,
    /// Round-end processing already ran for the installed round
    round_closed: bool,
    events: EventLog,
}

impl CombatMatch {
    /// Set up a match from a map model, a roster, a skill catalog and a config
    pub fn new(
        map: &MapModel,
        units: Vec<CombatUnit>,
        catalog: SkillCatalog,
        config: CombatConfig,
    ) -> Result<Self> {
        config.validate().map_err(ValidationError::InvalidSetup)?;
        let grid = HexGrid::from_model(map)?;

        for unit in &units {
            if !grid.in_bounds(unit.coord) {
                return Err(NotFoundError::Coordinate(unit.coord).into());
            }
            if unit.is_alive() && !grid.is_walkable(unit.coord) {
                return Err(ValidationError::InvalidSetup(format!(
                    "{} stands on unwalkable cell {}",
                    unit.id, unit.coord
                ))
                .into());
            }
            for skill in &unit.skills {
                catalog.require(skill)?;
            }
        }

        let roster = Roster::new(units)?;
        let id = MatchId::new();
        info!(
            match_id = ?id.0,
            rows = grid.rows(),
            cols = grid.cols(),
            units = roster.len(),
            "match created"
        );

        Ok(Self {
            id,
            grid,
            roster,
            resolver: SkillResolver::new(catalog, config),
            round: None,
            current: None,
            round_closed: false,
            events: EventLog::new(),
        })
    }

    // === READ ACCESS ===

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn grid(&self) -> &HexGrid {
        &self.grid
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn unit(&self, id: UnitId) -> Result<&CombatUnit> {
        Ok(self.roster.get(id)?)
    }

    pub fn config(&self) -> &CombatConfig {
        self.resolver.config()
    }

    pub fn catalog(&self) -> &SkillCatalog {
        self.resolver.catalog()
    }

    pub fn round(&self) -> Option<&CombatRound> {
        self.round.as_ref()
    }

    /// Number of the installed round, 0 before the first one
    pub fn round_no(&self) -> RoundNo {
        self.round.as_ref().map(|r| r.no).unwrap_or(0)
    }

    /// The installed round has finished its round-end processing
    pub fn is_round_complete(&self) -> bool {
        self.round.is_none() || self.round_closed
    }

    pub fn current_turn(&self) -> Option<&CombatTurn> {
        let round = self.round.as_ref()?;
        self.current.and_then(|i| round.turns.get(i))
    }

    /// Owner of the current turn
    pub fn active_unit(&self) -> Option<UnitId> {
        self.current_turn().map(|t| t.unit_id)
    }

    pub fn outcome(&self) -> MatchOutcome {
        let owners = self.roster.living_owners();
        let mut iter = owners.iter();
        match (iter.next(), iter.next()) {
            (None, _) => MatchOutcome::Draw,
            (Some(owner), None) => MatchOutcome::Victory(*owner),
            _ => MatchOutcome::Ongoing,
        }
    }

    /// Take every notification produced since the last drain
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        self.events.drain()
    }

    pub fn pending_events(&self) -> &[CombatEvent] {
        self.events.pending()
    }

    // === ROUNDS ===

    /// Install a new round generated by the caller
    ///
    /// The previous round must be complete, the number must increase, and
    /// every turn must be pending and reference a known unit exactly once.
    pub fn start_round(&mut self, round: CombatRound) -> Result<()> {
        if let Some(previous) = &self.round {
            if !self.round_closed {
                return Err(ValidationError::RoundInProgress(previous.no).into());
            }
            if round.no <= previous.no {
                return Err(ValidationError::InvalidRound(format!(
                    "round {} does not follow round {}",
                    round.no, previous.no
                ))
                .into());
            }
        }
        if round.turns.is_empty() {
            return Err(ValidationError::InvalidRound("round has no turns".into()).into());
        }

        let mut seen = BTreeSet::new();
        for turn in &round.turns {
            self.roster.get(turn.unit_id)?;
            if turn.status != TurnStatus::Pending {
                return Err(ValidationError::InvalidRound(format!(
                    "turn of {} is not pending",
                    turn.unit_id
                ))
                .into());
            }
            if !seen.insert(turn.unit_id) {
                return Err(ValidationError::InvalidRound(format!(
                    "{} has more than one turn",
                    turn.unit_id
                ))
                .into());
            }
        }

        let order: Vec<UnitId> = round.turns.iter().map(|t| t.unit_id).collect();
        info!(round = round.no, turns = order.len(), "round started");
        self.round = Some(round);
        self.current = None;
        self.round_closed = false;

        self.log(CombatEventKind::RoundStart {
            order: order.clone(),
        });
        for unit in order {
            self.fire_passives(unit, TriggerEvent::RoundStart, None)?;
        }

        self.settle_round()?;
        Ok(())
    }

    // === TURNS ===

    /// Make `unit` the turn owner; it must hold the first pending turn
    ///
    /// Pending turns of defeated units ahead of it are skipped.
    pub fn activate_turn(&mut self, unit: UnitId) -> Result<LegalActions> {
        let round = self.round.as_ref().ok_or(ValidationError::NoRound)?;
        if self.round_closed {
            return Err(ValidationError::NoRound.into());
        }
        if let Some(owner) = self.active_unit() {
            return Err(ValidationError::TurnAlreadyActive(owner).into());
        }

        let expected = self.next_pending_index();
        let index = match expected {
            Some(i) if round.turns[i].unit_id == unit => i,
            _ => {
                return Err(ValidationError::OutOfTurnOrder {
                    unit,
                    expected: expected.map(|i| round.turns[i].unit_id),
                }
                .into())
            }
        };
        let default_skill = self.resolver.default_skill(self.roster.get(unit)?);

        if let Some(round) = self.round.as_mut() {
            for turn in round.turns.iter_mut().take(index) {
                if turn.status == TurnStatus::Pending {
                    turn.status = TurnStatus::Done;
                }
            }
            let turn = &mut round.turns[index];
            turn.status = TurnStatus::ActiveMove;
            turn.skill_selection = default_skill;
        }
        self.current = Some(index);

        debug!(%unit, round = self.round_no(), "turn activated");
        self.fire_passives(unit, TriggerEvent::TurnStart, None)?;
        self.log(CombatEventKind::TurnStart { unit });

        self.compute_legal_actions(index)
    }

    /// Recompute the legal actions of the current turn owner
    pub fn legal_actions(&self, unit: UnitId) -> Result<LegalActions> {
        let index = self.owned_turn(unit)?;
        self.compute_legal_actions(index)
    }

    /// Change the selected skill of the current turn
    pub fn select_skill(&mut self, unit: UnitId, skill: SkillId) -> Result<LegalActions> {
        let index = self.owned_turn(unit)?;
        let status = self.turn_status(index);
        if !status.is_active() {
            return Err(ValidationError::WrongPhase {
                expected: TurnStatus::ActiveAction,
                actual: status,
            }
            .into());
        }

        let caster = self.roster.get(unit)?;
        if !caster.knows_skill(&skill) {
            return Err(ValidationError::SkillNotKnown(unit, skill).into());
        }
        let definition = self.resolver.skill(&skill)?;
        if definition.is_passive() {
            return Err(ValidationError::PassiveSkill(skill).into());
        }
        let remaining = caster.cooldown(&skill);
        if remaining > 0 {
            return Err(ValidationError::SkillOnCooldown { skill, remaining }.into());
        }

        if let Some(turn) = self.turn_mut(index) {
            turn.skill_selection = Some(skill);
        }
        self.compute_legal_actions(index)
    }

    /// Move along an explicit path; the unit ends on the last cell
    pub fn apply_move(&mut self, unit: UnitId, path: &[HexCoord]) -> Result<Vec<HexCoord>> {
        let index = self.owned_turn(unit)?;
        self.expect_phase(index, TurnStatus::ActiveMove)?;

        let mover = self.roster.get(unit)?;
        if mover.is_stunned() {
            return Err(ValidationError::UnitStunned(unit).into());
        }
        if path.len() < 2 {
            return Err(ValidationError::InvalidPath("a move needs at least two cells".into()).into());
        }
        if path[0] != mover.coord {
            return Err(ValidationError::InvalidPath(format!(
                "path starts at {}, unit is at {}",
                path[0], mover.coord
            ))
            .into());
        }
        let steps = (path.len() - 1) as u32;
        if steps > mover.move_range {
            return Err(ValidationError::InvalidPath(format!(
                "{} steps exceed move range {}",
                steps, mover.move_range
            ))
            .into());
        }

        // Flyers skip terrain and pass over units, but must land on a free cell
        let flying = mover.can_ignore_obstacles;
        let destination = path[path.len() - 1];
        let occupancy = self.roster.occupancy(Some(unit));
        for pair in path.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            if !self.grid.in_bounds(to) {
                return Err(NotFoundError::Coordinate(to).into());
            }
            if !from.is_adjacent(&to) {
                return Err(ValidationError::InvalidPath(format!(
                    "{} is not adjacent to {}",
                    from, to
                ))
                .into());
            }
            if !flying && !self.grid.is_walkable(to) {
                return Err(ValidationError::InvalidPath(format!("{} is not walkable", to)).into());
            }
            if (!flying || to == destination) && occupancy.is_occupied(to) {
                return Err(ValidationError::CellOccupied(to).into());
            }
        }

        self.roster.get_mut(unit)?.coord = destination;
        if let Some(turn) = self.turn_mut(index) {
            turn.status = TurnStatus::ActiveAction;
        }

        debug!(%unit, to = %destination, steps, "unit moved");
        let path = path.to_vec();
        self.log(CombatEventKind::Move {
            unit,
            path: path.clone(),
        });
        Ok(path)
    }

    /// Path to `destination` with A*, then move along it
    pub fn move_to(&mut self, unit: UnitId, destination: HexCoord) -> Result<Vec<HexCoord>> {
        let index = self.owned_turn(unit)?;
        self.expect_phase(index, TurnStatus::ActiveMove)?;

        let mover = self.roster.get(unit)?;
        let start = mover.coord;
        let grid = &self.grid;
        let path = if mover.can_ignore_obstacles {
            flight_path(grid, start, destination)?
        } else {
            let occupancy = self.roster.occupancy(Some(unit));
            try_find_path(grid, start, destination, self.config().heuristic, |c| {
                occupancy.is_open(grid, c)
            })?
        };
        self.apply_move(unit, &path)
    }

    /// Give up movement and go straight to the action phase
    pub fn skip_move(&mut self, unit: UnitId) -> Result<LegalActions> {
        let index = self.owned_turn(unit)?;
        self.expect_phase(index, TurnStatus::ActiveMove)?;

        if let Some(turn) = self.turn_mut(index) {
            turn.status = TurnStatus::ActiveAction;
        }
        debug!(%unit, "movement skipped");
        self.compute_legal_actions(index)
    }

    /// Attack `target` with the selected skill (or the default one)
    pub fn apply_attack(&mut self, unit: UnitId, target: UnitId) -> Result<SkillResolution> {
        let index = self.owned_turn(unit)?;
        let skill = match self.current_turn().and_then(|t| t.skill_selection.clone()) {
            Some(skill) => skill,
            None => self
                .resolver
                .default_skill(self.roster.get(unit)?)
                .ok_or(ValidationError::NoSkill(unit))?,
        };
        self.resolve_skill(index, unit, skill, Some(target), true)
    }

    /// Use a specific active skill, with or without a target
    pub fn apply_skill(
        &mut self,
        unit: UnitId,
        skill: SkillId,
        target: Option<UnitId>,
    ) -> Result<SkillResolution> {
        let index = self.owned_turn(unit)?;
        self.resolve_skill(index, unit, skill, target, false)
    }

    /// Close the current turn; cooldowns of its owner tick down by one
    pub fn end_turn(&mut self, unit: UnitId) -> Result<()> {
        let index = self.owned_turn(unit)?;

        if let Some(turn) = self.turn_mut(index) {
            turn.status = TurnStatus::Done;
        }
        self.roster.get_mut(unit)?.decay_cooldowns();
        self.current = None;

        debug!(%unit, "turn ended");
        self.log(CombatEventKind::TurnEnd { unit });
        self.settle_round()
    }

    /// End the current turn (if any) and activate the next living unit
    ///
    /// Returns `None` once the round has completed.
    pub fn advance_turn(&mut self) -> Result<Option<LegalActions>> {
        if self.round.is_none() {
            return Err(ValidationError::NoRound.into());
        }
        if let Some(owner) = self.active_unit() {
            self.end_turn(owner)?;
        }
        if self.round_closed {
            return Ok(None);
        }

        let next = self
            .next_pending_index()
            .and_then(|i| self.round.as_ref().map(|r| r.turns[i].unit_id));
        match next {
            Some(unit) => self.activate_turn(unit).map(Some),
            None => Ok(None),
        }
    }

    // === INTERNALS ===

    fn resolve_skill(
        &mut self,
        index: usize,
        unit: UnitId,
        skill: SkillId,
        target: Option<UnitId>,
        as_attack: bool,
    ) -> Result<SkillResolution> {
        self.expect_phase(index, TurnStatus::ActiveAction)?;

        let caster = self.roster.get(unit)?;
        let target_unit = match target {
            Some(id) => Some(self.roster.get(id)?),
            None => None,
        };
        let definition = self.resolver.validate_use(caster, &skill, target_unit)?;
        let offensive = definition.is_offensive();
        let counters = definition.can_trigger_counter;

        // Harmful skills need an enemy in reach; the rest take any living unit or none
        match (offensive, target_unit) {
            (true, None) => return Err(ValidationError::MissingTarget(skill).into()),
            (true, Some(victim)) => {
                if !victim.is_alive() || victim.owner == caster.owner {
                    return Err(ValidationError::InvalidTarget(victim.id).into());
                }
                let reach = effective_reach(caster, Some(&definition.range));
                let occupancy = self.roster.occupancy(Some(unit));
                let in_range = attackable_nodes(
                    &self.grid,
                    &occupancy,
                    caster,
                    [victim],
                    reach,
                    0,
                    self.config().heuristic,
                );
                if in_range.is_empty() {
                    return Err(ValidationError::TargetOutOfRange { target: victim.id }.into());
                }
            }
            (false, Some(other)) if !other.is_alive() => {
                return Err(ValidationError::InvalidTarget(other.id).into());
            }
            (false, _) => {}
        }

        // Validation is over; from here on the action happens
        let resolution = self
            .resolver
            .execute(&mut self.roster, unit, &skill, target)?;
        if let Some(turn) = self.turn_mut(index) {
            turn.status = TurnStatus::Done;
            turn.skill_selection = Some(skill.clone());
        }

        debug!(
            %unit,
            skill = %skill,
            target = ?target,
            defeated = resolution.defeated.len(),
            "skill applied"
        );
        let kind = match (as_attack, target) {
            (true, Some(target)) => CombatEventKind::Attack {
                unit,
                target,
                skill,
                reports: resolution.reports.clone(),
                defeated: resolution.defeated.clone(),
            },
            _ => CombatEventKind::Skill {
                unit,
                target,
                skill,
                reports: resolution.reports.clone(),
                defeated: resolution.defeated.clone(),
            },
        };
        self.log(kind);

        if let Some(target) = target.filter(|t| *t != unit) {
            self.fire_passives(unit, TriggerEvent::OnAttack, Some(target))?;
            if counters {
                self.fire_passives(target, TriggerEvent::OnHit, Some(unit))?;
            }
        }
        for victim in resolution.defeated.iter().filter(|v| **v != unit) {
            self.fire_passives(unit, TriggerEvent::OnKill, Some(*victim))?;
        }

        Ok(resolution)
    }

    /// Close the round once no living unit has a pending turn
    fn settle_round(&mut self) -> Result<()> {
        if self.round_closed || self.current.is_some() || self.next_pending_index().is_some() {
            return Ok(());
        }

        let Some(round) = self.round.as_mut() else {
            return Ok(());
        };
        for turn in &mut round.turns {
            turn.status = TurnStatus::Done;
        }
        let order: Vec<UnitId> = round.turns.iter().map(|t| t.unit_id).collect();
        self.round_closed = true;

        let mut ticks: Vec<EffectReport> = Vec::new();
        let mut defeated = Vec::new();
        for unit in self.roster.iter_mut().filter(|u| u.is_alive()) {
            ticks.extend(tick_effects(unit));
            if unit.check_defeat() {
                debug!(unit = %unit.id, "unit defeated by effects");
                defeated.push(unit.id);
            }
        }

        for unit in order {
            self.fire_passives(unit, TriggerEvent::RoundEnd, None)?;
        }

        info!(round = self.round_no(), ticks = ticks.len(), outcome = ?self.outcome(), "round ended");
        self.log(CombatEventKind::RoundEnd { ticks, defeated });
        Ok(())
    }

    fn fire_passives(
        &mut self,
        unit: UnitId,
        event: TriggerEvent,
        other: Option<UnitId>,
    ) -> Result<()> {
        let firings = self
            .resolver
            .fire_passives(&mut self.roster, unit, event, other)?;
        for firing in firings {
            let resolution = firing.resolution;
            self.log(CombatEventKind::Passive {
                unit,
                skill: resolution.skill,
                trigger: firing.trigger,
                reports: resolution.reports,
                defeated: resolution.defeated,
            });
        }
        Ok(())
    }

    fn compute_legal_actions(&self, index: usize) -> Result<LegalActions> {
        let turn = self
            .round
            .as_ref()
            .and_then(|r| r.turns.get(index))
            .ok_or(ValidationError::NoActiveTurn)?;
        let unit = self.roster.get(turn.unit_id)?;
        let selected = turn.skill_selection.clone();

        if !unit.is_alive() || unit.is_stunned() || !turn.status.is_active() {
            return Ok(LegalActions::empty(unit.id, turn.status, selected));
        }

        let occupancy = self.roster.occupancy(Some(unit.id));
        let (walkable, budget) = match turn.status {
            TurnStatus::ActiveMove => (
                movement_nodes(&self.grid, &occupancy, unit),
                unit.move_range,
            ),
            _ => (Vec::new(), 0),
        };

        let attackable = match selected.as_ref().and_then(|id| self.catalog().get(id)) {
            Some(skill) if skill.is_offensive() => attackable_nodes(
                &self.grid,
                &occupancy,
                unit,
                self.roster.enemies_of(unit.owner),
                effective_reach(unit, Some(&skill.range)),
                budget,
                self.config().heuristic,
            ),
            _ => Vec::new(),
        };

        Ok(LegalActions {
            unit_id: unit.id,
            phase: turn.status,
            walkable,
            attackable,
            selected_skill: selected,
        })
    }

    /// Index of the current turn if `unit` owns it
    fn owned_turn(&self, unit: UnitId) -> Result<usize> {
        if self.round.is_none() {
            return Err(ValidationError::NoRound.into());
        }
        match (self.current, self.active_unit()) {
            (Some(index), Some(owner)) if owner == unit => Ok(index),
            (_, active) => Err(ValidationError::NotTurnOwner { unit, active }.into()),
        }
    }

    fn expect_phase(&self, index: usize, expected: TurnStatus) -> Result<()> {
        let actual = self.turn_status(index);
        if actual != expected {
            return Err(ValidationError::WrongPhase { expected, actual }.into());
        }
        Ok(())
    }

    fn turn_status(&self, index: usize) -> TurnStatus {
        self.round
            .as_ref()
            .and_then(|r| r.turns.get(index))
            .map(|t| t.status)
            .unwrap_or(TurnStatus::Done)
    }

    fn turn_mut(&mut self, index: usize) -> Option<&mut CombatTurn> {
        self.round.as_mut().and_then(|r| r.turns.get_mut(index))
    }

    /// First pending turn whose unit is still alive
    fn next_pending_index(&self) -> Option<usize> {
        let round = self.round.as_ref()?;
        round.turns.iter().position(|t| {
            t.status == TurnStatus::Pending
                && self.roster.get(t.unit_id).map(|u| u.is_alive()).unwrap_or(false)
        })
    }

    fn log(&mut self, kind: CombatEventKind) {
        let round = self.round_no();
        self.events.push(round, kind);
    }
}
