//! Scenario files: a map, a roster and a skill list in one JSON document
//!
//! Unit entries use flat numbers for their pools; anything omitted falls
//! back to the `CombatUnit::new` defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::battle::battle_map::MapModel;
use crate::battle::controller::CombatMatch;
use crate::battle::hex::HexCoord;
use crate::battle::units::{AttackRange, CombatUnit, Stats};
use crate::core::config::CombatConfig;
use crate::core::error::LoadError;
use crate::core::types::{OwnerId, SkillId, UnitId};
use crate::skills::catalog::SkillCatalog;
use crate::skills::definitions::Skill;

/// One unit as written in a scenario file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub id: UnitId,
    pub owner: OwnerId,
    #[serde(default)]
    pub name: String,
    pub coord: HexCoord,
    #[serde(default)]
    pub hp: Option<i32>,
    #[serde(default)]
    pub mp: Option<i32>,
    #[serde(default)]
    pub move_range: Option<u32>,
    #[serde(default)]
    pub can_ignore_obstacles: bool,
    #[serde(default)]
    pub attack_range: Option<AttackRange>,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub skills: Vec<SkillId>,
}

impl UnitSpec {
    pub fn to_unit(&self) -> CombatUnit {
        let mut unit = CombatUnit::new(self.id, self.owner, self.coord)
            .with_name(self.name.clone())
            .with_stats(self.stats)
            .with_skills(self.skills.iter().cloned());
        if let Some(hp) = self.hp {
            unit = unit.with_hp(hp);
        }
        if let Some(mp) = self.mp {
            unit = unit.with_mp(mp);
        }
        if let Some(move_range) = self.move_range {
            unit = unit.with_move_range(move_range);
        }
        if let Some(range) = self.attack_range {
            unit = unit.with_attack_range(range.min, range.max);
        }
        if self.can_ignore_obstacles {
            unit = unit.with_flight();
        }
        unit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub map: MapModel,
    pub units: Vec<UnitSpec>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    /// Overrides the default combat config when present
    #[serde(default)]
    pub config: Option<CombatConfig>,
}

impl Scenario {
    pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
        let scenario: Scenario = serde_json::from_str(content)?;
        if let Some(config) = &scenario.config {
            config.validate().map_err(LoadError::InvalidConfig)?;
        }
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Set up a match; `seed` replaces the scenario's own seed
    pub fn build(&self, seed: Option<u64>) -> Result<CombatMatch, LoadError> {
        let catalog = SkillCatalog::from_skills(self.skills.clone())?;
        let mut config = self.config.clone().unwrap_or_default();
        if let Some(seed) = seed {
            config.seed = seed;
        }
        let units = self.units.iter().map(UnitSpec::to_unit).collect();
        Ok(CombatMatch::new(&self.map, units, catalog, config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{EngineError, ValidationError};

    const SCENARIO: &str = r#"{
        "name": "duel",
        "map": {"rows": 7, "cols": 8, "obstacles": [{"x": 3, "y": 3}]},
        "units": [
            {"id": 1, "owner": 1, "coord": {"x": 0, "y": 0}, "hp": 120, "skills": ["slash"]},
            {"id": 2, "owner": 2, "coord": {"x": 7, "y": 6}, "attack_range": {"min": 2, "max": 4},
             "can_ignore_obstacles": true, "skills": ["slash"]}
        ],
        "skills": [
            {"id": "slash", "effects": [{"id": "slash_hit", "type": "damage", "value": 20}]}
        ],
        "config": {"seed": 7}
    }"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_json_str(SCENARIO).unwrap();
        assert_eq!(scenario.name, "duel");
        assert_eq!(scenario.units.len(), 2);
        assert_eq!(scenario.config.as_ref().unwrap().seed, 7);

        let unit = scenario.units[0].to_unit();
        assert_eq!(unit.hp.max, 120);
        assert_eq!(unit.mp.max, 50);
        assert!(!unit.can_ignore_obstacles);

        let flyer = scenario.units[1].to_unit();
        assert_eq!(flyer.attack_range.max, 4);
        assert!(flyer.can_ignore_obstacles);
    }

    #[test]
    fn test_build_match() {
        let scenario = Scenario::from_json_str(SCENARIO).unwrap();
        let game = scenario.build(Some(99)).unwrap();
        assert_eq!(game.config().seed, 99);
        assert_eq!(game.roster().len(), 2);
        assert!(!game.grid().is_walkable(HexCoord::new(3, 3)));
    }

    #[test]
    fn test_unit_on_obstacle_rejected() {
        let mut scenario = Scenario::from_json_str(SCENARIO).unwrap();
        scenario.units[0].coord = HexCoord::new(3, 3);
        let result = scenario.build(None);
        assert!(matches!(
            result,
            Err(LoadError::Engine(EngineError::Validation(
                ValidationError::InvalidSetup(_)
            )))
        ));
    }

    #[test]
    fn test_bad_config_rejected() {
        let json = SCENARIO.replace(r#""seed": 7"#, r#""defense_constant": -1"#);
        assert!(matches!(
            Scenario::from_json_str(&json),
            Err(LoadError::InvalidConfig(_))
        ));
    }
}
