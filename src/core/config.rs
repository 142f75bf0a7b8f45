//! Combat configuration with documented constants
//!
//! All tuning numbers used by the damage formula, duration scaling and
//! pathfinding live here. Each match owns its own copy; there is no global.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::battle::pathfinding::Heuristic;
use crate::core::error::LoadError;

/// Configuration for one match instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    // === RANDOMNESS ===
    /// Seed for the match RNG (crit rolls, `random_probability` facts)
    ///
    /// Two matches with the same seed and the same action sequence produce
    /// identical results, which is what replay logs rely on.
    pub seed: u64,

    // === PATHFINDING ===
    /// A* heuristic
    pub heuristic: Heuristic,

    // === DAMAGE ===
    /// Attack scaling per attack point: `1 + attack * attack_coefficient`
    pub attack_coefficient: f32,

    /// Defense constant in `defense / (defense + defense_constant)`
    ///
    /// At 100, a defense of 100 halves incoming damage.
    pub defense_constant: f32,

    /// Damage multiplier on a critical hit
    pub crit_multiplier: f32,

    // === ATTRIBUTE BONUSES ===
    /// Linear intelligence bonus per point (magical damage, heals, shields)
    pub intelligence_linear: f32,

    /// Extra intelligence bonus granted per full `intelligence_step` points
    pub intelligence_step_bonus: f32,

    /// Intelligence points per step bonus
    pub intelligence_step: f32,

    /// Linear defense bonus per point (shield strength)
    pub defense_linear: f32,

    /// Extra defense bonus granted per full `defense_step` points
    pub defense_step_bonus: f32,

    /// Defense points per step bonus
    pub defense_step: f32,

    // === DURATIONS ===
    /// Buff/Hot duration extension per caster intelligence point
    ///
    /// At 0.005, a caster with 100 intelligence extends a 2-round buff to 3.
    pub duration_bonus_per_int: f32,

    /// Debuff/Dot duration reduction per target status-resistance point
    pub duration_reduction_per_resistance: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            heuristic: Heuristic::default(),

            attack_coefficient: 0.01,
            defense_constant: 100.0,
            crit_multiplier: 1.5,

            intelligence_linear: 0.005,
            intelligence_step_bonus: 0.01,
            intelligence_step: 10.0,
            defense_linear: 0.003,
            defense_step_bonus: 0.005,
            defense_step: 15.0,

            duration_bonus_per_int: 0.005,
            duration_reduction_per_resistance: 0.01,
        }
    }
}

impl CombatConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Same defaults with a different RNG seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        let config: CombatConfig = toml::from_str(content)?;
        config.validate().map_err(LoadError::InvalidConfig)?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.defense_constant <= 0.0 {
            return Err(format!(
                "defense_constant ({}) must be positive",
                self.defense_constant
            ));
        }

        if self.crit_multiplier < 1.0 {
            return Err(format!(
                "crit_multiplier ({}) should be >= 1.0",
                self.crit_multiplier
            ));
        }

        if self.intelligence_step <= 0.0 || self.defense_step <= 0.0 {
            return Err("attribute steps must be positive".into());
        }

        if self.attack_coefficient < 0.0
            || self.duration_bonus_per_int < 0.0
            || self.duration_reduction_per_resistance < 0.0
        {
            return Err("scaling coefficients must not be negative".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CombatConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CombatConfig::from_toml_str("seed = 7\ncrit_multiplier = 2.0\n").unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.crit_multiplier, 2.0);
        assert_eq!(config.defense_constant, 100.0);
        assert_eq!(config.heuristic, Heuristic::HexDistance);
    }

    #[test]
    fn test_heuristic_from_toml() {
        let config = CombatConfig::from_toml_str("heuristic = \"offset_estimate\"\n").unwrap();
        assert_eq!(config.heuristic, Heuristic::OffsetEstimate);
    }

    #[test]
    fn test_invalid_toml_config_rejected() {
        let result = CombatConfig::from_toml_str("defense_constant = 0.0\n");
        assert!(matches!(result, Err(LoadError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = CombatConfig::from_toml_str("seed = \"abc\"");
        assert!(matches!(result, Err(LoadError::TomlError(_))));
    }
}
