//! Battle configuration (what is fought) and engine tuning (how it is fought).

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, BattleResult};
use crate::unit::{DEFAULT_HP, UnitSpec};

/// The rosters of one encounter, as produced by the game layer.
///
/// Unknown JSON fields (such as `"type": "battle"`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Optional name of the encounter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Units on the player's side, in roster order.
    #[serde(default)]
    pub allies: Vec<UnitSpec>,
    /// Units on the opposing side, in roster order.
    #[serde(default)]
    pub enemies: Vec<UnitSpec>,
}

impl BattleConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the encounter title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Append an allied unit.
    pub fn with_ally(mut self, spec: UnitSpec) -> Self {
        self.allies.push(spec);
        self
    }

    /// Append an enemy unit.
    pub fn with_enemy(mut self, spec: UnitSpec) -> Self {
        self.enemies.push(spec);
        self
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> BattleResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check that the configuration can start a battle.
    ///
    /// Both rosters must be non-empty and every unit must field at least one
    /// soldier.
    pub fn validate(&self) -> BattleResult<()> {
        if self.allies.is_empty() {
            return Err(BattleError::InvalidConfiguration(
                "no allied units".to_string(),
            ));
        }
        if self.enemies.is_empty() {
            return Err(BattleError::InvalidConfiguration(
                "no enemy units".to_string(),
            ));
        }
        if let Some(empty) = self
            .allies
            .iter()
            .chain(&self.enemies)
            .find(|s| s.unit.current_count == 0)
        {
            return Err(BattleError::InvalidConfiguration(format!(
                "unit '{}' has no troops",
                empty.name
            )));
        }
        Ok(())
    }
}

/// Tuning knobs for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// RNG seed for reproducible damage rolls.
    pub seed: u64,
    /// Damage variance in percent of the base damage (0-100).
    pub variance_percent: u32,
    /// Defense bonus in percent granted by the defend action.
    pub defend_bonus_percent: u32,
    /// Hit points per soldier for units that leave `hp` unset.
    pub default_hp: u32,
    /// Round cap for automatic runs.
    pub max_rounds: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            variance_percent: 10,
            defend_bonus_percent: 50,
            default_hp: DEFAULT_HP,
            max_rounds: 100,
        }
    }
}

impl EngineConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the damage variance (clamped to 0-100 percent).
    pub fn with_variance_percent(mut self, percent: u32) -> Self {
        self.variance_percent = percent.min(100);
        self
    }

    /// Set the defend bonus in percent.
    pub fn with_defend_bonus_percent(mut self, percent: u32) -> Self {
        self.defend_bonus_percent = percent;
        self
    }

    /// Set the fallback hit points per soldier (at least 1).
    pub fn with_default_hp(mut self, hp: u32) -> Self {
        self.default_hp = hp.max(1);
        self
    }

    /// Set the round cap for automatic runs (at least 1).
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }
}
