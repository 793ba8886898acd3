//! Troop units: stat blocks, sides and live battle units.

use serde::{Deserialize, Serialize};

/// Hit points per soldier used when a stat block leaves `hp` unset.
pub const DEFAULT_HP: u32 = 15;

/// Which roster a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The player's side.
    Ally,
    /// The opposing side.
    Enemy,
}

impl Side {
    /// The other side.
    pub fn opponent(self) -> Self {
        match self {
            Self::Ally => Self::Enemy,
            Self::Enemy => Self::Ally,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ally => write!(f, "ally"),
            Self::Enemy => write!(f, "enemy"),
        }
    }
}

/// Identifies a unit within one battle: its side and roster position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId {
    /// The roster the unit belongs to.
    pub side: Side,
    /// Position within that roster.
    pub index: usize,
}

impl UnitId {
    /// Id of the allied unit at `index`.
    pub fn ally(index: usize) -> Self {
        Self {
            side: Side::Ally,
            index,
        }
    }

    /// Id of the enemy unit at `index`.
    pub fn enemy(index: usize) -> Self {
        Self {
            side: Side::Enemy,
            index,
        }
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.side, self.index)
    }
}

/// Combat stats of a troop unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitStats {
    /// Troop type name (e.g. "剑士").
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Soldiers still standing.
    pub current_count: u32,
    /// Full strength of the unit, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,
    /// Attack per soldier.
    pub atk: u32,
    /// Defense of the unit.
    #[serde(default)]
    pub def: u32,
    /// Initiative; faster units act first.
    #[serde(default)]
    pub spd: u32,
    /// Hit points of a single soldier (0 means unset).
    #[serde(default)]
    pub hp: u32,
}

impl UnitStats {
    /// Hit points of one soldier, falling back to `default_hp` when unset.
    pub fn hp_per_soldier(&self, default_hp: u32) -> u32 {
        if self.hp == 0 { default_hp.max(1) } else { self.hp }
    }

    /// Total attack power of the unit (`atk * currentCount`).
    pub fn strength(&self) -> u64 {
        u64::from(self.atk) * u64::from(self.current_count)
    }
}

/// A named unit as supplied in a battle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Display name (commander or company name).
    pub name: String,
    /// The unit's troop stats.
    pub unit: UnitStats,
}

impl UnitSpec {
    /// Create a unit spec.
    pub fn new(name: impl Into<String>, unit: UnitStats) -> Self {
        Self {
            name: name.into(),
            unit,
        }
    }
}

/// A unit taking part in a running battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Position of the unit in the battle.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// Live stats; `current_count` shrinks as casualties are taken.
    pub stats: UnitStats,
    /// Set once `current_count` reaches zero.
    pub is_defeated: bool,
    /// Set by a defend action until the unit's next turn begins.
    pub is_defending: bool,
}

impl Unit {
    /// Stamp a configured unit with its battle id.
    pub fn from_spec(spec: &UnitSpec, id: UnitId) -> Self {
        Self {
            id,
            name: spec.name.clone(),
            stats: spec.unit.clone(),
            is_defeated: false,
            is_defending: false,
        }
    }

    /// Whether the unit fights on the enemy side.
    pub fn is_enemy(&self) -> bool {
        self.id.side == Side::Enemy
    }

    /// Whether the unit can still act or be targeted.
    pub fn is_alive(&self) -> bool {
        !self.is_defeated
    }
}
