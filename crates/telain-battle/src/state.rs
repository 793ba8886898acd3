//! Battle state and the pure derivations computed from it.
//!
//! [`BattleState`] is plain data. Everything the original UI derived
//! reactively (current unit, battle-over, victory) is a function of the
//! state, evaluated on demand.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::config::BattleConfig;
use crate::unit::{Side, Unit, UnitId};

/// The engine's state machine value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No battle is running.
    #[default]
    Idle,
    /// An allied unit is due to act.
    PlayerTurn,
    /// An enemy unit is due to act.
    EnemyTurn,
    /// One side has been wiped out.
    BattleEnd,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::PlayerTurn => write!(f, "player_turn"),
            Self::EnemyTurn => write!(f, "enemy_turn"),
            Self::BattleEnd => write!(f, "battle_end"),
        }
    }
}

/// Category of a battle log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Battle lifecycle: start, new round, defeats.
    System,
    /// Actions taken by units.
    Combat,
}

/// One line of the battle's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Round in which the line was written.
    pub turn: u32,
    /// What kind of line this is.
    #[serde(rename = "type")]
    pub kind: LogKind,
    /// The narrative text.
    pub message: String,
}

/// Everything the engine knows about one encounter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BattleState {
    /// Current state machine value.
    pub phase: Phase,
    /// Round number: 0 before the battle, 1 once it starts.
    pub current_turn: u32,
    /// Allied roster; units are marked defeated, never removed.
    pub allies: Vec<Unit>,
    /// Enemy roster; units are marked defeated, never removed.
    pub enemies: Vec<Unit>,
    /// Undefeated units in acting order for the current round.
    pub turn_order: Vec<UnitId>,
    /// Position in `turn_order` of the unit about to act.
    pub current_unit_index: usize,
    /// Append-only battle log.
    pub logs: Vec<LogEntry>,
    /// The configuration the battle was started from.
    pub config: Option<BattleConfig>,
    /// Whether actions are currently accepted.
    pub active: bool,
}

impl BattleState {
    /// The roster of one side.
    pub fn roster(&self, side: Side) -> &[Unit] {
        match side {
            Side::Ally => &self.allies,
            Side::Enemy => &self.enemies,
        }
    }

    /// Look up a unit by id.
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.roster(id.side).get(id.index)
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        match id.side {
            Side::Ally => self.allies.get_mut(id.index),
            Side::Enemy => self.enemies.get_mut(id.index),
        }
    }

    /// All units, allies first.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.allies.iter().chain(&self.enemies)
    }

    /// Undefeated units of one side, in roster order.
    pub fn living(&self, side: Side) -> impl Iterator<Item = &Unit> {
        self.roster(side).iter().filter(|u| u.is_alive())
    }

    /// Whether every unit of `side` is defeated (true for an empty roster).
    pub fn is_wiped_out(&self, side: Side) -> bool {
        self.living(side).next().is_none()
    }
}

/// Acting order for a round: undefeated allies then undefeated enemies,
/// stably sorted by speed, fastest first.
pub fn compute_turn_order(state: &BattleState) -> Vec<UnitId> {
    let mut candidates: Vec<&Unit> = state.units().filter(|u| u.is_alive()).collect();
    candidates.sort_by_key(|u| Reverse(u.stats.spd));
    candidates.into_iter().map(|u| u.id).collect()
}

/// The unit due to act, if any.
pub fn current_unit(state: &BattleState) -> Option<&Unit> {
    state
        .turn_order
        .get(state.current_unit_index)
        .and_then(|&id| state.unit(id))
}

/// True iff at least one side has no undefeated units left.
pub fn is_battle_over(state: &BattleState) -> bool {
    state.is_wiped_out(Side::Ally) || state.is_wiped_out(Side::Enemy)
}

/// `None` while the battle runs; afterwards whether the enemy side fell.
///
/// A simultaneous wipe of both sides counts as a victory.
pub fn is_victory(state: &BattleState) -> Option<bool> {
    is_battle_over(state).then(|| state.is_wiped_out(Side::Enemy))
}

/// An allied unit left standing at the end of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survivor {
    /// Unit name.
    pub name: String,
    /// Soldiers remaining.
    pub remaining: u32,
}

/// Terminal summary of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSummary {
    /// `None` until the battle is over.
    pub victory: Option<bool>,
    /// Rounds elapsed.
    pub turns: u32,
    /// Undefeated allied units.
    pub ally_survivors: Vec<Survivor>,
    /// Names of defeated enemy units.
    pub enemies_defeated: Vec<String>,
    /// The full battle log.
    pub logs: Vec<LogEntry>,
}

/// Snapshot the state into a summary. Does not mutate anything.
pub fn summarize(state: &BattleState) -> BattleSummary {
    BattleSummary {
        victory: is_victory(state),
        turns: state.current_turn,
        ally_survivors: state
            .living(Side::Ally)
            .map(|u| Survivor {
                name: u.name.clone(),
                remaining: u.stats.current_count,
            })
            .collect(),
        enemies_defeated: state
            .enemies
            .iter()
            .filter(|u| u.is_defeated)
            .map(|u| u.name.clone())
            .collect(),
        logs: state.logs.clone(),
    }
}
