//! Action selection for units whose moves are not chosen by a player.

use std::cmp::Reverse;

use crate::state::BattleState;
use crate::unit::{Unit, UnitId};

/// What a unit does with its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Attack a unit.
    Attack {
        /// The unit to attack.
        target: UnitId,
    },
    /// Raise defense until the unit's next turn.
    Defend,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attack { target } => write!(f, "Attack {target}"),
            Self::Defend => write!(f, "Defend"),
        }
    }
}

/// Chooses an action for the acting unit.
pub trait Tactic {
    /// Short name used on the command line.
    fn name(&self) -> &str;

    /// Pick an action for `actor` given the current state.
    fn choose(&mut self, state: &BattleState, actor: &Unit) -> Action;
}

/// Attack the opposing unit with the fewest soldiers left.
#[derive(Debug, Default, Clone, Copy)]
pub struct FocusWeakest;

impl Tactic for FocusWeakest {
    fn name(&self) -> &str {
        "weakest"
    }

    fn choose(&mut self, state: &BattleState, actor: &Unit) -> Action {
        state
            .living(actor.id.side.opponent())
            .min_by_key(|u| u.stats.current_count)
            .map_or(Action::Defend, |u| Action::Attack { target: u.id })
    }
}

/// Attack the opposing unit with the highest total attack.
#[derive(Debug, Default, Clone, Copy)]
pub struct FocusStrongest;

impl Tactic for FocusStrongest {
    fn name(&self) -> &str {
        "strongest"
    }

    fn choose(&mut self, state: &BattleState, actor: &Unit) -> Action {
        state
            .living(actor.id.side.opponent())
            .min_by_key(|u| Reverse(u.stats.strength()))
            .map_or(Action::Defend, |u| Action::Attack { target: u.id })
    }
}

/// Defend while badly depleted, otherwise fight like [`FocusWeakest`].
#[derive(Debug, Clone, Copy)]
pub struct HoldTheLine {
    /// Strength (percent of `max_count`) below which the unit defends.
    pub threshold_percent: u32,
}

impl Default for HoldTheLine {
    fn default() -> Self {
        Self {
            threshold_percent: 25,
        }
    }
}

impl HoldTheLine {
    fn is_depleted(&self, actor: &Unit) -> bool {
        actor.stats.max_count.is_some_and(|max| {
            u64::from(actor.stats.current_count) * 100
                < u64::from(max) * u64::from(self.threshold_percent)
        })
    }
}

impl Tactic for HoldTheLine {
    fn name(&self) -> &str {
        "hold"
    }

    fn choose(&mut self, state: &BattleState, actor: &Unit) -> Action {
        if self.is_depleted(actor) {
            Action::Defend
        } else {
            FocusWeakest.choose(state, actor)
        }
    }
}

/// Names accepted by [`by_name`].
pub const TACTIC_NAMES: [&str; 3] = ["weakest", "strongest", "hold"];

/// Look up a built-in tactic by name.
pub fn by_name(name: &str) -> Option<Box<dyn Tactic>> {
    match name.to_ascii_lowercase().as_str() {
        "weakest" => Some(Box::new(FocusWeakest)),
        "strongest" => Some(Box::new(FocusStrongest)),
        "hold" => Some(Box::new(HoldTheLine::default())),
        _ => None,
    }
}
