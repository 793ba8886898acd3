//! Error types for the battle engine.

use crate::unit::UnitId;

/// Errors that can occur while setting up or running a battle.
#[derive(Debug, thiserror::Error)]
pub enum BattleError {
    /// The battle configuration cannot start a battle.
    #[error("invalid battle configuration: {0}")]
    InvalidConfiguration(String),

    /// A unit id does not name a unit of the active battle.
    #[error("unknown unit: {0}")]
    InvalidReference(UnitId),

    /// An action was issued while no battle is running.
    #[error("no active battle")]
    InactiveBattle,

    /// An action was issued after one side was wiped out.
    #[error("battle is already over")]
    BattleOver,

    /// The acting or targeted unit has already been defeated.
    #[error("unit {0} is already defeated")]
    UnitDefeated(UnitId),

    /// The turn order is empty, so nobody can act.
    #[error("no unit is due to act")]
    NoActiveUnit,

    /// An automatic run did not finish within the round cap.
    #[error("battle did not finish within {0} rounds")]
    RoundLimitExceeded(u32),

    /// A troop type is not in the unit catalog.
    #[error("unknown troop type: {0}")]
    UnknownTroopType(String),

    /// A `type:count` muster string is malformed.
    #[error("invalid muster '{0}', expected TYPE:COUNT")]
    InvalidMuster(String),

    /// A battle configuration could not be parsed.
    #[error("malformed battle configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Convenience result type for battle operations.
pub type BattleResult<T> = Result<T, BattleError>;
