//! Turn-based troop battle engine for Telain.
//!
//! Two rosters of troop units fight in speed order, round after round. Each
//! unit either attacks (damage is converted into lost soldiers) or defends
//! (defense +50% until its next turn) until one side is wiped out. The
//! engine takes a [`BattleConfig`] in and hands a [`BattleSummary`] out; how
//! the configuration is produced and how the result is shown is up to the
//! caller.

pub mod catalog;
pub mod config;
pub mod damage;
pub mod engine;
pub mod error;
pub mod event;
pub mod state;
pub mod tactics;
pub mod unit;

pub use config::{BattleConfig, EngineConfig};
pub use engine::{AttackReport, BattleEngine};
pub use error::{BattleError, BattleResult};
pub use event::{BattleEvent, BattleObserver, EventRecorder};
pub use state::{BattleState, BattleSummary, LogEntry, LogKind, Phase, Survivor};
pub use tactics::{Action, FocusStrongest, FocusWeakest, HoldTheLine, Tactic};
pub use unit::{Side, Unit, UnitId, UnitSpec, UnitStats};
