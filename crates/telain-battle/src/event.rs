//! State-change notifications for UI layers.

use crate::state::{LogEntry, Phase};
use crate::unit::UnitId;

/// Something that happened inside the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleEvent {
    /// A battle was initialized.
    Started {
        /// Number of allied units.
        allies: usize,
        /// Number of enemy units.
        enemies: usize,
    },
    /// A line was appended to the battle log.
    Logged(LogEntry),
    /// The phase changed.
    PhaseChanged {
        /// Previous phase.
        from: Phase,
        /// New phase.
        to: Phase,
    },
    /// A new round began.
    RoundStarted {
        /// The new round number.
        turn: u32,
    },
    /// A unit lost its last soldier.
    UnitDefeated {
        /// The fallen unit.
        id: UnitId,
    },
    /// One side was wiped out.
    Ended {
        /// Whether the enemy side fell.
        victory: bool,
    },
}

/// Receives engine events synchronously, in emission order.
pub trait BattleObserver {
    /// Handle one event.
    fn on_event(&mut self, event: &BattleEvent);
}

impl<F> BattleObserver for F
where
    F: FnMut(&BattleEvent),
{
    fn on_event(&mut self, event: &BattleEvent) {
        self(event);
    }
}

/// Observer that keeps every event it sees.
#[derive(Debug, Default, Clone)]
pub struct EventRecorder {
    events: Vec<BattleEvent>,
}

impl EventRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen so far.
    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    /// Take the recorded events, leaving the recorder empty.
    pub fn drain(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }
}

impl BattleObserver for EventRecorder {
    fn on_event(&mut self, event: &BattleEvent) {
        self.events.push(event.clone());
    }
}
