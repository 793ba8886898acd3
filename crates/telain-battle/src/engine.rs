//! The battle engine: owner and sole mutator of one encounter's state.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::{BattleConfig, EngineConfig};
use crate::damage;
use crate::error::{BattleError, BattleResult};
use crate::event::{BattleEvent, BattleObserver};
use crate::state::{
    self, BattleState, BattleSummary, LogEntry, LogKind, Phase, compute_turn_order, current_unit,
    is_battle_over, is_victory,
};
use crate::tactics::{Action, Tactic};
use crate::unit::{Side, Unit, UnitId};

/// Outcome of a single attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackReport {
    /// The attacking unit.
    pub attacker: UnitId,
    /// The unit that was hit.
    pub defender: UnitId,
    /// Damage dealt after variance.
    pub damage: u64,
    /// Soldiers the defender lost.
    pub casualties: u32,
    /// Whether the defender was wiped out by this attack.
    pub defeated: bool,
}

/// Runs turn-based battles between two rosters of troop units.
///
/// The engine is synchronous and single-threaded. All mutation goes through
/// `&mut self`, so one engine serves one caller at a time; run separate
/// engines for separate battles.
pub struct BattleEngine {
    config: EngineConfig,
    rng: StdRng,
    state: BattleState,
    observers: Vec<Box<dyn BattleObserver>>,
}

impl std::fmt::Debug for BattleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattleEngine")
            .field("phase", &self.state.phase)
            .field("turn", &self.state.current_turn)
            .field("logs", &self.state.logs.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for BattleEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl BattleEngine {
    /// Create an idle engine.
    pub fn new(config: EngineConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            state: BattleState::default(),
            observers: Vec::new(),
        }
    }

    /// Register an observer. Observers survive resets.
    pub fn subscribe(&mut self, observer: Box<dyn BattleObserver>) {
        self.observers.push(observer);
    }

    /// The engine's tuning.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only view of the battle state.
    pub fn state(&self) -> &BattleState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Current round number (0 when idle).
    pub fn current_turn(&self) -> u32 {
        self.state.current_turn
    }

    /// Whether a battle is accepting actions.
    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Look up a unit by id.
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.state.unit(id)
    }

    /// The full battle log.
    pub fn logs(&self) -> &[LogEntry] {
        &self.state.logs
    }

    /// Log entries appended after the first `cursor` entries.
    pub fn logs_since(&self, cursor: usize) -> &[LogEntry] {
        self.state.logs.get(cursor..).unwrap_or(&[])
    }

    /// The unit due to act, if any.
    pub fn current_unit(&self) -> Option<&Unit> {
        current_unit(&self.state)
    }

    /// Whether an allied unit is due to act.
    pub fn is_player_turn(&self) -> bool {
        self.current_unit().is_some_and(|u| !u.is_enemy())
    }

    /// Whether either side has been wiped out.
    pub fn is_battle_over(&self) -> bool {
        is_battle_over(&self.state)
    }

    /// `None` while the battle runs, then whether the enemy side fell.
    pub fn is_victory(&self) -> Option<bool> {
        is_victory(&self.state)
    }

    /// Start a battle from `config`, replacing any battle in progress.
    ///
    /// Fails with [`BattleError::InvalidConfiguration`] when a roster is empty
    /// or a unit has no soldiers; the engine is left untouched in that case.
    pub fn init_battle(&mut self, config: BattleConfig) -> BattleResult<()> {
        config.validate()?;

        let allies = config
            .allies
            .iter()
            .enumerate()
            .map(|(i, spec)| Unit::from_spec(spec, UnitId::ally(i)))
            .collect();
        let enemies = config
            .enemies
            .iter()
            .enumerate()
            .map(|(i, spec)| Unit::from_spec(spec, UnitId::enemy(i)))
            .collect();

        let previous = self.state.phase;
        self.state = BattleState {
            phase: Phase::PlayerTurn,
            current_turn: 1,
            allies,
            enemies,
            config: Some(config),
            ..BattleState::default()
        };
        self.state.turn_order = compute_turn_order(&self.state);
        self.state.current_unit_index = 0;

        tracing::info!(
            allies = self.state.allies.len(),
            enemies = self.state.enemies.len(),
            "battle started"
        );
        self.emit(BattleEvent::Started {
            allies: self.state.allies.len(),
            enemies: self.state.enemies.len(),
        });
        if previous != Phase::PlayerTurn {
            self.emit(BattleEvent::PhaseChanged {
                from: previous,
                to: Phase::PlayerTurn,
            });
        }
        let turn = self.state.current_turn;
        self.add_log(LogKind::System, format!("战斗开始！回合 {turn}"));
        self.state.active = true;
        Ok(())
    }

    /// Hand the turn to the next unit, starting a new round when the order
    /// is exhausted.
    pub fn next_turn(&mut self) -> BattleResult<()> {
        self.ensure_active()?;
        if self.state.phase != Phase::BattleEnd {
            self.advance();
        }
        Ok(())
    }

    /// Resolve an attack of `attacker` on `defender`, then advance the turn.
    pub fn execute_attack(
        &mut self,
        attacker: UnitId,
        defender: UnitId,
    ) -> BattleResult<AttackReport> {
        self.ensure_can_act()?;
        let a = living_unit(&self.state, attacker)?;
        let d = living_unit(&self.state, defender)?;

        let damage = damage::roll_damage(a, d, &self.config, &mut self.rng);
        let lost = damage::casualties(
            damage,
            d.stats.hp_per_soldier(self.config.default_hp),
            d.stats.current_count,
        );
        let line = format!(
            "{}【{}×{}】攻击{}【{}】，造成 {} 伤害，击杀 {} 人",
            a.name, a.stats.kind, a.stats.current_count, d.name, d.stats.kind, damage, lost
        );

        if let Some(unit) = self.state.unit_mut(attacker) {
            unit.is_defending = false;
        }
        let (defeated, fallen_name) = match self.state.unit_mut(defender) {
            Some(target) => {
                target.stats.current_count -= lost;
                if target.stats.current_count == 0 {
                    target.is_defeated = true;
                }
                (target.is_defeated, target.name.clone())
            }
            None => return Err(BattleError::InvalidReference(defender)),
        };

        tracing::debug!(
            attacker = %attacker,
            defender = %defender,
            damage,
            casualties = lost,
            "attack resolved"
        );
        self.add_log(LogKind::Combat, line);
        if defeated {
            self.add_log(LogKind::System, format!("{fallen_name} 被击败！"));
            self.emit(BattleEvent::UnitDefeated { id: defender });
        }

        self.advance();
        Ok(AttackReport {
            attacker,
            defender,
            damage,
            casualties: lost,
            defeated,
        })
    }

    /// Put `unit` into a defensive stance until its next turn, then advance
    /// the turn.
    pub fn execute_defend(&mut self, unit: UnitId) -> BattleResult<()> {
        self.ensure_can_act()?;
        living_unit(&self.state, unit)?;

        let name = match self.state.unit_mut(unit) {
            Some(u) => {
                u.is_defending = true;
                u.name.clone()
            }
            None => return Err(BattleError::InvalidReference(unit)),
        };
        tracing::debug!(unit = %unit, "unit defends");
        self.add_log(
            LogKind::Combat,
            format!(
                "{name} 选择防御，防御力提升{}%",
                self.config.defend_bonus_percent
            ),
        );

        self.advance();
        Ok(())
    }

    /// Perform `action` with the unit whose turn it is.
    pub fn act(&mut self, action: Action) -> BattleResult<Option<AttackReport>> {
        self.ensure_can_act()?;
        let actor = self.current_unit().ok_or(BattleError::NoActiveUnit)?.id;
        match action {
            Action::Attack { target } => self.execute_attack(actor, target).map(Some),
            Action::Defend => self.execute_defend(actor).map(|()| None),
        }
    }

    /// Play the battle to the end, letting tactics choose every action.
    pub fn run_auto(
        &mut self,
        allies: &mut dyn Tactic,
        enemies: &mut dyn Tactic,
    ) -> BattleResult<BattleSummary> {
        self.ensure_active()?;
        while self.state.phase != Phase::BattleEnd {
            if self.state.current_turn > self.config.max_rounds {
                tracing::warn!(rounds = self.config.max_rounds, "round limit reached");
                return Err(BattleError::RoundLimitExceeded(self.config.max_rounds));
            }
            let actor = current_unit(&self.state).ok_or(BattleError::NoActiveUnit)?;
            let action = if actor.is_enemy() {
                enemies.choose(&self.state, actor)
            } else {
                allies.choose(&self.state, actor)
            };
            self.act(action)?;
        }
        Ok(self.battle_result())
    }

    /// Summary of the battle so far. Meaningful once the phase is
    /// [`Phase::BattleEnd`]; never mutates the engine.
    pub fn battle_result(&self) -> BattleSummary {
        state::summarize(&self.state)
    }

    /// Close the battle and return its summary.
    ///
    /// Rosters and logs stay readable; further actions fail with
    /// [`BattleError::InactiveBattle`].
    pub fn end_battle(&mut self) -> BattleResult<BattleSummary> {
        self.ensure_active()?;
        let summary = self.battle_result();
        self.state.active = false;
        self.set_phase(Phase::Idle);
        tracing::info!(victory = ?summary.victory, turns = summary.turns, "battle closed");
        Ok(summary)
    }

    /// Drop all battle state and re-seed the RNG, as if freshly constructed.
    pub fn reset_battle(&mut self) {
        let previous = self.state.phase;
        self.state = BattleState::default();
        self.rng = StdRng::seed_from_u64(self.config.seed);
        if previous != Phase::Idle {
            self.emit(BattleEvent::PhaseChanged {
                from: previous,
                to: Phase::Idle,
            });
        }
        tracing::debug!("battle reset");
    }

    fn ensure_active(&self) -> BattleResult<()> {
        if self.state.active {
            Ok(())
        } else {
            Err(BattleError::InactiveBattle)
        }
    }

    fn ensure_can_act(&self) -> BattleResult<()> {
        self.ensure_active()?;
        if self.state.phase == Phase::BattleEnd {
            return Err(BattleError::BattleOver);
        }
        Ok(())
    }

    /// Move to the next living unit, opening a new round when the order is
    /// exhausted. Ends the battle once a side has fallen.
    fn advance(&mut self) {
        let id = loop {
            self.state.current_unit_index += 1;
            if self.state.current_unit_index >= self.state.turn_order.len() {
                self.start_round();
            }
            if is_battle_over(&self.state) {
                self.finish();
                return;
            }
            match self.current_unit().map(|u| (u.id, u.is_alive())) {
                Some((id, true)) => break id,
                Some((_, false)) => {}
                None => {
                    self.finish();
                    return;
                }
            }
        };
        if let Some(unit) = self.state.unit_mut(id) {
            unit.is_defending = false;
        }
        let phase = if id.side == Side::Enemy {
            Phase::EnemyTurn
        } else {
            Phase::PlayerTurn
        };
        self.set_phase(phase);
    }

    fn start_round(&mut self) {
        self.state.current_turn += 1;
        self.state.current_unit_index = 0;
        self.state.turn_order = compute_turn_order(&self.state);
        let turn = self.state.current_turn;
        tracing::debug!(turn, units = self.state.turn_order.len(), "round started");
        self.emit(BattleEvent::RoundStarted { turn });
        self.add_log(LogKind::System, format!("回合 {turn} 开始"));
    }

    fn finish(&mut self) {
        if self.state.phase == Phase::BattleEnd {
            return;
        }
        self.set_phase(Phase::BattleEnd);
        let victory = is_victory(&self.state).unwrap_or(true);
        tracing::info!(victory, turn = self.state.current_turn, "battle over");
        self.emit(BattleEvent::Ended { victory });
    }

    fn set_phase(&mut self, to: Phase) {
        let from = self.state.phase;
        if from != to {
            self.state.phase = to;
            self.emit(BattleEvent::PhaseChanged { from, to });
        }
    }

    fn add_log(&mut self, kind: LogKind, message: String) {
        let entry = LogEntry {
            turn: self.state.current_turn,
            kind,
            message,
        };
        self.state.logs.push(entry.clone());
        self.emit(BattleEvent::Logged(entry));
    }

    fn emit(&mut self, event: BattleEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }
}

/// Resolve `id` to a unit that can still fight.
fn living_unit(state: &BattleState, id: UnitId) -> BattleResult<&Unit> {
    let unit = state.unit(id).ok_or(BattleError::InvalidReference(id))?;
    if unit.is_defeated {
        return Err(BattleError::UnitDefeated(id));
    }
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use proptest::prelude::*;

    use super::*;
    use crate::catalog;
    use crate::tactics::FocusWeakest;
    use crate::unit::{UnitSpec, UnitStats};

    fn stats(count: u32, atk: u32, def: u32, spd: u32, hp: u32) -> UnitStats {
        UnitStats {
            kind: "剑士".to_string(),
            current_count: count,
            max_count: None,
            atk,
            def,
            spd,
            hp,
        }
    }

    fn duel(ally: UnitStats, enemy: UnitStats) -> BattleConfig {
        BattleConfig::new()
            .with_ally(UnitSpec::new("玩家", ally))
            .with_enemy(UnitSpec::new("山贼", enemy))
    }

    fn scenario_a() -> BattleConfig {
        duel(stats(20, 10, 8, 5, 15), stats(10, 5, 3, 4, 15))
    }

    fn flat_engine() -> BattleEngine {
        BattleEngine::new(EngineConfig::default().with_variance_percent(0))
    }

    fn record(engine: &mut BattleEngine) -> Rc<RefCell<Vec<BattleEvent>>> {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let events = Rc::clone(&sink);
        engine.subscribe(Box::new(move |e: &BattleEvent| {
            events.borrow_mut().push(e.clone());
        }));
        sink
    }

    #[test]
    fn init_sets_up_first_round() {
        let mut engine = BattleEngine::default();
        engine.init_battle(scenario_a()).unwrap();

        assert!(engine.is_active());
        assert_eq!(engine.phase(), Phase::PlayerTurn);
        assert_eq!(engine.current_turn(), 1);
        assert!(!engine.is_battle_over());
        assert_eq!(engine.is_victory(), None);
        assert_eq!(
            engine.state().turn_order,
            vec![UnitId::ally(0), UnitId::enemy(0)]
        );
        assert_eq!(engine.current_unit().map(|u| u.id), Some(UnitId::ally(0)));
        assert!(engine.is_player_turn());

        let logs = engine.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].kind, LogKind::System);
        assert_eq!(logs[0].message, "战斗开始！回合 1");
        assert_eq!(logs[0].turn, 1);

        let enemy = engine.unit(UnitId::enemy(0)).unwrap();
        assert!(enemy.is_enemy());
        assert!(!enemy.is_defeated);
        assert!(!enemy.is_defending);
    }

    #[test]
    fn init_rejects_bad_config_and_stays_idle() {
        let mut engine = BattleEngine::default();
        let err = engine
            .init_battle(BattleConfig::new().with_ally(UnitSpec::new("孤军", stats(5, 1, 1, 1, 1))))
            .unwrap_err();
        assert!(matches!(err, BattleError::InvalidConfiguration(_)));
        assert!(!engine.is_active());
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.logs().is_empty());

        let err = engine
            .init_battle(duel(stats(5, 1, 1, 1, 1), stats(0, 1, 1, 1, 1)))
            .unwrap_err();
        assert!(matches!(err, BattleError::InvalidConfiguration(_)));
    }

    #[test]
    fn scenario_a_one_blow_victory() {
        let mut engine = BattleEngine::default();
        engine.init_battle(scenario_a()).unwrap();

        let report = engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();
        assert!((174..=213).contains(&report.damage));
        assert_eq!(report.casualties, 10);
        assert!(report.defeated);

        let enemy = engine.unit(UnitId::enemy(0)).unwrap();
        assert_eq!(enemy.stats.current_count, 0);
        assert!(enemy.is_defeated);
        assert!(engine.is_battle_over());
        assert_eq!(engine.is_victory(), Some(true));
        assert_eq!(engine.phase(), Phase::BattleEnd);

        let messages: Vec<_> = engine.logs().iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages[1],
            format!(
                "玩家【剑士×20】攻击山贼【剑士】，造成 {} 伤害，击杀 10 人",
                report.damage
            )
        );
        assert_eq!(messages[2], "山贼 被击败！");
        assert_eq!(engine.logs()[1].kind, LogKind::Combat);

        let summary = engine.battle_result();
        assert_eq!(summary.victory, Some(true));
        assert_eq!(summary.turns, 1);
        assert_eq!(summary.ally_survivors.len(), 1);
        assert_eq!(summary.ally_survivors[0].remaining, 20);
        assert_eq!(summary.enemies_defeated, vec!["山贼".to_string()]);
    }

    #[test]
    fn scenario_b_defending_raises_defense_by_half() {
        let config = duel(stats(20, 10, 0, 5, 15), stats(1000, 1, 10, 10, 1));

        let mut plain = flat_engine();
        plain.init_battle(config.clone()).unwrap();
        let report = plain
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();
        assert_eq!(report.damage, 180);

        let mut engine = flat_engine();
        engine.init_battle(config).unwrap();
        // the enemy is faster and acts first
        assert_eq!(engine.current_unit().map(|u| u.id), Some(UnitId::enemy(0)));
        engine.execute_defend(UnitId::enemy(0)).unwrap();
        assert!(engine.unit(UnitId::enemy(0)).unwrap().is_defending);
        assert_eq!(engine.phase(), Phase::PlayerTurn);

        let report = engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();
        assert_eq!(report.damage, 170);
        assert_eq!(report.casualties, 170);
        assert_eq!(
            engine.unit(UnitId::enemy(0)).unwrap().stats.current_count,
            830
        );
    }

    #[test]
    fn defend_lasts_until_the_units_next_turn() {
        let mut engine = flat_engine();
        engine
            .init_battle(duel(stats(20, 10, 0, 5, 15), stats(1000, 1, 10, 10, 1)))
            .unwrap();

        engine.execute_defend(UnitId::enemy(0)).unwrap();
        engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();

        // round 2: the enemy is up again, so its stance has lapsed
        assert_eq!(engine.current_turn(), 2);
        assert_eq!(engine.current_unit().map(|u| u.id), Some(UnitId::enemy(0)));
        assert!(!engine.unit(UnitId::enemy(0)).unwrap().is_defending);
        assert_eq!(engine.phase(), Phase::EnemyTurn);

        engine.next_turn().unwrap();
        let report = engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();
        assert_eq!(report.damage, 180);
    }

    #[test]
    fn killing_blow_at_round_end_opens_next_round() {
        let mut engine = BattleEngine::default();
        let events = record(&mut engine);
        engine
            .init_battle(duel(stats(20, 10, 8, 5, 15), stats(10, 5, 3, 9, 15)))
            .unwrap();

        engine.execute_defend(UnitId::enemy(0)).unwrap();
        let report = engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();
        assert!(report.defeated);

        assert_eq!(engine.phase(), Phase::BattleEnd);
        assert_eq!(engine.current_turn(), 2);
        let messages: Vec<_> = engine.logs().iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[3], "山贼 被击败！");
        assert_eq!(messages[4], "回合 2 开始");
        assert_eq!(engine.battle_result().turns, 2);
        assert!(
            events
                .borrow()
                .contains(&BattleEvent::RoundStarted { turn: 2 })
        );
        assert_eq!(
            events
                .borrow()
                .iter()
                .filter(|e| matches!(e, BattleEvent::Ended { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn killing_blow_mid_round_stays_in_round() {
        let mut engine = BattleEngine::default();
        engine.init_battle(scenario_a()).unwrap();
        engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();
        assert_eq!(engine.phase(), Phase::BattleEnd);
        assert_eq!(engine.current_turn(), 1);
        assert_eq!(engine.state().current_unit_index, 1);
    }

    #[test]
    fn attacking_drops_the_attackers_stance() {
        let config = BattleConfig::new()
            .with_ally(UnitSpec::new("前锋", stats(20, 10, 0, 5, 1000)))
            .with_ally(UnitSpec::new("后卫", stats(20, 10, 0, 3, 15)))
            .with_enemy(UnitSpec::new("山贼", stats(1000, 1, 10, 10, 1)));
        let mut engine = flat_engine();
        engine.init_battle(config).unwrap();

        engine.execute_defend(UnitId::enemy(0)).unwrap();
        assert!(engine.unit(UnitId::enemy(0)).unwrap().is_defending);

        // out of turn: the vanguard is up, not the bandits
        engine
            .execute_attack(UnitId::enemy(0), UnitId::ally(0))
            .unwrap();
        assert!(!engine.unit(UnitId::enemy(0)).unwrap().is_defending);
        assert_eq!(engine.current_unit().map(|u| u.id), Some(UnitId::ally(1)));

        let report = engine
            .execute_attack(UnitId::ally(1), UnitId::enemy(0))
            .unwrap();
        assert_eq!(report.damage, 180);
    }

    #[test]
    fn defend_bonus_is_configurable() {
        let mut engine = BattleEngine::new(
            EngineConfig::default()
                .with_variance_percent(0)
                .with_defend_bonus_percent(100),
        );
        engine
            .init_battle(duel(stats(20, 10, 0, 5, 15), stats(1000, 1, 10, 10, 1)))
            .unwrap();

        engine.execute_defend(UnitId::enemy(0)).unwrap();
        assert_eq!(
            engine.logs().last().unwrap().message,
            "山贼 选择防御，防御力提升100%"
        );
        let report = engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();
        // def 10 doubled to 20, subtracted twice
        assert_eq!(report.damage, 160);
    }

    #[test]
    fn defend_logs_combat_line() {
        let mut engine = BattleEngine::default();
        engine.init_battle(scenario_a()).unwrap();
        engine.execute_defend(UnitId::ally(0)).unwrap();
        let last = engine.logs().last().unwrap();
        assert_eq!(last.kind, LogKind::Combat);
        assert_eq!(last.message, "玩家 选择防御，防御力提升50%");
        assert_eq!(engine.phase(), Phase::EnemyTurn);
    }

    #[test]
    fn round_boundary_recomputes_and_logs() {
        let mut engine = BattleEngine::default();
        let events = record(&mut engine);
        engine.init_battle(scenario_a()).unwrap();

        engine.execute_defend(UnitId::ally(0)).unwrap();
        engine.execute_defend(UnitId::enemy(0)).unwrap();

        assert_eq!(engine.current_turn(), 2);
        assert_eq!(engine.state().current_unit_index, 0);
        assert_eq!(engine.phase(), Phase::PlayerTurn);
        let last = engine.logs().last().unwrap();
        assert_eq!(last.message, "回合 2 开始");
        assert_eq!(last.turn, 2);
        assert!(
            events
                .borrow()
                .contains(&BattleEvent::RoundStarted { turn: 2 })
        );
    }

    #[test]
    fn phase_follows_the_current_unit() {
        let mut engine = BattleEngine::default();
        engine
            .init_battle(duel(stats(50, 1, 5, 1, 15), stats(50, 1, 5, 9, 15)))
            .unwrap();
        assert_eq!(engine.phase(), Phase::PlayerTurn);
        assert!(!engine.is_player_turn());

        engine.act(Action::Defend).unwrap();
        assert_eq!(engine.phase(), Phase::PlayerTurn);
        assert!(engine.is_player_turn());

        engine.act(Action::Defend).unwrap();
        assert_eq!(engine.phase(), Phase::EnemyTurn);
    }

    #[test]
    fn defeated_units_are_skipped_mid_round() {
        let config = BattleConfig::new()
            .with_ally(UnitSpec::new("骑士", stats(20, 10, 0, 10, 15)))
            .with_enemy(UnitSpec::new("斥候", stats(1, 1, 0, 5, 15)))
            .with_enemy(UnitSpec::new("大军", stats(500, 1, 0, 1, 15)));
        let mut engine = BattleEngine::default();
        engine.init_battle(config).unwrap();
        assert_eq!(
            engine.state().turn_order,
            vec![UnitId::ally(0), UnitId::enemy(0), UnitId::enemy(1)]
        );

        let report = engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();
        assert!(report.defeated);
        assert!(!engine.is_battle_over());
        assert_eq!(engine.current_unit().map(|u| u.id), Some(UnitId::enemy(1)));
        assert_eq!(engine.phase(), Phase::EnemyTurn);

        // next round drops the fallen scout from the order
        engine.act(Action::Defend).unwrap();
        assert_eq!(
            engine.state().turn_order,
            vec![UnitId::ally(0), UnitId::enemy(1)]
        );
    }

    #[test]
    fn defeated_units_cannot_act_or_be_targeted() {
        let config = BattleConfig::new()
            .with_ally(UnitSpec::new("骑士", stats(20, 10, 0, 10, 15)))
            .with_enemy(UnitSpec::new("斥候", stats(1, 1, 0, 5, 15)))
            .with_enemy(UnitSpec::new("大军", stats(500, 1, 0, 1, 15)));
        let mut engine = BattleEngine::default();
        engine.init_battle(config).unwrap();
        engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();

        assert!(matches!(
            engine.execute_attack(UnitId::ally(0), UnitId::enemy(0)),
            Err(BattleError::UnitDefeated(id)) if id == UnitId::enemy(0)
        ));
        assert!(matches!(
            engine.execute_defend(UnitId::enemy(0)),
            Err(BattleError::UnitDefeated(_))
        ));
    }

    #[test]
    fn unknown_units_are_rejected_without_side_effects() {
        let mut engine = BattleEngine::default();
        engine.init_battle(scenario_a()).unwrap();
        let before = engine.state().clone();

        assert!(matches!(
            engine.execute_attack(UnitId::ally(0), UnitId::enemy(5)),
            Err(BattleError::InvalidReference(id)) if id == UnitId::enemy(5)
        ));
        assert!(matches!(
            engine.execute_attack(UnitId::ally(3), UnitId::enemy(0)),
            Err(BattleError::InvalidReference(_))
        ));
        assert!(matches!(
            engine.execute_defend(UnitId::ally(9)),
            Err(BattleError::InvalidReference(_))
        ));
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn actions_need_an_active_battle() {
        let mut engine = BattleEngine::default();
        assert!(matches!(
            engine.next_turn(),
            Err(BattleError::InactiveBattle)
        ));
        assert!(matches!(
            engine.execute_attack(UnitId::ally(0), UnitId::enemy(0)),
            Err(BattleError::InactiveBattle)
        ));
        assert!(matches!(
            engine.execute_defend(UnitId::ally(0)),
            Err(BattleError::InactiveBattle)
        ));
        assert!(matches!(
            engine.act(Action::Defend),
            Err(BattleError::InactiveBattle)
        ));
        assert!(matches!(
            engine.end_battle(),
            Err(BattleError::InactiveBattle)
        ));
    }

    #[test]
    fn actions_after_the_end_are_rejected() {
        let mut engine = BattleEngine::default();
        engine.init_battle(scenario_a()).unwrap();
        engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();

        assert!(matches!(
            engine.execute_defend(UnitId::ally(0)),
            Err(BattleError::BattleOver)
        ));
        // advancing a finished battle is a no-op
        let logs = engine.logs().len();
        engine.next_turn().unwrap();
        assert_eq!(engine.phase(), Phase::BattleEnd);
        assert_eq!(engine.logs().len(), logs);
    }

    #[test]
    fn battle_result_is_idempotent() {
        let mut engine = BattleEngine::default();
        engine.init_battle(scenario_a()).unwrap();
        engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();
        let first = engine.battle_result();
        let second = engine.battle_result();
        assert_eq!(first, second);
        assert_eq!(engine.logs().len(), first.logs.len());
    }

    #[test]
    fn end_battle_closes_but_keeps_records() {
        let mut engine = BattleEngine::default();
        engine.init_battle(scenario_a()).unwrap();
        engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();

        let summary = engine.end_battle().unwrap();
        assert_eq!(summary.victory, Some(true));
        assert!(!engine.is_active());
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(engine.logs().len(), 3);
        assert!(matches!(
            engine.next_turn(),
            Err(BattleError::InactiveBattle)
        ));
    }

    #[test]
    fn scenario_c_reset_matches_fresh_engine() {
        let mut engine = BattleEngine::default();
        engine.init_battle(scenario_a()).unwrap();
        engine.execute_defend(UnitId::ally(0)).unwrap();
        engine
            .execute_attack(UnitId::enemy(0), UnitId::ally(0))
            .unwrap();

        engine.reset_battle();
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(!engine.is_active());
        assert!(engine.state().allies.is_empty());
        assert!(engine.state().enemies.is_empty());
        assert!(engine.state().turn_order.is_empty());
        assert!(engine.logs().is_empty());
        assert!(engine.state().config.is_none());
        assert_eq!(engine.current_turn(), 0);

        let mut fresh = BattleEngine::default();
        for e in [&mut engine, &mut fresh] {
            e.init_battle(scenario_a()).unwrap();
            e.execute_defend(UnitId::ally(0)).unwrap();
            e.execute_attack(UnitId::enemy(0), UnitId::ally(0)).unwrap();
        }
        assert_eq!(engine.state(), fresh.state());
    }

    #[test]
    fn reinit_replaces_running_battle() {
        let mut engine = BattleEngine::default();
        engine.init_battle(scenario_a()).unwrap();
        engine.execute_defend(UnitId::ally(0)).unwrap();

        engine
            .init_battle(duel(stats(3, 1, 1, 1, 1), stats(4, 1, 1, 2, 1)))
            .unwrap();
        assert_eq!(engine.current_turn(), 1);
        assert_eq!(engine.logs().len(), 1);
        assert_eq!(engine.state().allies[0].stats.current_count, 3);
    }

    #[test]
    fn logs_stream_incrementally() {
        let mut engine = BattleEngine::default();
        engine.init_battle(scenario_a()).unwrap();
        let cursor = engine.logs().len();
        assert!(engine.logs_since(cursor).is_empty());

        engine.execute_defend(UnitId::ally(0)).unwrap();
        let fresh = engine.logs_since(cursor);
        assert_eq!(fresh.len(), 1);
        assert!(fresh[0].message.contains("选择防御"));
        assert!(engine.logs_since(99).is_empty());
    }

    #[test]
    fn observers_see_the_whole_story() {
        let mut engine = BattleEngine::default();
        let events = record(&mut engine);
        engine.init_battle(scenario_a()).unwrap();
        engine
            .execute_attack(UnitId::ally(0), UnitId::enemy(0))
            .unwrap();

        let events = events.borrow();
        assert_eq!(
            events[0],
            BattleEvent::Started {
                allies: 1,
                enemies: 1
            }
        );
        assert!(events.contains(&BattleEvent::PhaseChanged {
            from: Phase::Idle,
            to: Phase::PlayerTurn
        }));
        assert!(events.contains(&BattleEvent::UnitDefeated {
            id: UnitId::enemy(0)
        }));
        assert!(events.contains(&BattleEvent::PhaseChanged {
            from: Phase::PlayerTurn,
            to: Phase::BattleEnd
        }));
        assert_eq!(events.last(), Some(&BattleEvent::Ended { victory: true }));
        let logged = events
            .iter()
            .filter(|e| matches!(e, BattleEvent::Logged(_)))
            .count();
        assert_eq!(logged, engine.logs().len());
    }

    #[test]
    fn act_uses_the_current_unit() {
        let mut engine = BattleEngine::default();
        engine.init_battle(scenario_a()).unwrap();
        let report = engine
            .act(Action::Attack {
                target: UnitId::enemy(0),
            })
            .unwrap()
            .unwrap();
        assert_eq!(report.attacker, UnitId::ally(0));
        assert_eq!(engine.phase(), Phase::BattleEnd);
    }

    #[test]
    fn run_auto_swordsmen_rout_goblins() {
        let config = BattleConfig::new()
            .with_ally(catalog::parse_muster("剑士:20").unwrap())
            .with_enemy(catalog::parse_muster("哥布林:10").unwrap());
        let mut engine = BattleEngine::default();
        engine.init_battle(config).unwrap();

        let summary = engine
            .run_auto(&mut FocusWeakest, &mut FocusWeakest)
            .unwrap();
        assert_eq!(summary.victory, Some(true));
        // the swordsmen close round 1 with the killing blow
        assert_eq!(summary.turns, 2);
        assert_eq!(summary.logs.last().unwrap().message, "回合 2 开始");
        assert_eq!(summary.enemies_defeated, vec!["哥布林".to_string()]);
        // goblins strike first and kill three or four swordsmen
        assert!((16..=17).contains(&summary.ally_survivors[0].remaining));
        assert_eq!(engine.phase(), Phase::BattleEnd);
    }

    struct AlwaysDefend;

    impl Tactic for AlwaysDefend {
        fn name(&self) -> &str {
            "turtle"
        }

        fn choose(&mut self, _state: &BattleState, _actor: &Unit) -> Action {
            Action::Defend
        }
    }

    #[test]
    fn run_auto_gives_up_after_round_cap() {
        let mut engine = BattleEngine::new(EngineConfig::default().with_max_rounds(3));
        engine.init_battle(scenario_a()).unwrap();
        let err = engine
            .run_auto(&mut AlwaysDefend, &mut AlwaysDefend)
            .unwrap_err();
        assert!(matches!(err, BattleError::RoundLimitExceeded(3)));
        assert_eq!(engine.current_turn(), 4);
    }

    #[test]
    fn run_auto_needs_an_active_battle() {
        let mut engine = BattleEngine::default();
        assert!(matches!(
            engine.run_auto(&mut FocusWeakest, &mut FocusWeakest),
            Err(BattleError::InactiveBattle)
        ));
    }

    fn stats_strategy() -> impl Strategy<Value = UnitStats> {
        (1u32..200, 0u32..30, 0u32..20, 0u32..20, 0u32..30)
            .prop_map(|(count, atk, def, spd, hp)| stats(count, atk, def, spd, hp))
    }

    fn config_strategy() -> impl Strategy<Value = BattleConfig> {
        (
            prop::collection::vec(stats_strategy(), 1..4),
            prop::collection::vec(stats_strategy(), 1..4),
        )
            .prop_map(|(allies, enemies)| BattleConfig {
                title: None,
                allies: allies
                    .into_iter()
                    .enumerate()
                    .map(|(i, s)| UnitSpec::new(format!("A{i}"), s))
                    .collect(),
                enemies: enemies
                    .into_iter()
                    .enumerate()
                    .map(|(i, s)| UnitSpec::new(format!("E{i}"), s))
                    .collect(),
            })
    }

    fn assert_invariants(engine: &BattleEngine, initial: &BattleConfig) {
        let state = engine.state();
        for unit in state.units() {
            assert_eq!(unit.is_defeated, unit.stats.current_count == 0);
            let spec = match unit.id.side {
                Side::Ally => &initial.allies[unit.id.index],
                Side::Enemy => &initial.enemies[unit.id.index],
            };
            assert!(unit.stats.current_count <= spec.unit.current_count);
        }
        let over = state.is_wiped_out(Side::Ally) || state.is_wiped_out(Side::Enemy);
        assert_eq!(engine.is_battle_over(), over);
        assert_eq!(
            engine.is_victory(),
            over.then(|| state.is_wiped_out(Side::Enemy))
        );
    }

    proptest! {
        #[test]
        fn fresh_battles_are_not_over(config in config_strategy(), seed in any::<u64>()) {
            let mut engine = BattleEngine::new(EngineConfig::default().with_seed(seed));
            engine.init_battle(config).unwrap();
            prop_assert!(!engine.is_battle_over());
            prop_assert_eq!(engine.is_victory(), None);
        }

        #[test]
        fn turn_order_is_a_stable_speed_sort(config in config_strategy()) {
            let mut engine = BattleEngine::default();
            engine.init_battle(config).unwrap();
            let state = engine.state();
            let order = &state.turn_order;
            prop_assert_eq!(order.len(), state.units().count());
            for pair in order.windows(2) {
                let a = state.unit(pair[0]).unwrap();
                let b = state.unit(pair[1]).unwrap();
                prop_assert!(a.stats.spd >= b.stats.spd);
                if a.stats.spd == b.stats.spd {
                    let rank = |id: UnitId| (id.side == Side::Enemy, id.index);
                    prop_assert!(rank(pair[0]) < rank(pair[1]));
                }
            }
            prop_assert_eq!(order, &compute_turn_order(state));
        }

        #[test]
        fn battles_end_consistently(config in config_strategy(), seed in any::<u64>()) {
            let mut engine = BattleEngine::new(
                EngineConfig::default().with_seed(seed).with_max_rounds(10_000),
            );
            engine.init_battle(config.clone()).unwrap();
            let mut tactic = FocusWeakest;
            while engine.phase() != Phase::BattleEnd {
                let actor = engine.current_unit().unwrap().clone();
                let action = tactic.choose(engine.state(), &actor);
                engine.act(action).unwrap();
                assert_invariants(&engine, &config);
            }
            prop_assert!(engine.is_battle_over());
            prop_assert_eq!(engine.battle_result(), engine.battle_result());
        }
    }
}
