//! Damage and casualty formulas.
//!
//! Damage is computed for the whole unit at once and then converted into
//! lost soldiers using the defender's hit points per soldier.

use rand::Rng;

use crate::config::EngineConfig;
use crate::unit::Unit;

/// Defense after the defend bonus, floor-rounded.
pub fn effective_defense(def: u32, defending: bool, bonus_percent: u32) -> u64 {
    let def = u64::from(def);
    if defending {
        def * (100 + u64::from(bonus_percent)) / 100
    } else {
        def
    }
}

/// Damage before variance: `atk * count - 2 * defense`, at least 1.
pub fn base_damage(strength: u64, effective_def: u64) -> u64 {
    strength.saturating_sub(effective_def * 2).max(1)
}

/// Spread `damage` by up to `variance_percent` either way.
///
/// `roll` is uniform in `[0, 1)`; 0.5 leaves the damage unchanged. The result
/// is floor-rounded and never below 1.
pub fn apply_variance(damage: u64, variance_percent: u32, roll: f64) -> u64 {
    let base = damage as f64;
    let spread = base * f64::from(variance_percent) / 100.0;
    let varied = (base + (roll * spread * 2.0 - spread)).floor();
    if varied < 1.0 { 1 } else { varied as u64 }
}

/// Soldiers lost to `damage`, capped at the soldiers still standing.
pub fn casualties(damage: u64, hp_per_soldier: u32, current_count: u32) -> u32 {
    let lost = damage.div_ceil(u64::from(hp_per_soldier.max(1)));
    lost.min(u64::from(current_count)) as u32
}

/// Roll the damage `attacker` deals to `defender`.
pub fn roll_damage<R: Rng + ?Sized>(
    attacker: &Unit,
    defender: &Unit,
    config: &EngineConfig,
    rng: &mut R,
) -> u64 {
    let def = effective_defense(
        defender.stats.def,
        defender.is_defending,
        config.defend_bonus_percent,
    );
    let damage = base_damage(attacker.stats.strength(), def);
    apply_variance(damage, config.variance_percent, rng.random::<f64>())
}
