pub mod battle;
pub mod check;
pub mod skirmish;
pub mod units;

use std::path::Path;

use clap::Args;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use telain_battle::tactics::{self, TACTIC_NAMES, Tactic};
use telain_battle::{BattleConfig, BattleEngine, EngineConfig, LogEntry, LogKind, Unit};

/// Options shared by the commands that fight a battle.
#[derive(Args, Debug)]
pub struct RunOptions {
    /// RNG seed for reproducible damage rolls
    #[arg(short, long, default_value = "42")]
    pub seed: u64,

    /// Tactic for allied units: weakest, strongest, hold
    #[arg(short, long, default_value = "weakest")]
    pub tactic: String,

    /// Tactic for enemy units (default: same as --tactic)
    #[arg(long)]
    pub enemy_tactic: Option<String>,

    /// Give up after this many rounds
    #[arg(long, default_value = "100")]
    pub max_rounds: u32,

    /// Print the summary as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

/// Read and parse a battle configuration file.
fn load_config(path: &Path) -> Result<BattleConfig, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    BattleConfig::from_json(&json).map_err(|e| e.to_string())
}

fn tactic(name: &str) -> Result<Box<dyn Tactic>, String> {
    tactics::by_name(name).ok_or_else(|| {
        format!(
            "unknown tactic '{name}' (expected one of: {})",
            TACTIC_NAMES.join(", ")
        )
    })
}

/// Start a battle from `config` and play it to the end.
fn fight(config: BattleConfig, opts: &RunOptions) -> Result<BattleEngine, String> {
    let mut ally_tactic = tactic(&opts.tactic)?;
    let mut enemy_tactic = tactic(opts.enemy_tactic.as_deref().unwrap_or(&opts.tactic))?;

    let mut engine = BattleEngine::new(
        EngineConfig::default()
            .with_seed(opts.seed)
            .with_max_rounds(opts.max_rounds),
    );
    engine.init_battle(config).map_err(|e| e.to_string())?;
    engine
        .run_auto(ally_tactic.as_mut(), enemy_tactic.as_mut())
        .map_err(|e| format!("battle aborted: {e}"))?;
    Ok(engine)
}

/// Print the outcome of a finished battle.
fn print_outcome(engine: &BattleEngine, opts: &RunOptions) -> Result<(), String> {
    let summary = engine.battle_result();

    if opts.json {
        let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
        println!("{json}");
        return Ok(());
    }

    let state = engine.state();
    let title = state
        .config
        .as_ref()
        .and_then(|c| c.title.as_deref())
        .unwrap_or("Skirmish");
    let enemy_tactic = opts.enemy_tactic.as_deref().unwrap_or(&opts.tactic);
    println!(
        "  {} '{}' {}",
        "Battle".bold(),
        title,
        format!(
            "(seed={}, {} vs {})",
            opts.seed, opts.tactic, enemy_tactic
        )
        .dimmed()
    );
    println!(
        "  {} allied units, {} enemy units",
        state.allies.len(),
        state.enemies.len()
    );
    println!();

    println!("  {}", "Battle Log".bold().underline());
    println!();
    for entry in &summary.logs {
        let turn = format!("[{:>3}]", entry.turn).dimmed();
        println!("  {turn} {}", colorize_log(entry));
    }
    println!();

    let verdict = match summary.victory {
        Some(true) => "VICTORY".green().bold(),
        Some(false) => "DEFEAT".red().bold(),
        None => "UNDECIDED".yellow().bold(),
    };
    println!(
        "  {verdict} after {} round{}",
        summary.turns,
        if summary.turns == 1 { "" } else { "s" }
    );
    println!();

    println!("{}", roster_table(state.units()));
    Ok(())
}

fn colorize_log(entry: &LogEntry) -> colored::ColoredString {
    match entry.kind {
        LogKind::System if entry.message.ends_with("被击败！") => entry.message.red().bold(),
        LogKind::System => entry.message.cyan(),
        LogKind::Combat => entry.message.normal(),
    }
}

/// Render units as a table.
fn roster_table<'a>(units: impl Iterator<Item = &'a Unit>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Unit", "Type", "Troops", "SPD", "Status"]);

    for unit in units {
        let troops = match unit.stats.max_count {
            Some(max) => format!("{}/{max}", unit.stats.current_count),
            None => unit.stats.current_count.to_string(),
        };
        let status = if unit.is_defeated {
            "defeated".red().to_string()
        } else {
            "standing".green().to_string()
        };
        table.add_row(vec![
            unit.id.to_string(),
            unit.name.clone(),
            unit.stats.kind.clone(),
            troops,
            unit.stats.spd.to_string(),
            status,
        ]);
    }
    table
}
