use std::path::Path;

use colored::Colorize;

use telain_battle::BattleEngine;

pub fn run(file: &Path) -> Result<(), String> {
    let config = super::load_config(file)?;
    let title = config.title.clone();

    let mut engine = BattleEngine::default();
    engine.init_battle(config).map_err(|e| e.to_string())?;
    let state = engine.state();

    println!(
        "  {} {}",
        "OK".green().bold(),
        title.as_deref().unwrap_or("battle configuration is valid")
    );
    println!(
        "  {} allied units, {} enemy units",
        state.allies.len(),
        state.enemies.len()
    );
    println!();

    println!("  {}", "Turn Order".bold().underline());
    let order = state.turn_order.iter().filter_map(|&id| state.unit(id));
    println!("{}", super::roster_table(order));

    Ok(())
}
