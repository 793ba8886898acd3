use telain_battle::BattleConfig;
use telain_battle::catalog;

use super::RunOptions;

pub fn run(allies: &[String], enemies: &[String], opts: &RunOptions) -> Result<(), String> {
    let muster = |entries: &[String]| {
        entries
            .iter()
            .map(|m| catalog::parse_muster(m).map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, _>>()
    };

    let config = BattleConfig {
        title: None,
        allies: muster(allies)?,
        enemies: muster(enemies)?,
    };
    let engine = super::fight(config, opts)?;
    super::print_outcome(&engine, opts)
}
