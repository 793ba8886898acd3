use comfy_table::{ContentArrangement, Table};

use telain_battle::Side;
use telain_battle::catalog::{self, TEMPLATES};

pub fn run(side: Option<&str>) -> Result<(), String> {
    let side = match side.map(str::to_ascii_lowercase).as_deref() {
        None => None,
        Some("ally" | "allies") => Some(Side::Ally),
        Some("enemy" | "enemies") => Some(Side::Enemy),
        Some(other) => return Err(format!("unknown side '{other}' (expected ally or enemy)")),
    };

    let templates: Vec<_> = match side {
        Some(side) => catalog::for_side(side).collect(),
        None => TEMPLATES.iter().collect(),
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Type",
        "Side",
        "HP",
        "ATK",
        "DEF",
        "SPD",
        "Skill",
        "Description",
    ]);
    for t in &templates {
        table.add_row(vec![
            t.kind.to_string(),
            t.side.to_string(),
            t.hp.to_string(),
            t.atk.to_string(),
            t.def.to_string(),
            t.spd.to_string(),
            t.skill.to_string(),
            t.description.to_string(),
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} troop types", templates.len());
    Ok(())
}
