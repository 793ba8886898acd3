//! Built-in troop templates of the Telain continent.
//!
//! Templates give the per-soldier stats of each troop type so that rosters
//! can be mustered as `type:count` instead of spelling out every stat.

use crate::error::{BattleError, BattleResult};
use crate::unit::{Side, UnitSpec, UnitStats};

/// Stat template of one troop type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitTemplate {
    /// Troop type name.
    pub kind: &'static str,
    /// The side that fields this troop type.
    pub side: Side,
    /// Hit points per soldier.
    pub hp: u32,
    /// Attack per soldier.
    pub atk: u32,
    /// Defense.
    pub def: u32,
    /// Initiative.
    pub spd: u32,
    /// Signature skill (not resolved by the engine).
    pub skill: &'static str,
    /// Flavour text.
    pub description: &'static str,
}

impl UnitTemplate {
    /// Stats for a unit of `count` soldiers at full strength.
    pub fn stats(&self, count: u32) -> UnitStats {
        UnitStats {
            kind: self.kind.to_string(),
            current_count: count,
            max_count: Some(count),
            atk: self.atk,
            def: self.def,
            spd: self.spd,
            hp: self.hp,
        }
    }

    /// A named unit of `count` soldiers.
    pub fn spec(&self, name: impl Into<String>, count: u32) -> UnitSpec {
        UnitSpec::new(name, self.stats(count))
    }
}

const fn template(
    kind: &'static str,
    side: Side,
    stats: [u32; 4],
    skill: &'static str,
    description: &'static str,
) -> UnitTemplate {
    let [hp, atk, def, spd] = stats;
    UnitTemplate {
        kind,
        side,
        hp,
        atk,
        def,
        spd,
        skill,
        description,
    }
}

/// Every built-in template, allied troops first.
pub static TEMPLATES: [UnitTemplate; 12] = [
    template("剑士", Side::Ally, [15, 10, 8, 5], "盾墙", "攻守平衡的近战步兵，擅长正面交锋"),
    template("长枪兵", Side::Ally, [12, 12, 5, 6], "枪阵", "高攻击的步兵，对骑兵有额外伤害"),
    template("弓箭手", Side::Ally, [10, 14, 3, 7], "齐射", "远程攻击单位，优先攻击后排"),
    template("骑兵", Side::Ally, [18, 12, 6, 12], "冲锋", "高机动性单位，首回合攻击加成"),
    template("法师", Side::Ally, [8, 16, 2, 4], "火球术", "魔法攻击单位，无视部分防御"),
    template("牧师", Side::Ally, [10, 4, 4, 3], "治愈之光", "治疗单位，可恢复我方部队兵员"),
    template("哥布林", Side::Enemy, [8, 6, 2, 8], "群攻", "弱小但数量众多的杂兵"),
    template("哥布林弓手", Side::Enemy, [6, 8, 1, 7], "毒箭", "使用毒箭的哥布林远程单位"),
    template("座狼", Side::Enemy, [12, 10, 4, 14], "撕咬", "快速的野兽，擅长突袭"),
    template("兽人", Side::Enemy, [20, 14, 6, 5], "狂暴", "强壮的兽人战士"),
    template("骷髅兵", Side::Enemy, [10, 8, 4, 4], "不死", "亡灵士兵，免疫毒素和流血"),
    template("暗影刺客", Side::Enemy, [10, 18, 2, 15], "暗杀", "高伤害的刺客，优先攻击低HP目标"),
];

/// Look up a template by troop type name.
pub fn find(kind: &str) -> Option<&'static UnitTemplate> {
    TEMPLATES.iter().find(|t| t.kind == kind.trim())
}

/// Look up a template, failing with [`BattleError::UnknownTroopType`].
pub fn template_for(kind: &str) -> BattleResult<&'static UnitTemplate> {
    find(kind).ok_or_else(|| BattleError::UnknownTroopType(kind.trim().to_string()))
}

/// Templates fielded by one side.
pub fn for_side(side: Side) -> impl Iterator<Item = &'static UnitTemplate> {
    TEMPLATES.iter().filter(move |t| t.side == side)
}

/// Parse a `type:count` muster (e.g. `剑士:20`) into a unit spec named after
/// the troop type. A full-width colon is accepted as well.
pub fn parse_muster(muster: &str) -> BattleResult<UnitSpec> {
    let invalid = || BattleError::InvalidMuster(muster.to_string());
    let (kind, count) = muster
        .split_once(':')
        .or_else(|| muster.split_once('：'))
        .ok_or_else(invalid)?;
    let count: u32 = count.trim().parse().map_err(|_| invalid())?;
    if count == 0 {
        return Err(invalid());
    }
    let template = template_for(kind)?;
    Ok(template.spec(template.kind, count))
}
