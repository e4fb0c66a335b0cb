//! Weapon and armor proficiency
//!
//! Weapon categories roll up into two groups: "simple_weapons" and
//! "martial_weapons". Being proficient with a group covers every category
//! in it. Armor proficiency is per weight class.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::item::ArmorCategory;

pub const SIMPLE_WEAPONS: &str = "simple_weapons";
pub const MARTIAL_WEAPONS: &str = "martial_weapons";

const SIMPLE_CATEGORIES: &[&str] = &[
    "clubs",
    "daggers",
    "darts",
    "greatclubs",
    "handaxes",
    "javelins",
    "light_crossbows",
    "light_hammers",
    "maces",
    "quarterstaffs",
    "shortbows",
    "sickles",
    "slings",
    "spears",
    "staves",
    "unarmed",
];

const MARTIAL_CATEGORIES: &[&str] = &[
    "axes",
    "battleaxes",
    "blowguns",
    "flails",
    "glaives",
    "greataxes",
    "greatswords",
    "halberds",
    "hammers",
    "hand_crossbows",
    "heavy_crossbows",
    "lances",
    "longbows",
    "longswords",
    "mauls",
    "morningstars",
    "pikes",
    "polearms",
    "rapiers",
    "scimitars",
    "shortswords",
    "swords",
    "tridents",
    "war_picks",
    "warhammers",
    "whips",
];

/// The group a weapon category belongs to, if known
pub fn weapon_group(category: &str) -> Option<&'static str> {
    let category = category.to_lowercase();
    if SIMPLE_CATEGORIES.contains(&category.as_str()) {
        Some(SIMPLE_WEAPONS)
    } else if MARTIAL_CATEGORIES.contains(&category.as_str()) {
        Some(MARTIAL_WEAPONS)
    } else {
        None
    }
}

/// Outcome of a proficiency check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProficiencyCheck {
    pub is_proficient: bool,
    /// Flat penalty applied to attack rolls (0 when proficient)
    pub penalty: i32,
}

impl ProficiencyCheck {
    pub fn proficient() -> Self {
        Self {
            is_proficient: true,
            penalty: 0,
        }
    }

    pub fn lacking(penalty: i32) -> Self {
        Self {
            is_proficient: false,
            penalty,
        }
    }
}

/// What a combatant has trained with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proficiencies {
    /// Weapon categories or groups ("swords", "martial_weapons")
    #[serde(default)]
    pub weapons: BTreeSet<String>,
    #[serde(default)]
    pub armor: BTreeSet<ArmorCategory>,
}

impl Proficiencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weapons(mut self, entries: &[&str]) -> Self {
        self.weapons.extend(entries.iter().map(|e| e.to_lowercase()));
        self
    }

    pub fn with_armor(mut self, categories: &[ArmorCategory]) -> Self {
        self.armor.extend(categories.iter().copied());
        self
    }

    /// Direct category match or membership through a group
    pub fn covers_weapon(&self, category: &str) -> bool {
        let category = category.to_lowercase();
        if category == "unarmed" || self.weapons.contains(&category) {
            return true;
        }
        weapon_group(&category).is_some_and(|group| self.weapons.contains(group))
    }

    pub fn covers_armor(&self, category: ArmorCategory) -> bool {
        self.armor.contains(&category)
    }
}
