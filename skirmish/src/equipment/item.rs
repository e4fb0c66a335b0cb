//! Item definitions as consumed by combat
//!
//! Items are a tagged union of kinds. Weapon and armor behavior is reached
//! through the capability accessors ([`EquippedItem::weapon`],
//! [`EquippedItem::armor`]) rather than by probing for fields.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::character::Ability;
use crate::combat::{DamageType, DiceRoll, ItemEffect};

/// Equipment slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Head,
    Neck,
    Chest,
    Hands,
    Legs,
    Feet,
    RingLeft,
    RingRight,
    MainHand,
    OffHand,
}

impl Slot {
    pub fn is_hand(&self) -> bool {
        matches!(self, Slot::MainHand | Slot::OffHand)
    }

    /// Slots that take body armor
    pub fn is_body(&self) -> bool {
        matches!(
            self,
            Slot::Head | Slot::Chest | Slot::Hands | Slot::Legs | Slot::Feet
        )
    }

    /// Slots that take rings and amulets
    pub fn is_jewelry(&self) -> bool {
        matches!(self, Slot::Neck | Slot::RingLeft | Slot::RingRight)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Slot::Head => "head",
            Slot::Neck => "neck",
            Slot::Chest => "chest",
            Slot::Hands => "hands",
            Slot::Legs => "legs",
            Slot::Feet => "feet",
            Slot::RingLeft => "left ring",
            Slot::RingRight => "right ring",
            Slot::MainHand => "main hand",
            Slot::OffHand => "off hand",
        };
        write!(f, "{}", s)
    }
}

/// Weapon properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    /// Weapon category, e.g. "daggers", "swords"
    pub category: String,
    pub damage: DiceRoll,
    /// Damage when wielded in both hands
    #[serde(default)]
    pub versatile: Option<DiceRoll>,
    /// Lowest natural roll that counts as a critical
    #[serde(default = "default_crit_range")]
    pub crit_range: u32,
    #[serde(default)]
    pub damage_type: DamageType,
    #[serde(default)]
    pub finesse: bool,
    #[serde(default)]
    pub ranged: bool,
    #[serde(default)]
    pub light: bool,
    #[serde(default)]
    pub two_handed: bool,
    /// Magical bonus to attack rolls
    #[serde(default)]
    pub attack_bonus: i32,
    /// Magical bonus to damage rolls
    #[serde(default)]
    pub damage_bonus: i32,
}

fn default_crit_range() -> u32 {
    20
}

impl WeaponProfile {
    /// A mundane weapon of the given category and dice
    pub fn new(category: &str, damage: DiceRoll, damage_type: DamageType) -> Self {
        Self {
            category: category.to_string(),
            damage,
            versatile: None,
            crit_range: default_crit_range(),
            damage_type,
            finesse: false,
            ranged: false,
            light: false,
            two_handed: false,
            attack_bonus: 0,
            damage_bonus: 0,
        }
    }

    pub fn light(mut self) -> Self {
        self.light = true;
        self
    }

    pub fn finesse(mut self) -> Self {
        self.finesse = true;
        self
    }

    pub fn ranged(mut self) -> Self {
        self.ranged = true;
        self
    }

    pub fn two_handed(mut self) -> Self {
        self.two_handed = true;
        self
    }

    pub fn versatile(mut self, dice: DiceRoll) -> Self {
        self.versatile = Some(dice);
        self
    }

    pub fn crit_range(mut self, lowest: u32) -> Self {
        self.crit_range = lowest;
        self
    }

    /// Magical attack and damage bonus
    pub fn enchanted(mut self, attack_bonus: i32, damage_bonus: i32) -> Self {
        self.attack_bonus = attack_bonus;
        self.damage_bonus = damage_bonus;
        self
    }
}

/// Armor weight class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorCategory {
    Light,
    Medium,
    Heavy,
    Shield,
}

impl fmt::Display for ArmorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArmorCategory::Light => "light armor",
            ArmorCategory::Medium => "medium armor",
            ArmorCategory::Heavy => "heavy armor",
            ArmorCategory::Shield => "shields",
        };
        write!(f, "{}", s)
    }
}

/// Armor properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmorProfile {
    pub category: ArmorCategory,
    /// Mundane AC contributed by this piece
    pub base_ac: i32,
    /// Cap on the DEX modifier while this piece is worn (None = uncapped)
    #[serde(default)]
    pub max_dex_bonus: Option<i32>,
    /// Magical AC bonus
    #[serde(default)]
    pub magic_bonus: i32,
}

impl ArmorProfile {
    pub fn new(category: ArmorCategory, base_ac: i32, max_dex_bonus: Option<i32>) -> Self {
        Self {
            category,
            base_ac,
            max_dex_bonus,
            magic_bonus: 0,
        }
    }
}

/// Rings, amulets and other trinkets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JewelryProfile {
    #[serde(default)]
    pub bonus_ac: i32,
}

/// What an item is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    Weapon(WeaponProfile),
    Armor(ArmorProfile),
    Jewelry(JewelryProfile),
    Consumable,
}

/// An item occupying an equipment slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquippedItem {
    pub id: String,
    pub name: String,
    pub slot: Slot,
    pub properties: ItemKind,
    #[serde(default)]
    pub requires_attunement: bool,
    #[serde(default)]
    pub attuned: bool,
    /// Ability score bonuses while magic is active
    #[serde(default)]
    pub stat_bonuses: BTreeMap<Ability, i32>,
    /// Damage multipliers while magic is active
    #[serde(default)]
    pub resistances: BTreeMap<DamageType, f64>,
    #[serde(default)]
    pub effects: Vec<ItemEffect>,
}

impl EquippedItem {
    pub fn new(id: &str, name: &str, slot: Slot, properties: ItemKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            slot,
            properties,
            requires_attunement: false,
            attuned: false,
            stat_bonuses: BTreeMap::new(),
            resistances: BTreeMap::new(),
            effects: Vec::new(),
        }
    }

    pub fn weapon(id: &str, name: &str, profile: WeaponProfile) -> Self {
        Self::new(id, name, Slot::MainHand, ItemKind::Weapon(profile))
    }

    pub fn armor(id: &str, name: &str, slot: Slot, profile: ArmorProfile) -> Self {
        Self::new(id, name, slot, ItemKind::Armor(profile))
    }

    pub fn jewelry(id: &str, name: &str, slot: Slot, bonus_ac: i32) -> Self {
        Self::new(id, name, slot, ItemKind::Jewelry(JewelryProfile { bonus_ac }))
    }

    /// Same item destined for another slot
    pub fn in_slot(mut self, slot: Slot) -> Self {
        self.slot = slot;
        self
    }

    pub fn requiring_attunement(mut self) -> Self {
        self.requires_attunement = true;
        self
    }

    pub fn attuned(mut self) -> Self {
        self.attuned = true;
        self
    }

    pub fn with_stat_bonus(mut self, ability: Ability, bonus: i32) -> Self {
        *self.stat_bonuses.entry(ability).or_insert(0) += bonus;
        self
    }

    pub fn with_resistance(mut self, damage_type: DamageType, multiplier: f64) -> Self {
        self.resistances.insert(damage_type, multiplier);
        self
    }

    pub fn with_effect(mut self, effect: ItemEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn weapon_profile(&self) -> Option<&WeaponProfile> {
        match &self.properties {
            ItemKind::Weapon(w) => Some(w),
            _ => None,
        }
    }

    pub fn armor_profile(&self) -> Option<&ArmorProfile> {
        match &self.properties {
            ItemKind::Armor(a) => Some(a),
            _ => None,
        }
    }

    pub fn has_weapon_behavior(&self) -> bool {
        self.weapon_profile().is_some()
    }

    pub fn has_armor_behavior(&self) -> bool {
        self.armor_profile().is_some()
    }

    /// Whether magical properties apply: always for items that need no
    /// attunement, otherwise only while attuned.
    pub fn magic_active(&self) -> bool {
        !self.requires_attunement || self.attuned
    }

    /// Mundane AC from armor
    pub fn mundane_ac(&self) -> i32 {
        self.armor_profile().map_or(0, |a| a.base_ac)
    }

    /// Magical AC from armor or jewelry, zero while magic is inactive
    pub fn magic_ac(&self) -> i32 {
        if !self.magic_active() {
            return 0;
        }
        match &self.properties {
            ItemKind::Armor(a) => a.magic_bonus,
            ItemKind::Jewelry(j) => j.bonus_ac,
            _ => 0,
        }
    }
}
