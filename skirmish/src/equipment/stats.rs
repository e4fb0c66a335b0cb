//! Equipment-derived combat statistics
//!
//! Armor class aggregates every worn armor piece:
//!
//! ```text
//! AC = 10 + sum(base AC of worn armor)
//!         + min(DEX mod, strictest max-DEX cap among worn armor)
//!         + sum(magical AC of items whose magic is active)
//!         + guild-granted AC
//! ```
//!
//! Items that require attunement keep their mundane contribution while
//! unattuned but lose every magical term.

use std::collections::BTreeMap;

use crate::character::{Ability, Combatant, DerivedStats, EntityKind};
use crate::combat::{DiceRoll, Resistances};

use super::item::{EquippedItem, ItemKind, WeaponProfile};
use super::proficiency::ProficiencyCheck;

/// AC before any armor
pub const BASE_ARMOR_CLASS: i32 = 10;

/// Which hand an attack is made with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Main,
    Off,
}

impl std::fmt::Display for Hand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hand::Main => write!(f, "main hand"),
            Hand::Off => write!(f, "off hand"),
        }
    }
}

/// Components of an armor class total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcBreakdown {
    pub base: i32,
    /// Sum of mundane armor AC
    pub armor: i32,
    /// DEX modifier after the cap
    pub dex_modifier: i32,
    /// Strictest max-DEX cap among worn armor
    pub dex_cap: Option<i32>,
    /// Magical AC from active items
    pub magic: i32,
    /// Flat AC granted by guild bonuses
    pub granted: i32,
}

/// Armor class with its breakdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArmorClass {
    pub total: i32,
    pub breakdown: AcBreakdown,
}

/// Compute aggregate armor class from worn items and effective DEX
pub fn compute_armor_class(combatant: &Combatant) -> ArmorClass {
    let mut armor = 0;
    let mut dex_cap: Option<i32> = None;
    let mut magic = 0;

    for item in combatant.equipment.iter() {
        if let Some(profile) = item.armor_profile() {
            armor += profile.base_ac;
            if let Some(cap) = profile.max_dex_bonus {
                dex_cap = Some(dex_cap.map_or(cap, |current| current.min(cap)));
            }
        }
        magic += item.magic_ac();
    }

    let dex = combatant.abilities.modifier(Ability::Dexterity);
    let dex_modifier = match dex_cap {
        Some(cap) => dex.min(cap),
        None => dex,
    };
    let granted = combatant.progression.bonus_armor_class;

    let breakdown = AcBreakdown {
        base: BASE_ARMOR_CLASS,
        armor,
        dex_modifier,
        dex_cap,
        magic,
        granted,
    };
    ArmorClass {
        total: BASE_ARMOR_CLASS + armor + dex_modifier + magic + granted,
        breakdown,
    }
}

/// Whether the combatant is trained with an item.
///
/// NPCs are proficient with everything they carry. Jewelry and consumables
/// need no training.
pub fn check_proficiency(combatant: &Combatant, item: &EquippedItem, penalty: i32) -> ProficiencyCheck {
    if combatant.kind == EntityKind::Npc {
        return ProficiencyCheck::proficient();
    }
    let proficient = match &item.properties {
        ItemKind::Weapon(weapon) => combatant.proficiencies.covers_weapon(&weapon.category),
        ItemKind::Armor(armor) => combatant.proficiencies.covers_armor(armor.category),
        ItemKind::Jewelry(_) | ItemKind::Consumable => true,
    };
    if proficient {
        ProficiencyCheck::proficient()
    } else {
        ProficiencyCheck::lacking(penalty)
    }
}

/// Penalty for wearing any armor the combatant is not trained in
pub fn armor_penalty(combatant: &Combatant, penalty: i32) -> i32 {
    let untrained = combatant
        .equipment
        .iter()
        .filter(|item| item.has_armor_behavior())
        .any(|item| !check_proficiency(combatant, item, penalty).is_proficient);
    if untrained {
        penalty
    } else {
        0
    }
}

/// Both hands hold light weapons
pub fn can_dual_wield(combatant: &Combatant) -> bool {
    match (
        combatant.equipment.main_hand_weapon(),
        combatant.equipment.off_hand_weapon(),
    ) {
        (Some(main), Some(off)) => main.light && off.light,
        _ => false,
    }
}

/// Ability modifier for attacks and damage with a weapon.
///
/// Finesse weapons use the better of STR and DEX, ranged weapons use DEX,
/// everything else (including unarmed strikes) uses STR.
pub fn weapon_ability_modifier(combatant: &Combatant, weapon: Option<&WeaponProfile>) -> i32 {
    let str_mod = combatant.abilities.modifier(Ability::Strength);
    let dex_mod = combatant.abilities.modifier(Ability::Dexterity);
    match weapon {
        Some(w) if w.ranged => dex_mod,
        Some(w) if w.finesse => str_mod.max(dex_mod),
        _ => str_mod,
    }
}

/// A weapon in hand, with the context needed to use it
#[derive(Debug, Clone, Copy)]
pub struct Wielded<'a> {
    pub name: &'a str,
    pub profile: &'a WeaponProfile,
    /// Magical bonuses apply
    pub magic_active: bool,
    /// Held in both hands (two-handed, or versatile with a free off hand)
    pub two_handing: bool,
    /// The weapon is an equipped item rather than a natural attack
    pub equipped: bool,
}

impl Wielded<'_> {
    /// Damage dice for this grip
    pub fn damage_dice(&self) -> DiceRoll {
        match self.profile.versatile {
            Some(versatile) if self.two_handing => versatile,
            _ => self.profile.damage,
        }
    }

    pub fn attack_bonus(&self) -> i32 {
        if self.magic_active {
            self.profile.attack_bonus
        } else {
            0
        }
    }

    pub fn damage_bonus(&self) -> i32 {
        if self.magic_active {
            self.profile.damage_bonus
        } else {
            0
        }
    }
}

/// The weapon used by a hand, if any. The main hand falls back to a natural
/// weapon; `None` means an unarmed strike.
pub fn wielded(combatant: &Combatant, hand: Hand) -> Option<Wielded<'_>> {
    match hand {
        Hand::Main => {
            if let Some(item) = combatant.equipment.main_hand() {
                if let Some(profile) = item.weapon_profile() {
                    let off_hand_free = combatant.equipment.off_hand().is_none();
                    return Some(Wielded {
                        name: &item.name,
                        profile,
                        magic_active: item.magic_active(),
                        two_handing: profile.two_handed
                            || (profile.versatile.is_some() && off_hand_free),
                        equipped: true,
                    });
                }
            }
            combatant.natural_weapon.as_ref().map(|profile| Wielded {
                name: &profile.category,
                profile,
                magic_active: true,
                two_handing: false,
                equipped: false,
            })
        }
        Hand::Off => {
            let item = combatant.equipment.off_hand()?;
            let profile = item.weapon_profile()?;
            Some(Wielded {
                name: &item.name,
                profile,
                magic_active: item.magic_active(),
                two_handing: false,
                equipped: true,
            })
        }
    }
}

/// Proficiency term of an attack roll: the proficiency bonus when trained
/// with the weapon, otherwise minus the penalty; untrained armor costs the
/// penalty again.
pub fn attack_proficiency(combatant: &Combatant, hand: Hand, penalty: i32) -> i32 {
    let trained = match hand {
        Hand::Main => combatant.equipment.main_hand(),
        Hand::Off => combatant.equipment.off_hand(),
    }
    .filter(|item| item.has_weapon_behavior())
    .is_none_or(|item| check_proficiency(combatant, item, penalty).is_proficient);

    let weapon_term = if trained {
        combatant.proficiency_bonus
    } else {
        -penalty
    };
    weapon_term - armor_penalty(combatant, penalty)
}

/// Ability bonuses from items whose magic is active
pub fn stat_bonuses(combatant: &Combatant) -> BTreeMap<Ability, i32> {
    let mut bonuses = BTreeMap::new();
    for item in combatant.equipment.magic_items() {
        for (ability, bonus) in &item.stat_bonuses {
            *bonuses.entry(*ability).or_insert(0) += bonus;
        }
    }
    bonuses
}

/// Innate resistances stacked with those of active items
pub fn effective_resistances(combatant: &Combatant) -> Resistances {
    let mut resistances = combatant.resistances.clone();
    for item in combatant.equipment.magic_items() {
        for (damage_type, multiplier) in &item.resistances {
            resistances.stack(*damage_type, *multiplier);
        }
    }
    resistances
}

/// Max HP from base HP, guild bonuses and any CON change from equipment
pub fn compute_max_hp(combatant: &Combatant) -> i32 {
    let con_delta = combatant.abilities.modifier(Ability::Constitution)
        - combatant.abilities.base_modifier(Ability::Constitution);
    let max = combatant.base_max_hp
        + combatant.progression.bonus_max_hp
        + combatant.level as i32 * con_delta;
    max.max(1)
}

/// Rebuild effective abilities, AC, resistances and max HP
pub fn refresh_derived(combatant: &mut Combatant) {
    let bonuses = stat_bonuses(combatant);
    combatant.abilities.apply_bonuses(&bonuses);

    let derived = DerivedStats {
        armor_class: compute_armor_class(combatant),
        resistances: effective_resistances(combatant),
        max_hp: compute_max_hp(combatant),
    };
    combatant.set_derived(derived);
}
