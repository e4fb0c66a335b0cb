//! Equipment: items, slots, proficiency and derived combat stats
//!
//! Provides:
//! - Item definitions (weapon, armor and jewelry profiles)
//! - The slot container with legality and attunement rules
//! - Proficiency checks with group subsumption
//! - Aggregate armor class and derived-stat refresh

mod item;
mod loadout;
mod proficiency;
mod stats;

pub use item::{
    ArmorCategory, ArmorProfile, EquippedItem, ItemKind, JewelryProfile, Slot, WeaponProfile,
};
pub use loadout::{EquipError, Equipment};
pub use proficiency::{weapon_group, Proficiencies, ProficiencyCheck, MARTIAL_WEAPONS, SIMPLE_WEAPONS};
pub use stats::{
    armor_penalty, attack_proficiency, can_dual_wield, check_proficiency, compute_armor_class,
    compute_max_hp, effective_resistances, refresh_derived, stat_bonuses, weapon_ability_modifier,
    wielded, AcBreakdown, ArmorClass, Hand, Wielded, BASE_ARMOR_CLASS,
};
