//! Damage types, resistances and damage resolution
//!
//! Handles damage calculation with:
//! - Multiple damage types (fire, cold, poison, etc.)
//! - Multiplicative resistance stacking floored at 0.25 (75% reduction)
//! - Critical hits that double the dice pool but not flat modifiers
//! - A minimum of 1 damage on any hit

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::character::Combatant;
use crate::config::EngineConfig;
use crate::equipment::{self, Hand};

use super::attack::AttackResult;
use super::dice::{DiceRoll, DiceSource};

/// Lowest combined damage multiplier a defender can reach
pub const MIN_RESISTANCE_MULTIPLIER: f64 = 0.25;

/// Types of damage
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    /// Untyped physical damage
    Physical,
    /// Slashing damage (swords, claws)
    Slashing,
    /// Piercing damage (arrows, spears)
    Piercing,
    /// Bludgeoning damage (maces, fists)
    #[default]
    Bludgeoning,
    Fire,
    Cold,
    Lightning,
    Acid,
    Poison,
    Necrotic,
    Radiant,
    Psychic,
    Force,
    Thunder,
}

impl DamageType {
    /// Get all damage types
    pub fn all() -> &'static [DamageType] {
        &[
            DamageType::Physical,
            DamageType::Slashing,
            DamageType::Piercing,
            DamageType::Bludgeoning,
            DamageType::Fire,
            DamageType::Cold,
            DamageType::Lightning,
            DamageType::Acid,
            DamageType::Poison,
            DamageType::Necrotic,
            DamageType::Radiant,
            DamageType::Psychic,
            DamageType::Force,
            DamageType::Thunder,
        ]
    }
}

impl FromStr for DamageType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "physical" => Ok(DamageType::Physical),
            "slashing" => Ok(DamageType::Slashing),
            "piercing" => Ok(DamageType::Piercing),
            "bludgeoning" => Ok(DamageType::Bludgeoning),
            "fire" => Ok(DamageType::Fire),
            "cold" | "ice" => Ok(DamageType::Cold),
            "lightning" | "electric" => Ok(DamageType::Lightning),
            "acid" => Ok(DamageType::Acid),
            "poison" => Ok(DamageType::Poison),
            "necrotic" | "death" => Ok(DamageType::Necrotic),
            "radiant" | "holy" => Ok(DamageType::Radiant),
            "psychic" | "mental" => Ok(DamageType::Psychic),
            "force" | "magic" => Ok(DamageType::Force),
            "thunder" | "sonic" => Ok(DamageType::Thunder),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for DamageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DamageType::Physical => "physical",
            DamageType::Slashing => "slashing",
            DamageType::Piercing => "piercing",
            DamageType::Bludgeoning => "bludgeoning",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Lightning => "lightning",
            DamageType::Acid => "acid",
            DamageType::Poison => "poison",
            DamageType::Necrotic => "necrotic",
            DamageType::Radiant => "radiant",
            DamageType::Psychic => "psychic",
            DamageType::Force => "force",
            DamageType::Thunder => "thunder",
        };
        write!(f, "{}", s)
    }
}

/// Common resistance presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageModifier {
    /// Takes 50% damage
    Resistant,
    /// Takes 100% damage
    Normal,
    /// Takes 200% damage
    Vulnerable,
}

impl DamageModifier {
    pub fn multiplier(&self) -> f64 {
        match self {
            DamageModifier::Resistant => 0.5,
            DamageModifier::Normal => 1.0,
            DamageModifier::Vulnerable => 2.0,
        }
    }

    /// Classify a combined multiplier
    pub fn classify(multiplier: f64) -> Self {
        if multiplier < 1.0 {
            DamageModifier::Resistant
        } else if multiplier > 1.0 {
            DamageModifier::Vulnerable
        } else {
            DamageModifier::Normal
        }
    }
}

/// Product of multipliers, floored at [`MIN_RESISTANCE_MULTIPLIER`]
pub fn combine_multipliers(multipliers: impl IntoIterator<Item = f64>) -> f64 {
    multipliers
        .into_iter()
        .product::<f64>()
        .max(MIN_RESISTANCE_MULTIPLIER)
}

/// Damage multipliers per type (missing types take normal damage)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resistances(BTreeMap<DamageType, f64>);

impl Resistances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the multiplier for a type
    pub fn set(&mut self, damage_type: DamageType, multiplier: f64) {
        if multiplier == 1.0 {
            self.0.remove(&damage_type);
        } else {
            self.0.insert(damage_type, multiplier);
        }
    }

    /// Stack another multiplier onto a type
    pub fn stack(&mut self, damage_type: DamageType, multiplier: f64) {
        let current = self.0.get(&damage_type).copied().unwrap_or(1.0);
        self.set(damage_type, current * multiplier);
    }

    /// Effective multiplier for a type, never below the floor
    pub fn multiplier(&self, damage_type: DamageType) -> f64 {
        let raw = self.0.get(&damage_type).copied().unwrap_or(1.0);
        raw.max(MIN_RESISTANCE_MULTIPLIER)
    }

    pub fn modifier(&self, damage_type: DamageType) -> DamageModifier {
        DamageModifier::classify(self.multiplier(damage_type))
    }

    /// Scale an amount by the multiplier for its type, flooring the result
    pub fn apply(&self, amount: i32, damage_type: DamageType) -> i32 {
        (amount as f64 * self.multiplier(damage_type)).floor() as i32
    }

    pub fn iter(&self) -> impl Iterator<Item = (DamageType, f64)> + '_ {
        self.0.iter().map(|(t, m)| (*t, *m))
    }
}

/// How a damage total was built
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DamageBreakdown {
    /// Dice expression used (before doubling)
    pub dice: Option<DiceRoll>,
    pub faces: Vec<u32>,
    /// Dice plus the expression's flat modifier
    pub dice_total: i32,
    pub ability_modifier: i32,
    pub magic_bonus: i32,
    /// Total before resistances
    pub raw: i32,
    pub multiplier: f64,
}

/// Final damage of one hit
#[derive(Debug, Clone, PartialEq)]
pub struct DamageResult {
    pub damage: i32,
    pub damage_type: DamageType,
    pub critical: bool,
    pub breakdown: DamageBreakdown,
}

impl DamageResult {
    /// No damage (the attack missed)
    pub fn none(damage_type: DamageType) -> Self {
        Self {
            damage: 0,
            damage_type,
            critical: false,
            breakdown: DamageBreakdown {
                multiplier: 1.0,
                ..Default::default()
            },
        }
    }
}

/// Resolve the damage of an attack made with one hand.
///
/// Uses the wielded weapon's dice (versatile dice when two-handing), a
/// natural weapon, or the unarmed baseline. Off-hand attacks omit the
/// ability modifier. Magical bonuses apply only while the weapon's magic is
/// active. A hit always deals at least 1.
pub fn resolve_damage(
    attacker: &Combatant,
    defender: &Combatant,
    attack: &AttackResult,
    hand: Hand,
    config: &EngineConfig,
    dice: &mut dyn DiceSource,
) -> DamageResult {
    let weapon = equipment::wielded(attacker, hand);
    let (roll, damage_type, magic_bonus) = match &weapon {
        Some(w) => (w.damage_dice(), w.profile.damage_type, w.damage_bonus()),
        None => (config.unarmed_damage, DamageType::Bludgeoning, 0),
    };

    if !attack.hit {
        return DamageResult::none(damage_type);
    }

    let ability_modifier = match hand {
        Hand::Main => equipment::weapon_ability_modifier(attacker, weapon.as_ref().map(|w| w.profile)),
        Hand::Off => 0,
    };

    let outcome = roll.roll(dice, attack.critical);
    let raw = outcome.total + ability_modifier + magic_bonus;
    let multiplier = defender.derived().resistances.multiplier(damage_type);
    let scaled = (raw as f64 * multiplier).floor() as i32;
    let damage = scaled.max(1);

    debug!(
        attacker = %attacker.id,
        defender = %defender.id,
        %hand,
        dice = %roll,
        raw,
        multiplier,
        damage,
        critical = attack.critical,
        "damage resolved"
    );

    DamageResult {
        damage,
        damage_type,
        critical: attack.critical,
        breakdown: DamageBreakdown {
            dice: Some(roll),
            faces: outcome.faces,
            dice_total: outcome.total,
            ability_modifier,
            magic_bonus,
            raw,
            multiplier,
        },
    }
}
