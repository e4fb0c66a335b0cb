//! Attack roll resolution
//!
//! One d20 (two under advantage or disadvantage) against the defender's AC:
//! - A natural 1 always misses
//! - A natural roll at or above the weapon's crit range always hits critically
//! - Otherwise the attack hits when the total meets or beats AC

use tracing::debug;

use crate::character::{Ability, Combatant};
use crate::config::EngineConfig;
use crate::equipment::{self, Hand};

use super::damage::DamageResult;
use super::dice::DiceSource;
use super::magic;
use super::state::Participant;

/// How many d20s are rolled and which one counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollMode {
    Normal,
    Advantage,
    Disadvantage,
}

impl RollMode {
    /// Advantage and disadvantage cancel pairwise
    pub fn from_counts(advantage: u32, disadvantage: u32) -> Self {
        match advantage.cmp(&disadvantage) {
            std::cmp::Ordering::Greater => RollMode::Advantage,
            std::cmp::Ordering::Less => RollMode::Disadvantage,
            std::cmp::Ordering::Equal => RollMode::Normal,
        }
    }

    /// Roll the d20s for this mode; returns the chosen face and every face rolled
    pub fn roll(&self, dice: &mut dyn DiceSource) -> (u32, Vec<u32>) {
        match self {
            RollMode::Normal => {
                let face = dice.roll_die(20);
                (face, vec![face])
            }
            RollMode::Advantage => {
                let (a, b) = (dice.roll_die(20), dice.roll_die(20));
                (a.max(b), vec![a, b])
            }
            RollMode::Disadvantage => {
                let (a, b) = (dice.roll_die(20), dice.roll_die(20));
                (a.min(b), vec![a, b])
            }
        }
    }
}

impl std::fmt::Display for RollMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollMode::Normal => write!(f, "normal"),
            RollMode::Advantage => write!(f, "advantage"),
            RollMode::Disadvantage => write!(f, "disadvantage"),
        }
    }
}

/// Terms added to the natural roll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttackBonus {
    pub ability: i32,
    /// Proficiency bonus, or the untrained penalty
    pub proficiency: i32,
    /// Weapon enchantment (only while its magic is active)
    pub magic: i32,
    /// Conditional bonuses from item effects
    pub effects: i32,
}

impl AttackBonus {
    pub fn total(&self) -> i32 {
        self.ability + self.proficiency + self.magic + self.effects
    }
}

/// Outcome of one attack
#[derive(Debug, Clone, PartialEq)]
pub struct AttackResult {
    pub hand: Hand,
    /// Name of the weapon used ("unarmed strike" without one)
    pub weapon: String,
    pub hit: bool,
    pub critical: bool,
    pub fumble: bool,
    /// The d20 face that counted
    pub natural: u32,
    /// Every d20 rolled
    pub rolls: Vec<u32>,
    pub mode: RollMode,
    pub bonus: AttackBonus,
    pub total: i32,
    pub target_ac: i32,
    /// Filled in once damage has been resolved
    pub damage: Option<DamageResult>,
}

impl AttackResult {
    /// A hit with no roll detail, for resolving damage directly
    pub fn landed(hand: Hand, critical: bool) -> Self {
        Self {
            hand,
            weapon: String::new(),
            hit: true,
            critical,
            fumble: false,
            natural: if critical { 20 } else { 10 },
            rolls: Vec::new(),
            mode: RollMode::Normal,
            bonus: AttackBonus::default(),
            total: 0,
            target_ac: 0,
            damage: None,
        }
    }

    pub fn damage_dealt(&self) -> i32 {
        self.damage.as_ref().map_or(0, |d| d.damage)
    }
}

/// Attack bonus of a combatant's hand against a defender
pub fn attack_bonus(
    attacker: &Combatant,
    defender: &Combatant,
    hand: Hand,
    config: &EngineConfig,
) -> AttackBonus {
    let weapon = equipment::wielded(attacker, hand);
    AttackBonus {
        ability: equipment::weapon_ability_modifier(attacker, weapon.as_ref().map(|w| w.profile)),
        proficiency: equipment::attack_proficiency(attacker, hand, config.non_proficiency_penalty),
        magic: weapon.as_ref().map_or(0, |w| w.attack_bonus()),
        effects: magic::on_attack(attacker, defender),
    }
}

/// Resolve one attack roll.
///
/// The roll mode comes from the attacker's participant counts. The natural
/// roll used for critical and fumble checks is the chosen die.
pub fn resolve_attack(
    attacker: &Combatant,
    defender: &Combatant,
    participant: &Participant,
    hand: Hand,
    config: &EngineConfig,
    dice: &mut dyn DiceSource,
) -> AttackResult {
    let weapon = equipment::wielded(attacker, hand);
    let weapon_name = weapon
        .as_ref()
        .map_or_else(|| "unarmed strike".to_string(), |w| w.name.to_string());
    let crit_range = weapon
        .as_ref()
        .map_or(20, |w| w.profile.crit_range.clamp(2, 20));

    let mode = participant.roll_mode();
    let (natural, rolls) = mode.roll(dice);
    let bonus = attack_bonus(attacker, defender, hand, config);
    let total = natural as i32 + bonus.total();
    let target_ac = defender.armor_class();

    let fumble = natural == 1;
    let critical = !fumble && natural >= crit_range;
    let hit = !fumble && (critical || total >= target_ac);

    debug!(
        attacker = %attacker.id,
        defender = %defender.id,
        %hand,
        %mode,
        natural,
        total,
        target_ac,
        hit,
        critical,
        "attack rolled"
    );

    AttackResult {
        hand,
        weapon: weapon_name,
        hit,
        critical,
        fumble,
        natural,
        rolls,
        mode,
        bonus,
        total,
        target_ac,
        damage: None,
    }
}

/// Initiative roll: d20 + DEX modifier
pub fn roll_initiative(combatant: &Combatant, dice: &mut dyn DiceSource) -> i32 {
    dice.roll_die(20) as i32 + combatant.abilities.modifier(Ability::Dexterity)
}
