//! Triggered item effects
//!
//! Every equipped item whose magic is active contributes its effects; all
//! effects matching a trigger fire and accumulate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::character::{Combatant, EntityKind};

use super::attack::AttackResult;
use super::damage::DamageType;
use super::dice::{DiceRoll, DiceSource};

/// When an attack bonus applies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "when", content = "kind", rename_all = "snake_case")]
pub enum AttackCondition {
    #[default]
    Always,
    /// Target is at or below half HP
    TargetBloodied,
    /// Wielder is at or below half HP
    AttackerBloodied,
    /// Target is a player or an NPC
    TargetKind(EntityKind),
}

impl AttackCondition {
    pub fn holds(&self, attacker: &Combatant, defender: &Combatant) -> bool {
        match self {
            AttackCondition::Always => true,
            AttackCondition::TargetBloodied => defender.is_bloodied(),
            AttackCondition::AttackerBloodied => attacker.is_bloodied(),
            AttackCondition::TargetKind(kind) => defender.kind == *kind,
        }
    }
}

/// A magical effect carried by an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum ItemEffect {
    /// Extra damage when an attack hits
    OnHit {
        damage: DiceRoll,
        #[serde(default)]
        damage_type: DamageType,
        #[serde(default)]
        description: Option<String>,
    },
    /// Healing at the start of the wearer's turn
    StartOfTurn {
        heal: DiceRoll,
        #[serde(default)]
        in_combat_only: bool,
    },
    /// Flat bonus to attack rolls
    OnAttack {
        bonus: i32,
        #[serde(default)]
        condition: AttackCondition,
    },
}

/// Extra damage and narration from on-hit effects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnHitOutcome {
    pub extra_damage: i32,
    pub messages: Vec<String>,
}

/// Fire every on-hit effect of the attacker's active items.
///
/// Dice are doubled on critical hits, and each portion is scaled by the
/// defender's resistance to its damage type.
pub fn on_hit(
    attacker: &Combatant,
    defender: &Combatant,
    attack: &AttackResult,
    dice: &mut dyn DiceSource,
) -> OnHitOutcome {
    let mut outcome = OnHitOutcome::default();
    if !attack.hit {
        return outcome;
    }

    for item in attacker.equipment.magic_items() {
        for effect in &item.effects {
            let ItemEffect::OnHit {
                damage,
                damage_type,
                description,
            } = effect
            else {
                continue;
            };
            let rolled = damage.roll(dice, attack.critical).total.max(0);
            let dealt = defender.derived().resistances.apply(rolled, *damage_type);
            if dealt <= 0 {
                continue;
            }
            outcome.extra_damage += dealt;
            let message = match description {
                Some(text) => format!("{} ({} {} damage)", text, dealt, damage_type),
                None => format!(
                    "{}'s {} deals {} extra {} damage.",
                    attacker.name, item.name, dealt, damage_type
                ),
            };
            outcome.messages.push(message);
        }
    }

    if outcome.extra_damage > 0 {
        debug!(attacker = %attacker.id, extra = outcome.extra_damage, "on-hit effects");
    }
    outcome
}

/// Apply start-of-turn heals; healing never exceeds max HP
pub fn on_start_of_turn(
    combatant: &mut Combatant,
    in_combat: bool,
    dice: &mut dyn DiceSource,
) -> Vec<String> {
    let mut heals = Vec::new();
    for item in combatant.equipment.magic_items() {
        for effect in &item.effects {
            if let ItemEffect::StartOfTurn {
                heal,
                in_combat_only,
            } = effect
            {
                if *in_combat_only && !in_combat {
                    continue;
                }
                heals.push((item.name.clone(), *heal));
            }
        }
    }

    let mut messages = Vec::new();
    for (source, heal) in heals {
        if !combatant.is_alive() {
            break;
        }
        let amount = heal.roll(dice, false).total;
        let restored = combatant.heal(amount);
        if restored > 0 {
            messages.push(format!(
                "{}'s {} restores {} HP.",
                combatant.name, source, restored
            ));
        }
    }
    messages
}

/// Sum of conditional attack bonuses from the attacker's active items
pub fn on_attack(attacker: &Combatant, defender: &Combatant) -> i32 {
    attacker
        .equipment
        .magic_items()
        .flat_map(|item| item.effects.iter())
        .filter_map(|effect| match effect {
            ItemEffect::OnAttack { bonus, condition } if condition.holds(attacker, defender) => {
                Some(*bonus)
            }
            _ => None,
        })
        .sum()
}

/// Whether any active item carries a heal usable outside combat
pub fn regenerates_idle(combatant: &Combatant) -> bool {
    combatant.equipment.magic_items().any(|item| {
        item.effects.iter().any(|effect| {
            matches!(
                effect,
                ItemEffect::StartOfTurn {
                    in_combat_only: false,
                    ..
                }
            )
        })
    })
}
