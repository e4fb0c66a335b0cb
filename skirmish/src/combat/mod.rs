//! Combat system module
//!
//! Implements D&D-style combat with:
//! - Dice rolling (e.g., "2d6+3") from an injectable source
//! - Attack resolution with advantage, criticals and fumbles
//! - Damage types with multiplicative resistances
//! - Triggered item magic (on hit, start of turn, on attack)
//! - Status effects (stunned, blinded, etc.)
//! - The combat registry and per-round orchestration

mod attack;
mod damage;
mod dice;
mod effects;
mod magic;
mod round;
mod state;

pub use attack::{attack_bonus, resolve_attack, roll_initiative, AttackBonus, AttackResult, RollMode};
pub use damage::{
    combine_multipliers, resolve_damage, DamageBreakdown, DamageModifier, DamageResult, DamageType,
    Resistances, MIN_RESISTANCE_MULTIPLIER,
};
pub use dice::{
    is_critical, is_fumble, parse_dice, roll_d20, roll_notation, DiceError, DiceOutcome, DiceRoll,
    DiceSource, RngDice, ScriptedDice, MAX_DICE_COUNT, MAX_DIE_SIDES,
};
pub use effects::{ActiveEffects, EffectType, StatusEffect};
pub use magic::{on_attack, on_hit, on_start_of_turn, regenerates_idle, AttackCondition, ItemEffect, OnHitOutcome};
pub use round::{
    check_outcome, run_round, ActionKind, ActionRecord, CombatOutcome, RoundContext, RoundReport,
};
pub use state::{Combat, CombatId, CombatPhase, CombatRegistry, EngageError, Engagement, Participant};
