//! Experience curve and kill rewards
//!
//! - `xp_for_level(L) = round(800 * L^1.6)` is the XP needed to go from L to L+1
//! - A kill is worth `0.12 * xp_for_level(mob level)`, scaled by how the
//!   mob's level compares with the player's
//! - Players who dealt at least the threshold share of a kill's damage split
//!   the reward evenly

use tracing::debug;

use crate::character::{Combatant, EntityId, Roster};
use crate::combat::Combat;

/// Fraction of a level's XP granted per kill
pub const KILL_REWARD_FRACTION: f64 = 0.12;

/// XP needed to advance from `level` to `level + 1`
pub fn xp_for_level(level: u32) -> u64 {
    (800.0 * (level.max(1) as f64).powf(1.6)).round() as u64
}

/// Cumulative XP at which a character reaches `level`
pub fn xp_to_reach(level: u32) -> u64 {
    (1..level.max(1))
        .map(xp_for_level)
        .fold(0, u64::saturating_add)
}

/// Reward scaling by level difference (mob level minus player level)
pub fn level_multiplier(mob_level: u32, player_level: u32) -> f64 {
    let diff = mob_level as i64 - player_level as i64;
    match diff {
        d if d >= 5 => 1.5,
        2..=4 => 1.2,
        -1..=1 => 1.0,
        -4..=-2 => 0.6,
        _ => 0.3,
    }
}

/// Full reward for one player killing a mob alone
pub fn kill_reward(mob_level: u32, player_level: u32) -> u64 {
    let base = KILL_REWARD_FRACTION * xp_for_level(mob_level) as f64;
    (base * level_multiplier(mob_level, player_level)).round() as u64
}

/// Whether `dealt` is at least `threshold_percent` of `total`
pub fn meets_threshold(dealt: u32, total: u32, threshold_percent: u32) -> bool {
    total > 0 && dealt > 0 && dealt as u64 * 100 >= total as u64 * threshold_percent as u64
}

/// XP owed to one player for one kill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpAward {
    pub player_id: EntityId,
    pub victim_id: EntityId,
    pub amount: u64,
}

/// Players who dealt enough of the victim's damage
pub fn eligible_players(
    combat: &Combat,
    victim_id: &str,
    roster: &Roster,
    threshold_percent: u32,
) -> Vec<EntityId> {
    let total = combat.damage_taken(victim_id);
    combat
        .contributions(victim_id)
        .into_iter()
        .filter(|(id, dealt)| {
            roster.get(id).is_some_and(|c| c.is_player())
                && meets_threshold(*dealt, total, threshold_percent)
        })
        .map(|(id, _)| id)
        .collect()
}

/// Split a kill among eligible players.
///
/// Each player's share is their own level-scaled reward divided by the number
/// of eligible players, floored.
pub fn distribute_kill_xp(
    combat: &Combat,
    victim: &Combatant,
    roster: &Roster,
    threshold_percent: u32,
) -> Vec<XpAward> {
    let eligible = eligible_players(combat, &victim.id, roster, threshold_percent);
    if eligible.is_empty() {
        return Vec::new();
    }
    let share_count = eligible.len() as u64;

    eligible
        .into_iter()
        .filter_map(|player_id| {
            let player = roster.get(&player_id)?;
            let amount = kill_reward(victim.level, player.level) / share_count;
            debug!(player = %player_id, victim = %victim.id, amount, "kill xp");
            Some(XpAward {
                player_id,
                victim_id: victim.id.clone(),
                amount,
            })
        })
        .collect()
}
