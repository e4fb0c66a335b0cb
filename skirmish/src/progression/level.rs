//! Level-up engine
//!
//! Each level gained:
//! - adds 5 + CON modifier to base max HP
//! - recomputes the proficiency bonus
//! - every 4th level, offers a stat increase (or lets the guild resolve it)
//! - applies guild bonuses and ability unlocks
//! - refreshes derived stats and restores HP to full

use thiserror::Error;
use tracing::{error, info};

use crate::character::{Ability, Combatant};

use super::guild::GuildHookRegistry;
use super::xp::xp_to_reach;

/// Highest base ability score reachable through stat increases
pub const MAX_ABILITY_SCORE: i32 = 20;

/// Stat increases are offered at multiples of this level
pub const STAT_CHOICE_INTERVAL: u32 = 4;

/// Proficiency bonus for a level: +2 at 1-4, +3 at 5-8, and so on
pub fn proficiency_for_level(level: u32) -> i32 {
    2 + ((level.max(1) - 1) / 4) as i32
}

/// HP gained per level
pub fn hp_per_level(con_modifier: i32) -> i32 {
    5 + con_modifier
}

/// What happened to a stat choice on reaching a level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatChoice {
    /// Not a stat-choice level
    None,
    /// Left for the player to spend
    Pending,
    /// Spent by the player's guild
    AutoResolved,
}

/// One level gained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelGain {
    pub level: u32,
    pub hp_gained: i32,
    pub stat_choice: StatChoice,
    pub messages: Vec<String>,
}

/// Result of granting XP
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelUpReport {
    pub xp_gained: u64,
    pub from_level: u32,
    pub to_level: u32,
    pub gains: Vec<LevelGain>,
    /// The cascade guard stopped further level-ups
    pub halted: bool,
}

impl LevelUpReport {
    pub fn levels_gained(&self) -> u32 {
        self.to_level - self.from_level
    }

    pub fn leveled(&self) -> bool {
        !self.gains.is_empty()
    }
}

/// Advance a combatant by exactly one level
pub fn level_up(player: &mut Combatant, hooks: &GuildHookRegistry) -> LevelGain {
    player.level += 1;
    let level = player.level;

    let hp_gained = hp_per_level(player.abilities.base_modifier(Ability::Constitution));
    player.base_max_hp += hp_gained;
    player.proficiency_bonus = proficiency_for_level(level);

    let hook = hooks.hook_for(player);
    let mut messages = vec![format!(
        "You have reached level {}! (+{} max HP)",
        level, hp_gained
    )];

    let stat_choice = if level % STAT_CHOICE_INTERVAL == 0 {
        let resolved = hook
            .as_ref()
            .is_some_and(|h| h.handle_stat_choice(player));
        if resolved {
            messages.push("Your guild training improves your abilities.".to_string());
            StatChoice::AutoResolved
        } else {
            player.progression.pending_stat_choices += 1;
            messages.push("You may increase an ability score.".to_string());
            StatChoice::Pending
        }
    } else {
        StatChoice::None
    };

    if let Some(hook) = &hook {
        messages.extend(hook.apply_level_up_bonuses(player));
        hook.grant_abilities(player);
    }

    player.refresh();
    player.restore_full();

    info!(player = %player.id, level, hp_gained, "level up");
    LevelGain {
        level,
        hp_gained,
        stat_choice,
        messages,
    }
}

/// Add XP and apply every level-up it pays for.
///
/// At most `max_cascade` levels are gained from one award; hitting the guard
/// logs an error and stops.
pub fn grant_xp(
    player: &mut Combatant,
    amount: u64,
    hooks: &GuildHookRegistry,
    max_cascade: u32,
) -> LevelUpReport {
    player.progression.xp = player.progression.xp.saturating_add(amount);
    let mut report = LevelUpReport {
        xp_gained: amount,
        from_level: player.level,
        to_level: player.level,
        ..Default::default()
    };

    while player.progression.xp >= xp_to_reach(player.level + 1) {
        if report.gains.len() as u32 >= max_cascade {
            error!(
                player = %player.id,
                xp = player.progression.xp,
                level = player.level,
                "level-up cascade exceeded {} levels, stopping",
                max_cascade
            );
            report.halted = true;
            break;
        }
        report.gains.push(level_up(player, hooks));
    }

    report.to_level = player.level;
    report
}

/// Failure of a manual stat increase; nothing is changed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatIncreaseError {
    #[error("unknown ability: {0}")]
    UnknownStat(String),

    #[error("no ability score increases available")]
    NoPendingChoice,

    #[error("{0} is already at the maximum of 20")]
    AtMaximum(Ability),

    #[error("unknown player: {0}")]
    UnknownPlayer(String),
}

/// A successful manual stat increase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatIncrease {
    pub ability: Ability,
    pub old_score: i32,
    pub new_score: i32,
    pub remaining_choices: u32,
}

/// Spend a pending stat choice on an ability (short or long name)
pub fn increase_stat(player: &mut Combatant, name: &str) -> Result<StatIncrease, StatIncreaseError> {
    let ability: Ability = name
        .parse()
        .map_err(|_| StatIncreaseError::UnknownStat(name.to_string()))?;
    if player.progression.pending_stat_choices == 0 {
        return Err(StatIncreaseError::NoPendingChoice);
    }
    let old_score = player.abilities.base_score(ability);
    if old_score >= MAX_ABILITY_SCORE {
        return Err(StatIncreaseError::AtMaximum(ability));
    }

    let new_score = player.abilities.increase_base(ability, 1);
    player.progression.pending_stat_choices -= 1;
    player.refresh();

    Ok(StatIncrease {
        ability,
        old_score,
        new_score,
        remaining_choices: player.progression.pending_stat_choices,
    })
}
