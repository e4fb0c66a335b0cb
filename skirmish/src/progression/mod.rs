//! Character progression
//!
//! - XP curve, kill rewards and damage-share eligibility
//! - Level-ups with stat-choice cadence and a cascade guard
//! - Guild hooks that customize leveling

mod guild;
mod level;
mod xp;

pub use guild::{GuildHook, GuildHookRegistry, GuildProfile, LevelPerk};
pub use level::{
    grant_xp, hp_per_level, increase_stat, level_up, proficiency_for_level, LevelGain,
    LevelUpReport, StatChoice, StatIncrease, StatIncreaseError, MAX_ABILITY_SCORE,
    STAT_CHOICE_INTERVAL,
};
pub use xp::{
    distribute_kill_xp, eligible_players, kill_reward, level_multiplier, meets_threshold,
    xp_for_level, xp_to_reach, XpAward, KILL_REWARD_FRACTION,
};
