//! Guild hooks
//!
//! A guild can customize leveling: resolve stat choices automatically, grant
//! flat bonuses and unlock abilities. Players without a guild, or whose guild
//! has no hook, simply make their own stat choices.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::character::{Ability, Combatant};

use super::level::MAX_ABILITY_SCORE;

/// Per-guild leveling behavior
pub trait GuildHook: Send + Sync {
    /// Resolve a stat-increase choice; returning true suppresses the
    /// player-facing prompt
    fn handle_stat_choice(&self, _player: &mut Combatant) -> bool {
        false
    }

    /// Apply flat bonuses for the player's new level, returning narration
    fn apply_level_up_bonuses(&self, _player: &mut Combatant) -> Vec<String> {
        Vec::new()
    }

    /// Unlock abilities for the player's new level
    fn grant_abilities(&self, _player: &mut Combatant) {}
}

/// Rewards granted on reaching a level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPerk {
    pub level: u32,
    #[serde(default)]
    pub max_hp: i32,
    #[serde(default)]
    pub armor_class: i32,
    #[serde(default)]
    pub abilities: Vec<String>,
}

/// Data-driven guild hook loaded from configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildProfile {
    /// Stat choices raise this ability by 2 instead of prompting
    #[serde(default)]
    pub primary_ability: Option<Ability>,
    #[serde(default)]
    pub perks: Vec<LevelPerk>,
}

impl GuildProfile {
    fn perks_at(&self, level: u32) -> impl Iterator<Item = &LevelPerk> {
        self.perks.iter().filter(move |p| p.level == level)
    }
}

impl GuildHook for GuildProfile {
    fn handle_stat_choice(&self, player: &mut Combatant) -> bool {
        let Some(ability) = self.primary_ability else {
            return false;
        };
        let current = player.abilities.base_score(ability);
        if current >= MAX_ABILITY_SCORE {
            return false;
        }
        let amount = (MAX_ABILITY_SCORE - current).min(2);
        player.abilities.increase_base(ability, amount);
        true
    }

    fn apply_level_up_bonuses(&self, player: &mut Combatant) -> Vec<String> {
        let mut messages = Vec::new();
        for perk in self.perks_at(player.level) {
            if perk.max_hp != 0 {
                player.progression.bonus_max_hp += perk.max_hp;
                messages.push(format!("Your guild grants you {:+} maximum HP.", perk.max_hp));
            }
            if perk.armor_class != 0 {
                player.progression.bonus_armor_class += perk.armor_class;
                messages.push(format!("Your guild grants you {:+} armor class.", perk.armor_class));
            }
        }
        messages
    }

    fn grant_abilities(&self, player: &mut Combatant) {
        let unlocked: Vec<String> = self
            .perks_at(player.level)
            .flat_map(|p| p.abilities.iter().cloned())
            .collect();
        for ability in unlocked {
            if !player.progression.unlocked_abilities.contains(&ability) {
                player.progression.unlocked_abilities.push(ability);
            }
        }
    }
}

/// Guild hooks by guild id
#[derive(Clone, Default)]
pub struct GuildHookRegistry {
    hooks: HashMap<String, Arc<dyn GuildHook>>,
}

impl std::fmt::Debug for GuildHookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&String> = self.hooks.keys().collect();
        ids.sort();
        f.debug_struct("GuildHookRegistry").field("guilds", &ids).finish()
    }
}

impl GuildHookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with data-driven profiles
    pub fn from_profiles(profiles: &BTreeMap<String, GuildProfile>) -> Self {
        let mut registry = Self::new();
        for (id, profile) in profiles {
            registry.register(id, Arc::new(profile.clone()));
        }
        registry
    }

    /// Register (or replace) the hook for a guild
    pub fn register(&mut self, guild_id: &str, hook: Arc<dyn GuildHook>) {
        self.hooks.insert(guild_id.to_lowercase(), hook);
    }

    pub fn get(&self, guild_id: &str) -> Option<Arc<dyn GuildHook>> {
        self.hooks.get(&guild_id.to_lowercase()).cloned()
    }

    /// Hook for a player's guild, if any
    pub fn hook_for(&self, player: &Combatant) -> Option<Arc<dyn GuildHook>> {
        player
            .progression
            .guild
            .as_deref()
            .and_then(|guild| self.get(guild))
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
