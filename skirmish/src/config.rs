//! Engine configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `SKIRMISH_`-prefixed environment variables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::DiceRoll;
use crate::progression::GuildProfile;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SKIRMISH_";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),

    #[error(transparent)]
    Figment(#[from] figment::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunable rules of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Time between combat rounds
    pub round_interval_ms: u64,
    /// Attack penalty for untrained weapons or armor
    pub non_proficiency_penalty: i32,
    /// Damage of a strike with no weapon
    pub unarmed_damage: DiceRoll,
    pub max_attuned_items: usize,
    /// Most level-ups a single XP award may trigger
    pub max_cascade_levels: u32,
    /// Share of a kill's damage needed for XP, in percent
    pub xp_share_threshold_percent: u32,
    /// Heal out-of-combat characters from their items each tick
    pub idle_regeneration: bool,
    /// Data-driven guild hooks by guild id
    pub guilds: BTreeMap<String, GuildProfile>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            round_interval_ms: 3000,
            non_proficiency_penalty: 2,
            unarmed_damage: DiceRoll::new(1, 4, 0),
            max_attuned_items: 3,
            max_cascade_levels: 10,
            xp_share_threshold_percent: 10,
            idle_regeneration: true,
            guilds: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Figment with every layer for an optional config file
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load configuration; an explicitly named file must exist
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
        }
        let config: EngineConfig = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.round_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "round_interval_ms must be positive".to_string(),
            ));
        }
        if self.max_cascade_levels == 0 {
            return Err(ConfigError::Invalid(
                "max_cascade_levels must be positive".to_string(),
            ));
        }
        if self.xp_share_threshold_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "xp_share_threshold_percent must be at most 100, got {}",
                self.xp_share_threshold_percent
            )));
        }
        if self.non_proficiency_penalty < 0 {
            return Err(ConfigError::Invalid(
                "non_proficiency_penalty cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn round_interval(&self) -> Duration {
        Duration::from_millis(self.round_interval_ms)
    }
}
