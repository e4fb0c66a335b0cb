//! Status effects
//!
//! Temporary conditions on combat participants:
//! - Stunned and paralyzed participants lose their turn
//! - Effects may grant advantage or disadvantage on attacks
//! - Durations count down once per round; effects at or below zero expire

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Types of status effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectType {
    /// Cannot act
    Stunned,
    /// Cannot move or act
    Paralyzed,
    /// Attacks at disadvantage
    Blinded,
    /// Attacks at disadvantage
    Poisoned,
    /// Attacks at disadvantage
    Frightened,
    /// Attacks at disadvantage
    Restrained,
    /// Attacks at advantage
    Invisible,
    /// Attacks at advantage
    Inspired,
}

impl FromStr for EffectType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stunned" | "stun" => Ok(EffectType::Stunned),
            "paralyzed" | "paralyze" => Ok(EffectType::Paralyzed),
            "blinded" | "blind" => Ok(EffectType::Blinded),
            "poisoned" | "poison" => Ok(EffectType::Poisoned),
            "frightened" | "fear" => Ok(EffectType::Frightened),
            "restrained" | "restrain" => Ok(EffectType::Restrained),
            "invisible" | "invis" => Ok(EffectType::Invisible),
            "inspired" | "inspire" => Ok(EffectType::Inspired),
            _ => Err(()),
        }
    }
}

impl EffectType {
    /// Whether this effect prevents actions
    pub fn prevents_action(&self) -> bool {
        matches!(self, EffectType::Stunned | EffectType::Paralyzed)
    }

    /// Whether this effect grants advantage on the bearer's attacks by default
    pub fn grants_advantage(&self) -> bool {
        matches!(self, EffectType::Invisible | EffectType::Inspired)
    }

    /// Whether this effect imposes disadvantage on the bearer's attacks by default
    pub fn grants_disadvantage(&self) -> bool {
        matches!(
            self,
            EffectType::Blinded
                | EffectType::Poisoned
                | EffectType::Frightened
                | EffectType::Restrained
        )
    }
}

impl std::fmt::Display for EffectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EffectType::Stunned => "stunned",
            EffectType::Paralyzed => "paralyzed",
            EffectType::Blinded => "blinded",
            EffectType::Poisoned => "poisoned",
            EffectType::Frightened => "frightened",
            EffectType::Restrained => "restrained",
            EffectType::Invisible => "invisible",
            EffectType::Inspired => "inspired",
        };
        write!(f, "{}", s)
    }
}

/// A status effect instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub effect_type: EffectType,
    /// Rounds left; removed once this reaches zero
    pub remaining_rounds: i32,
    /// Who applied this effect
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub grant_advantage: bool,
    #[serde(default)]
    pub grant_disadvantage: bool,
}

impl StatusEffect {
    /// Create an effect with the default advantage flags for its type
    pub fn new(effect_type: EffectType, rounds: i32) -> Self {
        Self {
            effect_type,
            remaining_rounds: rounds,
            source_id: None,
            grant_advantage: effect_type.grants_advantage(),
            grant_disadvantage: effect_type.grants_disadvantage(),
        }
    }

    /// Set the source of this effect
    pub fn with_source(mut self, source_id: &str) -> Self {
        self.source_id = Some(source_id.to_string());
        self
    }

    pub fn granting_advantage(mut self) -> Self {
        self.grant_advantage = true;
        self
    }

    pub fn granting_disadvantage(mut self) -> Self {
        self.grant_disadvantage = true;
        self
    }

    /// Count down one round
    pub fn tick(&mut self) {
        self.remaining_rounds -= 1;
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_rounds <= 0
    }
}

/// Effects on a single participant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveEffects {
    effects: Vec<StatusEffect>,
}

impl ActiveEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an effect; an effect of the same type is refreshed to the longer
    /// duration instead of stacking
    pub fn add(&mut self, effect: StatusEffect) {
        if let Some(existing) = self
            .effects
            .iter_mut()
            .find(|e| e.effect_type == effect.effect_type)
        {
            existing.remaining_rounds = existing.remaining_rounds.max(effect.remaining_rounds);
            existing.grant_advantage |= effect.grant_advantage;
            existing.grant_disadvantage |= effect.grant_disadvantage;
            if effect.source_id.is_some() {
                existing.source_id = effect.source_id;
            }
        } else {
            self.effects.push(effect);
        }
    }

    /// Remove an effect by type
    pub fn remove(&mut self, effect_type: EffectType) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.effect_type != effect_type);
        self.effects.len() != before
    }

    pub fn has(&self, effect_type: EffectType) -> bool {
        self.get(effect_type).is_some()
    }

    pub fn get(&self, effect_type: EffectType) -> Option<&StatusEffect> {
        self.effects
            .iter()
            .find(|e| e.effect_type == effect_type && !e.is_expired())
    }

    /// Not stunned or paralyzed
    pub fn can_act(&self) -> bool {
        !self.iter().any(|e| e.effect_type.prevents_action())
    }

    /// Active effects granting advantage
    pub fn advantage_sources(&self) -> u32 {
        self.iter().filter(|e| e.grant_advantage).count() as u32
    }

    /// Active effects imposing disadvantage
    pub fn disadvantage_sources(&self) -> u32 {
        self.iter().filter(|e| e.grant_disadvantage).count() as u32
    }

    /// Count every effect down one round and drop the expired ones,
    /// returning the types that expired
    pub fn tick_all(&mut self) -> Vec<EffectType> {
        for effect in &mut self.effects {
            effect.tick();
        }
        let expired = self
            .effects
            .iter()
            .filter(|e| e.is_expired())
            .map(|e| e.effect_type)
            .collect();
        self.effects.retain(|e| !e.is_expired());
        expired
    }

    /// All unexpired effects
    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter().filter(|e| !e.is_expired())
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}
