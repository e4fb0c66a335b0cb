//! Combat state tracking
//!
//! Manages combat sessions between entities:
//! - Participants with their status effects and roll modifiers
//! - Per-target damage ledgers used for XP apportionment
//! - The registry mapping every entity to at most one combat

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::info;

use crate::character::{EntityId, EntityKind};

use super::attack::RollMode;
use super::effects::{ActiveEffects, EffectType, StatusEffect};

pub type CombatId = String;

/// Errors raised when starting or joining a fight
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngageError {
    #[error("unknown combatant: {0}")]
    UnknownEntity(String),

    #[error("{0} cannot attack itself")]
    SelfTarget(String),

    #[error("{0} is dead")]
    Dead(String),

    #[error("unknown combat: {0}")]
    UnknownCombat(String),

    #[error("{entity} is already fighting in combat {combat}")]
    AlreadyInCombat { entity: String, combat: String },
}

/// One entity's place in a combat
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub entity_id: EntityId,
    pub entity_type: EntityKind,
    pub advantage_count: u32,
    pub disadvantage_count: u32,
    pub effects: ActiveEffects,
    /// Initiative rolled for the current round
    pub initiative: i32,
}

impl Participant {
    pub fn new(entity_id: &str, entity_type: EntityKind) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            entity_type,
            advantage_count: 0,
            disadvantage_count: 0,
            effects: ActiveEffects::new(),
            initiative: 0,
        }
    }

    pub fn add_effect(&mut self, effect: StatusEffect) {
        self.effects.add(effect);
        self.recompute_counts();
    }

    pub fn remove_effect(&mut self, effect_type: EffectType) -> bool {
        let removed = self.effects.remove(effect_type);
        self.recompute_counts();
        removed
    }

    /// Rebuild advantage/disadvantage counts from active effects
    pub fn recompute_counts(&mut self) {
        self.advantage_count = self.effects.advantage_sources();
        self.disadvantage_count = self.effects.disadvantage_sources();
    }

    /// Count effects down one round; returns the types that expired
    pub fn tick_effects(&mut self) -> Vec<EffectType> {
        let expired = self.effects.tick_all();
        self.recompute_counts();
        expired
    }

    pub fn roll_mode(&self) -> RollMode {
        RollMode::from_counts(self.advantage_count, self.disadvantage_count)
    }

    pub fn can_act(&self) -> bool {
        self.effects.can_act()
    }
}

/// Lifecycle of a combat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatPhase {
    /// Fewer than two participants
    Forming,
    /// At least two participants alive
    Active,
    /// At most one participant alive
    Resolved,
}

/// A single fight
#[derive(Debug, Clone)]
pub struct Combat {
    pub id: CombatId,
    pub room_id: Option<String>,
    /// Participants in join order
    pub participants: Vec<Participant>,
    pub round: u32,
    pub is_active: bool,
    /// target -> attacker -> HP removed
    damage_ledger: HashMap<EntityId, BTreeMap<EntityId, u32>>,
    /// Participants slain in this combat, in order of death
    pub fallen: Vec<EntityId>,
}

impl Combat {
    pub fn new(room_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            room_id,
            participants: Vec::new(),
            round: 0,
            is_active: true,
            damage_ledger: HashMap::new(),
            fallen: Vec::new(),
        }
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.participant(entity_id).is_some()
    }

    pub fn participant(&self, entity_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.entity_id == entity_id)
    }

    pub fn participant_mut(&mut self, entity_id: &str) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.entity_id == entity_id)
    }

    pub fn participant_ids(&self) -> Vec<EntityId> {
        self.participants
            .iter()
            .map(|p| p.entity_id.clone())
            .collect()
    }

    /// Phase given a liveness lookup
    pub fn phase(&self, is_alive: impl Fn(&str) -> bool) -> CombatPhase {
        if self.participants.len() < 2 {
            return CombatPhase::Forming;
        }
        let living = self
            .participants
            .iter()
            .filter(|p| is_alive(&p.entity_id))
            .count();
        if living >= 2 {
            CombatPhase::Active
        } else {
            CombatPhase::Resolved
        }
    }

    /// Add HP removed by an attacker from a target
    pub fn record_damage(&mut self, attacker_id: &str, target_id: &str, amount: u32) {
        if amount == 0 {
            return;
        }
        *self
            .damage_ledger
            .entry(target_id.to_string())
            .or_default()
            .entry(attacker_id.to_string())
            .or_insert(0) += amount;
    }

    pub fn damage_dealt(&self, attacker_id: &str, target_id: &str) -> u32 {
        self.damage_ledger
            .get(target_id)
            .and_then(|by| by.get(attacker_id))
            .copied()
            .unwrap_or(0)
    }

    /// Total HP a target lost in this combat
    pub fn damage_taken(&self, target_id: &str) -> u32 {
        self.damage_ledger
            .get(target_id)
            .map_or(0, |by| by.values().sum())
    }

    /// Total damage an entity dealt across all targets
    pub fn total_dealt_by(&self, attacker_id: &str) -> u32 {
        self.damage_ledger
            .values()
            .filter_map(|by| by.get(attacker_id))
            .sum()
    }

    /// Every attacker's contribution against a target, sorted by id
    pub fn contributions(&self, target_id: &str) -> Vec<(EntityId, u32)> {
        self.damage_ledger
            .get(target_id)
            .map(|by| by.iter().map(|(id, dmg)| (id.clone(), *dmg)).collect())
            .unwrap_or_default()
    }

    pub fn record_death(&mut self, entity_id: &str) {
        if !self.fallen.iter().any(|id| id == entity_id) {
            self.fallen.push(entity_id.to_string());
        }
    }

    /// Fold another combat into this one
    fn absorb(&mut self, other: Combat) {
        for participant in other.participants {
            if !self.contains(&participant.entity_id) {
                self.participants.push(participant);
            }
        }
        for (target, by) in other.damage_ledger {
            for (attacker, amount) in by {
                self.record_damage(&attacker, &target, amount);
            }
        }
        for id in other.fallen {
            self.record_death(&id);
        }
    }
}

/// Result of an engage call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engagement {
    pub combat_id: CombatId,
    /// A new combat was created
    pub created: bool,
    /// Entities newly added to the combat
    pub joined: Vec<EntityId>,
}

/// Authoritative map of active combats.
///
/// Every entity belongs to at most one combat; all mutation goes through
/// these methods so the two maps stay in step.
#[derive(Debug, Default)]
pub struct CombatRegistry {
    combats: HashMap<CombatId, Combat>,
    entity_combat: HashMap<EntityId, CombatId>,
    /// Combat ids in creation order
    order: Vec<CombatId>,
}

impl CombatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fight between two entities, or pull them into an existing one.
    ///
    /// - Neither engaged: a new combat is created
    /// - One engaged: the other joins that combat
    /// - Both engaged in different combats: the defender's combat is merged
    ///   into the attacker's
    pub fn engage(
        &mut self,
        attacker: (&str, EntityKind),
        defender: (&str, EntityKind),
        room_id: Option<&str>,
    ) -> Result<Engagement, EngageError> {
        let (attacker_id, attacker_kind) = attacker;
        let (defender_id, defender_kind) = defender;
        if attacker_id == defender_id {
            return Err(EngageError::SelfTarget(attacker_id.to_string()));
        }

        let attacker_combat = self.entity_combat.get(attacker_id).cloned();
        let defender_combat = self.entity_combat.get(defender_id).cloned();

        match (attacker_combat, defender_combat) {
            (None, None) => {
                let mut combat = Combat::new(room_id.map(str::to_string));
                combat
                    .participants
                    .push(Participant::new(attacker_id, attacker_kind));
                combat
                    .participants
                    .push(Participant::new(defender_id, defender_kind));
                let combat_id = combat.id.clone();
                self.entity_combat
                    .insert(attacker_id.to_string(), combat_id.clone());
                self.entity_combat
                    .insert(defender_id.to_string(), combat_id.clone());
                self.order.push(combat_id.clone());
                self.combats.insert(combat_id.clone(), combat);
                info!(combat = %combat_id, attacker = attacker_id, defender = defender_id, "combat started");
                Ok(Engagement {
                    combat_id,
                    created: true,
                    joined: vec![attacker_id.to_string(), defender_id.to_string()],
                })
            }
            (Some(combat_id), None) => {
                self.add_participant(&combat_id, defender_id, defender_kind)?;
                Ok(Engagement {
                    combat_id,
                    created: false,
                    joined: vec![defender_id.to_string()],
                })
            }
            (None, Some(combat_id)) => {
                self.add_participant(&combat_id, attacker_id, attacker_kind)?;
                Ok(Engagement {
                    combat_id,
                    created: false,
                    joined: vec![attacker_id.to_string()],
                })
            }
            (Some(a), Some(d)) if a == d => Ok(Engagement {
                combat_id: a,
                created: false,
                joined: Vec::new(),
            }),
            (Some(a), Some(d)) => {
                let joined = self.merge(&a, &d)?;
                Ok(Engagement {
                    combat_id: a,
                    created: false,
                    joined,
                })
            }
        }
    }

    /// Fold combat `from` into combat `into`, remapping its entities
    fn merge(&mut self, into: &str, from: &str) -> Result<Vec<EntityId>, EngageError> {
        if !self.combats.contains_key(into) {
            return Err(EngageError::UnknownCombat(into.to_string()));
        }
        let absorbed = self
            .combats
            .remove(from)
            .ok_or_else(|| EngageError::UnknownCombat(from.to_string()))?;
        self.order.retain(|id| id != from);

        let joined = absorbed.participant_ids();
        for id in &joined {
            self.entity_combat.insert(id.clone(), into.to_string());
        }
        if let Some(target) = self.combats.get_mut(into) {
            target.absorb(absorbed);
        }
        info!(combat = into, merged = from, "combats merged");
        Ok(joined)
    }

    /// Add an entity to an existing combat
    pub fn add_participant(
        &mut self,
        combat_id: &str,
        entity_id: &str,
        kind: EntityKind,
    ) -> Result<(), EngageError> {
        if let Some(existing) = self.entity_combat.get(entity_id) {
            return Err(EngageError::AlreadyInCombat {
                entity: entity_id.to_string(),
                combat: existing.clone(),
            });
        }
        let combat = self
            .combats
            .get_mut(combat_id)
            .ok_or_else(|| EngageError::UnknownCombat(combat_id.to_string()))?;
        combat.participants.push(Participant::new(entity_id, kind));
        self.entity_combat
            .insert(entity_id.to_string(), combat_id.to_string());
        info!(combat = combat_id, entity = entity_id, "joined combat");
        Ok(())
    }

    /// Take an entity out of its combat; returns the combat it left
    pub fn remove_participant(&mut self, entity_id: &str) -> Option<CombatId> {
        let combat_id = self.entity_combat.remove(entity_id)?;
        if let Some(combat) = self.combats.get_mut(&combat_id) {
            combat.participants.retain(|p| p.entity_id != entity_id);
        }
        Some(combat_id)
    }

    /// Tear down a combat and release every mapping into it
    pub fn end_combat(&mut self, combat_id: &str) -> Option<Combat> {
        let mut combat = self.combats.remove(combat_id)?;
        self.order.retain(|id| id != combat_id);
        self.entity_combat.retain(|_, cid| cid != combat_id);
        combat.is_active = false;
        Some(combat)
    }

    pub fn combat(&self, combat_id: &str) -> Option<&Combat> {
        self.combats.get(combat_id)
    }

    pub fn combat_mut(&mut self, combat_id: &str) -> Option<&mut Combat> {
        self.combats.get_mut(combat_id)
    }

    pub fn combat_of(&self, entity_id: &str) -> Option<&CombatId> {
        self.entity_combat.get(entity_id)
    }

    pub fn is_in_combat(&self, entity_id: &str) -> bool {
        self.entity_combat.contains_key(entity_id)
    }

    pub fn participant_mut(&mut self, entity_id: &str) -> Option<&mut Participant> {
        let combat_id = self.entity_combat.get(entity_id)?;
        self.combats
            .get_mut(combat_id)?
            .participant_mut(entity_id)
    }

    /// Combat ids in creation order
    pub fn active_ids(&self) -> Vec<CombatId> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.combats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: EntityKind = EntityKind::Player;
    const N: EntityKind = EntityKind::Npc;

    #[test]
    fn test_engage_creates_combat() {
        let mut registry = CombatRegistry::new();
        let e = registry.engage(("hero", P), ("orc", N), Some("cave")).unwrap();
        assert!(e.created);
        assert_eq!(e.joined.len(), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.combat_of("hero"), Some(&e.combat_id));
        assert_eq!(registry.combat_of("orc"), Some(&e.combat_id));

        let combat = registry.combat(&e.combat_id).unwrap();
        assert_eq!(combat.room_id.as_deref(), Some("cave"));
        assert_eq!(combat.participant_ids(), vec!["hero", "orc"]);
        assert_eq!(combat.phase(|_| true), CombatPhase::Active);
    }

    #[test]
    fn test_engaging_engaged_entity_joins() {
        let mut registry = CombatRegistry::new();
        let first = registry.engage(("hero", P), ("orc", N), None).unwrap();
        let second = registry.engage(("mage", P), ("orc", N), None).unwrap();
        assert!(!second.created);
        assert_eq!(second.combat_id, first.combat_id);
        assert_eq!(second.joined, vec!["mage".to_string()]);
        assert_eq!(registry.len(), 1);

        let again = registry.engage(("hero", P), ("orc", N), None).unwrap();
        assert!(again.joined.is_empty());
    }

    #[test]
    fn test_merge_keeps_one_combat_per_entity() {
        let mut registry = CombatRegistry::new();
        let a = registry.engage(("hero", P), ("orc", N), None).unwrap();
        let b = registry.engage(("mage", P), ("wolf", N), None).unwrap();
        registry
            .combat_mut(&b.combat_id)
            .unwrap()
            .record_damage("mage", "wolf", 4);

        let merged = registry.engage(("hero", P), ("wolf", N), None).unwrap();
        assert_eq!(merged.combat_id, a.combat_id);
        assert_eq!(registry.len(), 1);
        assert!(registry.combat(&b.combat_id).is_none());
        for id in ["hero", "orc", "mage", "wolf"] {
            assert_eq!(registry.combat_of(id), Some(&a.combat_id));
        }
        let combat = registry.combat(&a.combat_id).unwrap();
        assert_eq!(combat.participants.len(), 4);
        assert_eq!(combat.damage_dealt("mage", "wolf"), 4);
    }

    #[test]
    fn test_self_target_rejected() {
        let mut registry = CombatRegistry::new();
        assert_eq!(
            registry.engage(("hero", P), ("hero", P), None),
            Err(EngageError::SelfTarget("hero".to_string()))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_participant_rejects_double_membership() {
        let mut registry = CombatRegistry::new();
        let a = registry.engage(("hero", P), ("orc", N), None).unwrap();
        let err = registry.add_participant(&a.combat_id, "orc", N).unwrap_err();
        assert!(matches!(err, EngageError::AlreadyInCombat { .. }));
        assert!(matches!(
            registry.add_participant("nope", "rat", N),
            Err(EngageError::UnknownCombat(_))
        ));
    }

    #[test]
    fn test_remove_and_end() {
        let mut registry = CombatRegistry::new();
        let a = registry.engage(("hero", P), ("orc", N), None).unwrap();
        registry.engage(("mage", P), ("orc", N), None).unwrap();

        assert_eq!(registry.remove_participant("mage"), Some(a.combat_id.clone()));
        assert!(!registry.is_in_combat("mage"));
        assert_eq!(registry.remove_participant("mage"), None);

        let combat = registry.end_combat(&a.combat_id).unwrap();
        assert!(!combat.is_active);
        assert!(!registry.is_in_combat("hero"));
        assert!(!registry.is_in_combat("orc"));
        assert!(registry.active_ids().is_empty());
    }

    #[test]
    fn test_phases() {
        let mut combat = Combat::new(None);
        assert_eq!(combat.phase(|_| true), CombatPhase::Forming);
        combat.participants.push(Participant::new("a", P));
        combat.participants.push(Participant::new("b", N));
        assert_eq!(combat.phase(|_| true), CombatPhase::Active);
        assert_eq!(combat.phase(|id| id == "a"), CombatPhase::Resolved);
        assert_eq!(combat.phase(|_| false), CombatPhase::Resolved);
    }

    #[test]
    fn test_damage_ledger() {
        let mut combat = Combat::new(None);
        combat.record_damage("hero", "orc", 6);
        combat.record_damage("hero", "orc", 3);
        combat.record_damage("mage", "orc", 1);
        combat.record_damage("orc", "hero", 5);
        combat.record_damage("mage", "orc", 0);

        assert_eq!(combat.damage_dealt("hero", "orc"), 9);
        assert_eq!(combat.damage_taken("orc"), 10);
        assert_eq!(combat.total_dealt_by("hero"), 9);
        assert_eq!(
            combat.contributions("orc"),
            vec![("hero".to_string(), 9), ("mage".to_string(), 1)]
        );
    }

    #[test]
    fn test_participant_counts_follow_effects() {
        let mut p = Participant::new("hero", P);
        p.add_effect(StatusEffect::new(EffectType::Invisible, 1));
        assert_eq!(p.roll_mode(), RollMode::Advantage);
        p.add_effect(StatusEffect::new(EffectType::Stunned, 2));
        assert!(!p.can_act());

        assert_eq!(p.tick_effects(), vec![EffectType::Invisible]);
        assert_eq!(p.advantage_count, 0);
        assert_eq!(p.roll_mode(), RollMode::Normal);
        assert!(p.remove_effect(EffectType::Stunned));
        assert!(p.can_act());
    }
}
