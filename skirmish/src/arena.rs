//! The engine service
//!
//! `Arena` owns the roster, the combat registry and every collaborator a
//! fight needs (dice, narrator, world, player store, guild hooks). Callers
//! construct one explicitly and drive it through its methods; nothing here
//! is global.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::character::{Combatant, EntityId, EntityKind, Roster};
use crate::combat::{
    self, check_outcome, Combat, CombatId, CombatOutcome, CombatRegistry, DiceSource, EngageError,
    Engagement, RngDice, RoundContext, RoundReport, StatusEffect,
};
use crate::config::EngineConfig;
use crate::equipment::{EquipError, EquippedItem, Slot};
use crate::narration::{Narrator, TracingNarrator};
use crate::progression::{
    distribute_kill_xp, grant_xp, increase_stat, GuildHook, GuildHookRegistry, LevelUpReport,
    StatIncrease, StatIncreaseError, XpAward,
};
use crate::store::{MemoryPlayerStore, PlayerStore};
use crate::world::{InMemoryWorld, World};

/// Errors from equipment commands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("unknown combatant: {0}")]
    UnknownCombatant(String),

    #[error(transparent)]
    Equip(#[from] EquipError),
}

/// What happened when a combat ended
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub combat_id: CombatId,
    /// None when ended with several combatants still standing
    pub outcome: Option<CombatOutcome>,
    pub rounds: u32,
    pub awards: Vec<XpAward>,
    /// Level-ups triggered by the awards, per player
    pub level_ups: Vec<(EntityId, LevelUpReport)>,
}

/// Result of one driver tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub rounds: Vec<RoundReport>,
    pub resolutions: Vec<Resolution>,
    /// HP restored to combatants outside combat
    pub regenerated: Vec<(EntityId, i32)>,
}

/// Combat and progression engine
pub struct Arena {
    config: EngineConfig,
    registry: CombatRegistry,
    roster: Roster,
    dice: Box<dyn DiceSource + Send>,
    narrator: Arc<dyn Narrator>,
    world: Box<dyn World>,
    store: Arc<dyn PlayerStore>,
    hooks: GuildHookRegistry,
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("combatants", &self.roster.len())
            .field("combats", &self.registry.len())
            .field("hooks", &self.hooks)
            .finish()
    }
}

impl Arena {
    /// Arena with random dice, tracing narration, an empty in-memory world
    /// and an in-memory player store
    pub fn new(config: EngineConfig) -> Self {
        let hooks = GuildHookRegistry::from_profiles(&config.guilds);
        Self {
            config,
            registry: CombatRegistry::new(),
            roster: Roster::new(),
            dice: Box::new(RngDice::from_entropy()),
            narrator: Arc::new(TracingNarrator),
            world: Box::new(InMemoryWorld::new()),
            store: Arc::new(MemoryPlayerStore::new()),
            hooks,
        }
    }

    pub fn with_dice(mut self, dice: impl DiceSource + Send + 'static) -> Self {
        self.dice = Box::new(dice);
        self
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn with_world(mut self, world: impl World + 'static) -> Self {
        self.world = Box::new(world);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn PlayerStore>) -> Self {
        self.store = store;
        self
    }

    /// Register a custom guild hook, replacing any profile from config
    pub fn register_guild_hook(&mut self, guild_id: &str, hook: Arc<dyn GuildHook>) {
        self.hooks.register(guild_id, hook);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &CombatRegistry {
        &self.registry
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn world(&self) -> &dyn World {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> &mut dyn World {
        self.world.as_mut()
    }

    /// Add a combatant and place it in its room
    pub fn add_combatant(&mut self, combatant: Combatant) {
        if let Some(room) = combatant
            .room_id
            .as_deref()
            .and_then(|id| self.world.room_mut(id))
        {
            let list = match combatant.kind {
                EntityKind::Npc => &mut room.npcs,
                EntityKind::Player => &mut room.players,
            };
            if !list.contains(&combatant.id) {
                list.push(combatant.id.clone());
            }
        }
        debug!(entity = %combatant.id, kind = %combatant.kind, "combatant added");
        self.roster.insert(combatant);
    }

    pub fn combatant(&self, id: &str) -> Option<&Combatant> {
        self.roster.get(id)
    }

    /// Save a player, logging failures
    fn persist(&self, id: &str) {
        let Some(player) = self.roster.get(id) else {
            return;
        };
        if !player.is_player() {
            return;
        }
        if let Err(e) = self.store.save_player(player) {
            warn!(player = id, "failed to save player: {:#}", e);
        }
    }

    fn combatant_mut(&mut self, id: &str) -> Result<&mut Combatant, ArenaError> {
        self.roster
            .get_mut(id)
            .ok_or_else(|| ArenaError::UnknownCombatant(id.to_string()))
    }

    /// Equip an item; returns whatever it displaced
    pub fn equip(&mut self, id: &str, item: EquippedItem) -> Result<Vec<EquippedItem>, ArenaError> {
        let combatant = self.combatant_mut(id)?;
        let displaced = combatant.equipment.equip(item)?;
        combatant.refresh();
        self.persist(id);
        Ok(displaced)
    }

    pub fn unequip(&mut self, id: &str, slot: Slot) -> Result<EquippedItem, ArenaError> {
        let combatant = self.combatant_mut(id)?;
        let item = combatant
            .equipment
            .unequip(slot)
            .ok_or(EquipError::EmptySlot(slot))?;
        combatant.refresh();
        self.persist(id);
        Ok(item)
    }

    pub fn attune(&mut self, id: &str, slot: Slot) -> Result<(), ArenaError> {
        let max_attuned = self.config.max_attuned_items;
        let combatant = self.combatant_mut(id)?;
        combatant.equipment.attune(slot, max_attuned)?;
        combatant.refresh();
        self.persist(id);
        Ok(())
    }

    pub fn unattune(&mut self, id: &str, slot: Slot) -> Result<(), ArenaError> {
        let combatant = self.combatant_mut(id)?;
        combatant.equipment.unattune(slot)?;
        combatant.refresh();
        self.persist(id);
        Ok(())
    }

    /// Start or join a fight; the attacker's room hosts the combat
    pub fn engage(&mut self, attacker_id: &str, defender_id: &str) -> Result<Engagement, EngageError> {
        if attacker_id == defender_id {
            return Err(EngageError::SelfTarget(attacker_id.to_string()));
        }
        let attacker = self
            .roster
            .get(attacker_id)
            .ok_or_else(|| EngageError::UnknownEntity(attacker_id.to_string()))?;
        let defender = self
            .roster
            .get(defender_id)
            .ok_or_else(|| EngageError::UnknownEntity(defender_id.to_string()))?;
        for c in [attacker, defender] {
            if !c.is_alive() {
                return Err(EngageError::Dead(c.id.clone()));
            }
        }

        let room_id = attacker.room_id.clone().or_else(|| defender.room_id.clone());
        let message = format!("{} attacks {}!", attacker.name, defender.name);
        let engagement = self.registry.engage(
            (attacker_id, attacker.kind),
            (defender_id, defender.kind),
            room_id.as_deref(),
        )?;

        match &room_id {
            Some(room) => self.narrator.announce(room, &message, &[]),
            None => {
                self.narrator.tell(attacker_id, &message);
                self.narrator.tell(defender_id, &message);
            }
        }
        Ok(engagement)
    }

    /// Put a status effect on a combat participant; false if not fighting
    pub fn apply_status_effect(&mut self, entity_id: &str, effect: StatusEffect) -> bool {
        match self.registry.participant_mut(entity_id) {
            Some(participant) => {
                debug!(entity = entity_id, effect = %effect.effect_type, "status effect applied");
                participant.add_effect(effect);
                true
            }
            None => false,
        }
    }

    /// Run one round of a combat, resolving it if it ended
    pub fn run_round(&mut self, combat_id: &str) -> Option<(RoundReport, Option<Resolution>)> {
        let active = self.registry.combat_mut(combat_id)?;
        let mut ctx = RoundContext {
            roster: &mut self.roster,
            dice: self.dice.as_mut(),
            narrator: self.narrator.as_ref(),
            world: self.world.as_mut(),
            config: &self.config,
        };
        let report = combat::run_round(active, &mut ctx);
        let resolution = if report.outcome.is_some() {
            self.resolve(combat_id)
        } else {
            None
        };
        Some((report, resolution))
    }

    /// One driver tick: a round of every active combat in creation order,
    /// then out-of-combat regeneration
    pub fn tick(&mut self) -> TickReport {
        let mut tick = TickReport::default();
        for combat_id in self.registry.active_ids() {
            if let Some((report, resolution)) = self.run_round(&combat_id) {
                tick.rounds.push(report);
                tick.resolutions.extend(resolution);
            }
        }
        if self.config.idle_regeneration {
            tick.regenerated = self.regenerate_idle();
        }
        tick
    }

    /// Apply non-combat heals to living combatants outside any fight
    fn regenerate_idle(&mut self) -> Vec<(EntityId, i32)> {
        let candidates: Vec<EntityId> = self
            .roster
            .iter()
            .filter(|c| {
                c.is_alive()
                    && c.hp() < c.max_hp()
                    && !self.registry.is_in_combat(&c.id)
                    && combat::regenerates_idle(c)
            })
            .map(|c| c.id.clone())
            .collect();

        let mut healed = Vec::new();
        for id in candidates {
            let Some(c) = self.roster.get_mut(&id) else {
                continue;
            };
            let before = c.hp();
            let messages = combat::on_start_of_turn(c, false, self.dice.as_mut());
            let restored = c.hp() - before;
            for message in &messages {
                self.narrator.tell(&id, message);
            }
            if restored > 0 {
                healed.push((id, restored));
            }
        }
        healed
    }

    /// Leave a fight. A fleeing NPC also leaves its room.
    pub fn flee(&mut self, entity_id: &str) -> Option<Resolution> {
        let combat_id = self.registry.combat_of(entity_id)?.clone();
        let name = self.roster.name_of(entity_id);
        let room_id = self.registry.combat(&combat_id).and_then(|c| c.room_id.clone());
        info!(combat = %combat_id, entity = entity_id, "fled combat");

        if let Some(room) = &room_id {
            self.narrator
                .announce(room, &format!("{} flees from combat!", name), &[]);
        }
        if let Some(c) = self.roster.get(entity_id) {
            if c.kind == EntityKind::Npc {
                if let Some(room) = c.room_id.clone().or(room_id) {
                    self.world.remove_npc(&room, entity_id);
                }
            }
        }
        self.remove_participant(entity_id)
    }

    /// Take an entity out of its combat, resolving the combat if at most
    /// one participant is left standing
    pub fn remove_participant(&mut self, entity_id: &str) -> Option<Resolution> {
        let combat_id = self.registry.remove_participant(entity_id)?;
        let combat = self.registry.combat(&combat_id)?;
        if check_outcome(combat, &self.roster).is_some() {
            self.resolve(&combat_id)
        } else {
            None
        }
    }

    /// Tear a combat down without awarding anything
    pub fn end_combat(&mut self, combat_id: &str) -> Option<Combat> {
        let combat = self.registry.end_combat(combat_id)?;
        info!(combat = combat_id, rounds = combat.round, "combat ended");
        Some(combat)
    }

    /// Finish a combat: award XP for every slain NPC, then tear it down.
    /// Slain NPCs leave the roster. Callers may resolve a combat early, for
    /// instance once only allies remain.
    pub fn resolve(&mut self, combat_id: &str) -> Option<Resolution> {
        let combat = self.registry.end_combat(combat_id)?;
        let outcome = check_outcome(&combat, &self.roster);

        let mut awards = Vec::new();
        for victim_id in &combat.fallen {
            let Some(victim) = self.roster.get(victim_id) else {
                continue;
            };
            if victim.kind != EntityKind::Npc {
                continue;
            }
            awards.extend(distribute_kill_xp(
                &combat,
                victim,
                &self.roster,
                self.config.xp_share_threshold_percent,
            ));
        }

        let mut level_ups = Vec::new();
        for award in &awards {
            if let Some(report) = self.award_xp(&award.player_id, award.amount) {
                if report.leveled() {
                    level_ups.push((award.player_id.clone(), report));
                }
            }
        }

        for victim_id in &combat.fallen {
            if self.roster.get(victim_id).is_some_and(|c| c.kind == EntityKind::Npc) {
                self.roster.remove(victim_id);
            }
        }

        info!(combat = combat_id, rounds = combat.round, ?outcome, awards = awards.len(), "combat resolved");
        Some(Resolution {
            combat_id: combat_id.to_string(),
            outcome,
            rounds: combat.round,
            awards,
            level_ups,
        })
    }

    /// Grant XP to a player, applying and narrating any level-ups
    pub fn award_xp(&mut self, player_id: &str, amount: u64) -> Option<LevelUpReport> {
        let player = self.roster.get_mut(player_id)?;
        if !player.is_player() {
            warn!(entity = player_id, "xp awarded to a non-player, ignoring");
            return None;
        }
        let report = grant_xp(player, amount, &self.hooks, self.config.max_cascade_levels);
        let name = player.name.clone();
        let room_id = player.room_id.clone();

        if amount > 0 {
            self.narrator
                .tell(player_id, &format!("You gain {} experience.", amount));
        }
        for gain in &report.gains {
            for message in &gain.messages {
                self.narrator.tell(player_id, message);
            }
            if let Some(room) = &room_id {
                self.narrator.announce(
                    room,
                    &format!("{} has reached level {}!", name, gain.level),
                    &[player_id.to_string()],
                );
            }
        }
        self.persist(player_id);
        Some(report)
    }

    /// Spend a pending stat choice
    pub fn increase_stat(&mut self, player_id: &str, ability: &str) -> Result<StatIncrease, StatIncreaseError> {
        let player = self
            .roster
            .get_mut(player_id)
            .ok_or_else(|| StatIncreaseError::UnknownPlayer(player_id.to_string()))?;
        let increase = increase_stat(player, ability)?;
        self.narrator.tell(
            player_id,
            &format!(
                "Your {} increases to {}.",
                increase.ability, increase.new_score
            ),
        );
        self.persist(player_id);
        Ok(increase)
    }

    /// Whether any combat is still running
    pub fn has_active_combats(&self) -> bool {
        !self.registry.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::ScoreSet;
    use crate::combat::{DiceRoll, EffectType, ItemEffect, ScriptedDice};
    use crate::equipment::WeaponProfile;
    use crate::combat::DamageType;
    use crate::narration::MessageLog;
    use crate::world::Room;

    fn arena(dice: ScriptedDice) -> (Arena, Arc<MessageLog>, Arc<MemoryPlayerStore>) {
        let log = MessageLog::shared();
        let store = Arc::new(MemoryPlayerStore::new());
        let mut world = InMemoryWorld::new();
        world.add_room(Room::new("glade", "Quiet Glade"));
        let arena = Arena::new(EngineConfig::default())
            .with_dice(dice)
            .with_narrator(log.clone())
            .with_world(world)
            .with_store(store.clone());
        (arena, log, store)
    }

    fn hero() -> Combatant {
        Combatant::player("hero", "Hero", 1, ScoreSet::new(16, 12, 14, 10, 10, 10), 12).in_room("glade")
    }

    fn rat() -> Combatant {
        Combatant::npc("rat", "Giant Rat", 1, ScoreSet::new(6, 14, 10, 2, 10, 4), 4)
            .with_natural_weapon(WeaponProfile::new("natural", DiceRoll::new(1, 4, 0), DamageType::Piercing))
            .in_room("glade")
    }

    #[test]
    fn test_add_combatant_places_in_room() {
        let (mut arena, _, _) = arena(ScriptedDice::new([]));
        arena.add_combatant(hero());
        arena.add_combatant(rat());
        let room = arena.world().room("glade").unwrap();
        assert_eq!(room.npcs, vec!["rat".to_string()]);
        assert_eq!(room.players, vec!["hero".to_string()]);
    }

    #[test]
    fn test_engage_validation() {
        let (mut arena, _, _) = arena(ScriptedDice::new([]));
        arena.add_combatant(hero());
        arena.add_combatant(rat());

        assert_eq!(
            arena.engage("hero", "hero"),
            Err(EngageError::SelfTarget("hero".to_string()))
        );
        assert_eq!(
            arena.engage("hero", "dragon"),
            Err(EngageError::UnknownEntity("dragon".to_string()))
        );
        arena.roster.get_mut("rat").unwrap().take_damage(99);
        assert_eq!(
            arena.engage("hero", "rat"),
            Err(EngageError::Dead("rat".to_string()))
        );
        assert!(!arena.has_active_combats());
    }

    #[test]
    fn test_kill_awards_xp_and_clears_room() {
        // hero wins initiative (20 vs 1), hits on 15, longsword-less 1d4+3 rolls 4
        let dice = ScriptedDice::new([20, 1, 15, 4]);
        let (mut arena, log, store) = arena(dice);
        arena.add_combatant(hero());
        arena.add_combatant(rat());
        let engagement = arena.engage("hero", "rat").unwrap();
        assert!(engagement.created);

        let tick = arena.tick();
        assert_eq!(tick.rounds.len(), 1);
        assert_eq!(tick.resolutions.len(), 1);
        let resolution = &tick.resolutions[0];
        assert_eq!(
            resolution.outcome,
            Some(CombatOutcome::Victory {
                winner_id: "hero".to_string(),
                winner_name: "Hero".to_string()
            })
        );
        assert_eq!(resolution.awards.len(), 1);
        assert_eq!(resolution.awards[0].amount, 96);

        let hero = arena.combatant("hero").unwrap();
        assert_eq!(hero.progression.xp, 96);
        assert!(arena.combatant("rat").is_none());
        assert!(arena.world().room("glade").unwrap().npcs.is_empty());
        assert!(!arena.has_active_combats());
        assert!(store.get("hero").is_some());
        assert!(log.told_to("hero").contains(&"You gain 96 experience.".to_string()));
    }

    #[test]
    fn test_flee_resolves_without_xp() {
        let (mut arena, log, _) = arena(ScriptedDice::new([]));
        arena.add_combatant(hero());
        arena.add_combatant(rat());
        arena.engage("hero", "rat").unwrap();

        let resolution = arena.flee("rat").unwrap();
        assert!(resolution.awards.is_empty());
        assert!(!arena.registry().is_in_combat("hero"));
        assert!(arena.world().room("glade").unwrap().npcs.is_empty());
        // the rat is alive and still known
        assert!(arena.combatant("rat").is_some());
        assert!(log.messages().contains(&"Giant Rat flees from combat!".to_string()));
    }

    #[test]
    fn test_status_effect_requires_combat() {
        let (mut arena, _, _) = arena(ScriptedDice::new([]));
        arena.add_combatant(hero());
        arena.add_combatant(rat());
        assert!(!arena.apply_status_effect("rat", StatusEffect::new(EffectType::Stunned, 1)));
        arena.engage("hero", "rat").unwrap();
        assert!(arena.apply_status_effect("rat", StatusEffect::new(EffectType::Stunned, 1)));
    }

    #[test]
    fn test_equipment_commands_refresh_and_save() {
        let (mut arena, _, store) = arena(ScriptedDice::new([]));
        arena.add_combatant(hero());
        let amulet = EquippedItem::jewelry("amulet", "Amulet of Health", Slot::Neck, 0)
            .with_stat_bonus(crate::character::Ability::Constitution, 4)
            .requiring_attunement();

        arena.equip("hero", amulet).unwrap();
        assert_eq!(arena.combatant("hero").unwrap().max_hp(), 12);
        arena.attune("hero", Slot::Neck).unwrap();
        // CON 14 -> 18 adds +2 per level
        assert_eq!(arena.combatant("hero").unwrap().max_hp(), 14);
        assert_eq!(store.save_count(), 2);

        arena.unequip("hero", Slot::Neck).unwrap();
        assert_eq!(arena.combatant("hero").unwrap().max_hp(), 12);
        assert_eq!(
            arena.unequip("hero", Slot::Neck),
            Err(ArenaError::Equip(EquipError::EmptySlot(Slot::Neck)))
        );
        assert_eq!(
            arena.attune("ghost", Slot::Neck),
            Err(ArenaError::UnknownCombatant("ghost".to_string()))
        );
    }

    #[test]
    fn test_idle_regeneration() {
        let (mut arena, log, _) = arena(ScriptedDice::new([3]));
        let ring = EquippedItem::jewelry("ring", "Ring of Regeneration", Slot::RingLeft, 0)
            .with_effect(ItemEffect::StartOfTurn {
                heal: DiceRoll::new(1, 4, 0),
                in_combat_only: false,
            });
        let mut h = hero();
        h.equipment.equip(ring).unwrap();
        arena.add_combatant(h);
        arena.roster.get_mut("hero").unwrap().take_damage(5);

        let tick = arena.tick();
        assert_eq!(tick.regenerated, vec![("hero".to_string(), 3)]);
        assert_eq!(arena.combatant("hero").unwrap().hp(), 10);
        assert_eq!(
            log.told_to("hero"),
            vec!["Hero's Ring of Regeneration restores 3 HP.".to_string()]
        );
    }

    #[test]
    fn test_increase_stat_unknown_player() {
        let (mut arena, _, _) = arena(ScriptedDice::new([]));
        assert_eq!(
            arena.increase_stat("nobody", "str"),
            Err(StatIncreaseError::UnknownPlayer("nobody".to_string()))
        );
    }
}
