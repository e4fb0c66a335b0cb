//! Integration Test Harness
//!
//! - `ArenaTest` - an arena with scripted dice, a message log and an
//!   in-memory player store, set in a single room called "pit"
//! - Stock combatants for common fights

#![allow(dead_code)]

use std::sync::Arc;

use skirmish::combat::{DamageType, DiceRoll, ScriptedDice};
use skirmish::equipment::{EquippedItem, Slot, WeaponProfile};
use skirmish::{
    Arena, Combatant, EngineConfig, InMemoryWorld, MemoryPlayerStore, MessageLog, Room, ScoreSet,
    World,
};

pub const ROOM: &str = "pit";

/// Arena wired to inspectable collaborators
pub struct ArenaTest {
    pub arena: Arena,
    pub log: Arc<MessageLog>,
    pub store: Arc<MemoryPlayerStore>,
}

impl ArenaTest {
    /// Default config with the given dice faces (1 once exhausted)
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self::with_config(EngineConfig::default(), faces)
    }

    pub fn with_config(config: EngineConfig, faces: impl IntoIterator<Item = u32>) -> Self {
        let log = MessageLog::shared();
        let store = Arc::new(MemoryPlayerStore::new());
        let mut world = InMemoryWorld::new();
        world.add_room(Room::new(ROOM, "The Pit"));
        let arena = Arena::new(config)
            .with_dice(ScriptedDice::new(faces))
            .with_narrator(log.clone())
            .with_world(world)
            .with_store(store.clone());
        Self { arena, log, store }
    }

    /// Add combatants, placing each in the pit
    pub fn add(&mut self, combatants: impl IntoIterator<Item = Combatant>) {
        for c in combatants {
            self.arena.add_combatant(c.in_room(ROOM));
        }
    }

    pub fn hp(&self, id: &str) -> i32 {
        self.arena.combatant(id).map_or(0, |c| c.hp())
    }

    pub fn npcs_in_room(&self) -> Vec<String> {
        self.arena
            .world()
            .room(ROOM)
            .map(|r| r.npcs.clone())
            .unwrap_or_default()
    }

    /// Whether any narration line contains the text
    pub fn narrated(&self, text: &str) -> bool {
        self.log.messages().iter().any(|m| m.contains(text))
    }
}

/// Level 1 player with average scores and no gear
pub fn commoner(id: &str, name: &str) -> Combatant {
    Combatant::player(id, name, 1, ScoreSet::default(), 10)
}

/// NPC with average scores that fights unarmed
pub fn brute(id: &str, name: &str, level: u32, hp: i32) -> Combatant {
    Combatant::npc(id, name, level, ScoreSet::default(), hp)
}

pub fn dagger(id: &str) -> EquippedItem {
    EquippedItem::weapon(
        id,
        "Dagger",
        WeaponProfile::new("daggers", DiceRoll::new(1, 4, 0), DamageType::Piercing)
            .light()
            .finesse(),
    )
}

pub fn off_hand_dagger(id: &str) -> EquippedItem {
    dagger(id).in_slot(Slot::OffHand)
}
