//! Rooms, as far as combat needs them
//!
//! Combat only touches the world to take slain or fleeing NPCs out of their
//! room.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A room and who is in it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub npcs: Vec<String>,
    #[serde(default)]
    pub players: Vec<String>,
}

impl Room {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_npc(mut self, npc_id: &str) -> Self {
        self.npcs.push(npc_id.to_string());
        self
    }

    pub fn with_player(mut self, player_id: &str) -> Self {
        self.players.push(player_id.to_string());
        self
    }
}

/// Room lookup
pub trait World: Send {
    fn room(&self, id: &str) -> Option<&Room>;
    fn room_mut(&mut self, id: &str) -> Option<&mut Room>;

    /// Take an NPC out of a room; returns whether it was there
    fn remove_npc(&mut self, room_id: &str, npc_id: &str) -> bool {
        let Some(room) = self.room_mut(room_id) else {
            return false;
        };
        let before = room.npcs.len();
        room.npcs.retain(|id| id != npc_id);
        let removed = room.npcs.len() != before;
        if removed {
            debug!(room = room_id, npc = npc_id, "npc removed from room");
        }
        removed
    }
}

/// Rooms held in memory
#[derive(Debug, Default)]
pub struct InMemoryWorld {
    rooms: HashMap<String, Room>,
}

impl InMemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_room(&mut self, room: Room) {
        self.rooms.insert(room.id.clone(), room);
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl FromIterator<Room> for InMemoryWorld {
    fn from_iter<I: IntoIterator<Item = Room>>(iter: I) -> Self {
        let mut world = Self::new();
        for room in iter {
            world.add_room(room);
        }
        world
    }
}

impl World for InMemoryWorld {
    fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    fn room_mut(&mut self, id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }
}
