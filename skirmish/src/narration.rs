//! Narration sinks
//!
//! Combat and progression describe what happens through a [`Narrator`]:
//! direct lines to one entity, or announcements to everyone in a room.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

/// A line of narration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameMessage {
    /// Send to a specific entity
    Tell { target_id: String, message: String },
    /// Announce to a room, skipping some entities
    Announce {
        room_id: String,
        message: String,
        excluding: Vec<String>,
    },
}

impl GameMessage {
    pub fn text(&self) -> &str {
        match self {
            GameMessage::Tell { message, .. } | GameMessage::Announce { message, .. } => message,
        }
    }
}

/// Where narration goes
pub trait Narrator: Send + Sync {
    fn tell(&self, entity_id: &str, message: &str);
    fn announce(&self, room_id: &str, message: &str, excluding: &[String]);
}

/// Collects narration in memory
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Mutex<Vec<GameMessage>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in Arc for sharing
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Take every collected message
    pub fn drain(&self) -> Vec<GameMessage> {
        std::mem::take(&mut *self.messages.lock())
    }

    /// Text of every collected message, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .map(|m| m.text().to_string())
            .collect()
    }

    /// Messages told directly to one entity
    pub fn told_to(&self, entity_id: &str) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                GameMessage::Tell { target_id, message } if target_id == entity_id => {
                    Some(message.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl Narrator for MessageLog {
    fn tell(&self, entity_id: &str, message: &str) {
        self.messages.lock().push(GameMessage::Tell {
            target_id: entity_id.to_string(),
            message: message.to_string(),
        });
    }

    fn announce(&self, room_id: &str, message: &str, excluding: &[String]) {
        self.messages.lock().push(GameMessage::Announce {
            room_id: room_id.to_string(),
            message: message.to_string(),
            excluding: excluding.to_vec(),
        });
    }
}

/// Emits narration as tracing events under the `narration` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNarrator;

impl Narrator for TracingNarrator {
    fn tell(&self, entity_id: &str, message: &str) {
        info!(target: "narration", to = entity_id, "{}", message);
    }

    fn announce(&self, room_id: &str, message: &str, _excluding: &[String]) {
        info!(target: "narration", room = room_id, "{}", message);
    }
}
