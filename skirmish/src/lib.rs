//! skirmish - combat and progression engine for a MUD
//!
//! D&D-style attack and damage resolution, equipment-derived stats, item
//! magic, a combat registry with per-round orchestration, and XP-driven
//! leveling with guild hooks.

pub mod arena;
pub mod character;
pub mod combat;
pub mod config;
pub mod driver;
pub mod equipment;
pub mod narration;
pub mod progression;
pub mod scenario;
pub mod store;
pub mod world;

pub use arena::{Arena, ArenaError, Resolution, TickReport};
pub use character::{Ability, Combatant, EntityId, EntityKind, Roster, ScoreSet};
pub use config::{ConfigError, EngineConfig};
pub use driver::{run_driver, DriverStop, DriverSummary};
pub use narration::{MessageLog, Narrator, TracingNarrator};
pub use scenario::Scenario;
pub use store::{JsonPlayerStore, MemoryPlayerStore, PlayerStore};
pub use world::{InMemoryWorld, Room, World};
