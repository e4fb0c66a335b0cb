//! Scenario tests for skirmish
//!
//! - Combat: full rounds through the arena, party kills, dual wielding
//! - Progression: XP awards, cascading level-ups, guild hooks
//! - Persistence: config files, JSON player saves and the driver

pub mod combat;
pub mod persistence;
pub mod progression;
