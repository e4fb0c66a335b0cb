//! JSON scenarios for the driver binary
//!
//! A scenario lists rooms, combatants and the fights to start:
//!
//! ```json
//! {
//!   "rooms": [{ "id": "arena", "name": "The Pit" }],
//!   "combatants": [ ... ],
//!   "engagements": [{ "attacker": "hero", "defender": "orc" }]
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::arena::Arena;
use crate::character::Combatant;
use crate::world::{InMemoryWorld, Room};

/// A fight to start when the scenario loads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementSpec {
    pub attacker: String,
    pub defender: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub combatants: Vec<Combatant>,
    #[serde(default)]
    pub engagements: Vec<EngagementSpec>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing scenario {}", path.display()))
    }

    /// World holding the scenario's rooms
    pub fn world(&self) -> InMemoryWorld {
        self.rooms.iter().cloned().collect()
    }

    /// Add the combatants to an arena and start the engagements.
    /// Engagements that cannot start are logged and skipped.
    pub fn populate(&self, arena: &mut Arena) -> usize {
        for combatant in &self.combatants {
            arena.add_combatant(combatant.clone());
        }
        let mut started = 0;
        for spec in &self.engagements {
            match arena.engage(&spec.attacker, &spec.defender) {
                Ok(_) => started += 1,
                Err(e) => warn!(
                    attacker = %spec.attacker,
                    defender = %spec.defender,
                    "skipping engagement: {}",
                    e
                ),
            }
        }
        info!(
            combatants = self.combatants.len(),
            engagements = started,
            "scenario loaded"
        );
        started
    }
}
