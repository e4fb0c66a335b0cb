//! Player persistence
//!
//! The engine only ever writes players: after equipment changes, level-ups
//! and stat increases. Loading belongs to whoever builds the roster.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::debug;

use crate::character::Combatant;

/// Sink for player saves
pub trait PlayerStore: Send + Sync {
    fn save_player(&self, player: &Combatant) -> Result<()>;
}

/// Keeps the latest save of each player in memory
#[derive(Debug, Default)]
pub struct MemoryPlayerStore {
    players: Mutex<HashMap<String, Combatant>>,
    saves: Mutex<usize>,
}

impl MemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved copy of a player
    pub fn get(&self, player_id: &str) -> Option<Combatant> {
        self.players.lock().get(player_id).cloned()
    }

    /// Number of saves performed
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl PlayerStore for MemoryPlayerStore {
    fn save_player(&self, player: &Combatant) -> Result<()> {
        self.players
            .lock()
            .insert(player.id.clone(), player.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

/// One pretty-printed JSON file per player
#[derive(Debug, Clone)]
pub struct JsonPlayerStore {
    base_dir: PathBuf,
}

impl JsonPlayerStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("creating player directory {}", base_dir.display()))?;
        Ok(Self { base_dir })
    }

    /// Ids are hex-encoded so every id maps to its own file name
    fn player_path(&self, player_id: &str) -> PathBuf {
        self.base_dir
            .join(format!("player_{}.json", hex::encode(player_id.as_bytes())))
    }

    /// Load a saved player with derived stats rebuilt
    pub fn load_player(&self, player_id: &str) -> Result<Option<Combatant>> {
        let path = self.player_path(player_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut player: Combatant = serde_json::from_str(&json)
            .with_context(|| format!("parsing {}", path.display()))?;
        player.refresh();
        Ok(Some(player))
    }
}

impl PlayerStore for JsonPlayerStore {
    fn save_player(&self, player: &Combatant) -> Result<()> {
        let path = self.player_path(&player.id);
        let temp_path = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(player)?;
        fs::write(&temp_path, json)
            .with_context(|| format!("writing {}", temp_path.display()))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("renaming into {}", path.display()))?;

        debug!(player = %player.id, path = %path.display(), "player saved");
        Ok(())
    }
}
