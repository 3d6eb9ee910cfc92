use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::data;
use crate::error::DataError;

// ============================================================================
// NPC Definitions
// ============================================================================

/// A placed NPC the player can talk to
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NpcDefinition {
    pub id: String,
    pub display_name: String,
    // Tile position
    pub x: i32,
    pub y: i32,
    /// Opens a shop when there is nothing to talk about
    #[serde(default)]
    pub merchant: bool,
}

impl NpcDefinition {
    pub fn new(id: &str, display_name: &str, x: i32, y: i32) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            x,
            y,
            merchant: false,
        }
    }

    pub fn merchant(mut self) -> Self {
        self.merchant = true;
        self
    }

    /// Euclidean distance in tiles
    pub fn distance_to(&self, x: i32, y: i32) -> f32 {
        let dx = (self.x - x) as f32;
        let dy = (self.y - y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Deserialize)]
struct RawNpcFile {
    #[serde(default)]
    npc: Vec<NpcDefinition>,
}

// ============================================================================
// NPC Directory
// ============================================================================

/// All NPCs in the overworld, in load order
#[derive(Debug, Default)]
pub struct NpcDirectory {
    npcs: Vec<NpcDefinition>,
}

impl NpcDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `[[npc]]` entries from a TOML file
    pub fn load_from_file(&mut self, path: &Path) -> Result<usize, DataError> {
        if !path.exists() {
            warn!("NPC file does not exist: {:?}", path);
            return Ok(0);
        }

        let file: RawNpcFile = data::read_toml(path)?;
        let count = file.npc.len();
        for npc in file.npc {
            self.insert(npc);
        }

        info!("Loaded {} NPCs", count);
        Ok(count)
    }

    pub fn insert(&mut self, npc: NpcDefinition) {
        match self.npcs.iter_mut().find(|n| n.id == npc.id) {
            Some(existing) => {
                warn!("Duplicate NPC ID '{}', overwriting", npc.id);
                *existing = npc;
            }
            None => self.npcs.push(npc),
        }
    }

    pub fn get(&self, npc_id: &str) -> Option<&NpcDefinition> {
        self.npcs.iter().find(|n| n.id == npc_id)
    }

    pub fn all(&self) -> &[NpcDefinition] {
        &self.npcs
    }

    /// Closest NPC no further than `range` tiles from `(x, y)`. Ties go to
    /// the NPC loaded first.
    pub fn nearest_within(&self, x: i32, y: i32, range: f32) -> Option<&NpcDefinition> {
        let mut best: Option<(&NpcDefinition, f32)> = None;
        for npc in &self.npcs {
            let distance = npc.distance_to(x, y);
            if distance > range {
                continue;
            }
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((npc, distance));
            }
        }
        best.map(|(npc, _)| npc)
    }

    pub fn len(&self) -> usize {
        self.npcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
    }
}
