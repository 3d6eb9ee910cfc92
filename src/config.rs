//! Game Configuration
//!
//! Optional `game.toml`. Every field has a default, so a missing or partial
//! file still yields a usable configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::data;
use crate::error::DataError;

/// NPC interaction range in tiles
pub const DEFAULT_INTERACTION_RANGE: f32 = 2.5;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Root of the quest, dialogue, shop and NPC data
    pub data_dir: PathBuf,
    pub interaction_range: f32,
    /// Item used to pay merchants
    pub currency_item: String,
    pub starting_coins: u32,
    /// Default tracing directive, applied on top of `RUST_LOG`
    pub log_filter: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            interaction_range: DEFAULT_INTERACTION_RANGE,
            currency_item: "coin".to_string(),
            starting_coins: 100,
            log_filter: "isometric_quest=info".to_string(),
        }
    }
}

impl GameConfig {
    /// Read a config file, or use defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, DataError> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let config: GameConfig = data::read_toml(path)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }
}
