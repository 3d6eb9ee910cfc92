//! Quest Definition Structures
//!
//! These structures are deserialized from TOML quest files.

use serde::{Deserialize, Serialize};

/// A quest definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: String,
    /// NPC that offers this quest
    pub npc_id: String,
    pub prompt: String,
    pub accept_text: String,
    pub decline_text: String,
    /// Line shown after accepting through the generated prompt
    #[serde(default)]
    pub thanks_text: Option<String>,
    /// Key of a hand-written tree under `dialogues/quests/`
    #[serde(default)]
    pub dialogue_tree: Option<String>,
    pub reward: RawReward,
}

/// Raw reward as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawReward {
    pub item: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

// ============================================================================
// Resolved Quest Structures (after parsing)
// ============================================================================

pub const DEFAULT_THANKS_TEXT: &str = "Thank you for helping me!";

/// Item granted when a quest is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reward {
    pub item_id: String,
    pub quantity: u32,
}

impl Reward {
    pub fn new(item_id: &str, quantity: u32) -> Self {
        Self {
            item_id: item_id.to_string(),
            quantity,
        }
    }
}

/// A fully resolved quest definition
#[derive(Debug, Clone)]
pub struct Quest {
    pub id: String,
    pub npc_id: String,
    pub prompt: String,
    pub accept_text: String,
    pub decline_text: String,
    pub thanks_text: String,
    pub reward: Reward,
    pub dialogue_tree: Option<String>,
}

impl Quest {
    pub fn new(
        id: &str,
        npc_id: &str,
        prompt: &str,
        accept_text: &str,
        decline_text: &str,
        reward: Reward,
    ) -> Self {
        Self {
            id: id.to_string(),
            npc_id: npc_id.to_string(),
            prompt: prompt.to_string(),
            accept_text: accept_text.to_string(),
            decline_text: decline_text.to_string(),
            thanks_text: DEFAULT_THANKS_TEXT.to_string(),
            reward,
            dialogue_tree: None,
        }
    }

    pub fn with_dialogue_tree(mut self, tree: &str) -> Self {
        self.dialogue_tree = Some(tree.to_string());
        self
    }

    pub fn with_thanks_text(mut self, text: &str) -> Self {
        self.thanks_text = text.to_string();
        self
    }

    /// Create a Quest from raw TOML data
    pub fn from_raw(raw: &RawQuest) -> Result<Self, String> {
        if raw.id.is_empty() {
            return Err("Quest has an empty id".to_string());
        }
        if raw.reward.quantity == 0 {
            return Err(format!("Quest '{}' has a zero-quantity reward", raw.id));
        }

        Ok(Self {
            id: raw.id.clone(),
            npc_id: raw.npc_id.clone(),
            prompt: raw.prompt.clone(),
            accept_text: raw.accept_text.clone(),
            decline_text: raw.decline_text.clone(),
            thanks_text: raw
                .thanks_text
                .clone()
                .unwrap_or_else(|| DEFAULT_THANKS_TEXT.to_string()),
            reward: Reward::new(&raw.reward.item, raw.reward.quantity),
            dialogue_tree: raw.dialogue_tree.clone(),
        })
    }

    /// Key of the quest-namespace dialogue tree for this quest
    pub fn tree_key(&self) -> &str {
        self.dialogue_tree.as_deref().unwrap_or(&self.id)
    }
}
