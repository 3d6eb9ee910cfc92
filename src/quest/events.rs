//! Quest Event Types
//!
//! Journal entries recorded by the registry as quests change state.

use serde::Serialize;

/// Something that happened to a quest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QuestEvent {
    QuestAccepted {
        quest_id: String,
    },
    QuestDeclined {
        quest_id: String,
    },
    QuestCompleted {
        quest_id: String,
    },
    /// Reward items added to the player's inventory
    RewardGranted {
        quest_id: String,
        item_id: String,
        quantity: u32,
    },
}

impl QuestEvent {
    pub fn quest_id(&self) -> &str {
        match self {
            QuestEvent::QuestAccepted { quest_id } => quest_id,
            QuestEvent::QuestDeclined { quest_id } => quest_id,
            QuestEvent::QuestCompleted { quest_id } => quest_id,
            QuestEvent::RewardGranted { quest_id, .. } => quest_id,
        }
    }

    /// Get event type as string (for logging/debugging)
    pub fn event_type(&self) -> &'static str {
        match self {
            QuestEvent::QuestAccepted { .. } => "quest_accepted",
            QuestEvent::QuestDeclined { .. } => "quest_declined",
            QuestEvent::QuestCompleted { .. } => "quest_completed",
            QuestEvent::RewardGranted { .. } => "reward_granted",
        }
    }
}
