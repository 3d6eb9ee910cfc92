//! Quest State Tracking
//!
//! Tracks the lifecycle status of each quest for the player.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a quest for the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuestStatus {
    /// Quest has not been answered yet
    #[default]
    NotStarted,
    /// Quest was accepted and its reward granted
    Accepted,
    /// Quest was declined (may be offered again)
    Declined,
    /// Quest has been completed
    Completed,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::NotStarted => "not_started",
            QuestStatus::Accepted => "accepted",
            QuestStatus::Declined => "declined",
            QuestStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(QuestStatus::NotStarted),
            "accepted" => Some(QuestStatus::Accepted),
            "declined" => Some(QuestStatus::Declined),
            "completed" => Some(QuestStatus::Completed),
            _ => None,
        }
    }

    /// Whether the quest can be offered to the player
    pub fn is_offerable(&self) -> bool {
        matches!(self, QuestStatus::NotStarted | QuestStatus::Declined)
    }
}

/// Progress record for a single quest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestProgress {
    pub status: QuestStatus,
    /// Set once the reward has been handed out; never cleared
    pub reward_granted: bool,
    pub accepted_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuestProgress {
    pub fn accept(&mut self) {
        self.status = QuestStatus::Accepted;
        self.accepted_at = Some(Utc::now());
    }

    pub fn decline(&mut self) {
        self.status = QuestStatus::Declined;
        self.declined_at = Some(Utc::now());
    }

    pub fn complete(&mut self) {
        self.status = QuestStatus::Completed;
        self.completed_at = Some(Utc::now());
    }
}

/// All quest state for the player
#[derive(Debug, Clone, Default)]
pub struct QuestLog {
    progress: HashMap<String, QuestProgress>,
}

impl QuestLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of a quest; quests never touched are `NotStarted`
    pub fn status(&self, quest_id: &str) -> QuestStatus {
        self.progress
            .get(quest_id)
            .map(|p| p.status)
            .unwrap_or_default()
    }

    pub fn get(&self, quest_id: &str) -> Option<&QuestProgress> {
        self.progress.get(quest_id)
    }

    pub fn entry(&mut self, quest_id: &str) -> &mut QuestProgress {
        self.progress.entry(quest_id.to_string()).or_default()
    }

    /// Quest ids currently in the given status
    pub fn ids_with_status(&self, status: QuestStatus) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .progress
            .iter()
            .filter(|(_, p)| p.status == status)
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}
