//! Quest Registry
//!
//! Loads quest definitions from TOML files and owns the player's quest state.
//! Every state change goes through `accept`, `decline` or `complete`.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use super::definition::{Quest, RawQuestFile};
use super::events::QuestEvent;
use super::state::{QuestLog, QuestStatus};
use crate::data;
use crate::dialogue::DialogueTree;
use crate::error::{DataError, QuestError};
use crate::item::InventoryStore;
use crate::presentation::Presenter;

/// Result of a successful `accept`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The quest moved to `Accepted`
    Accepted { reward_granted: bool },
    /// The quest was already accepted; nothing changed
    AlreadyAccepted,
    /// The quest was already completed; nothing changed
    AlreadyCompleted,
}

/// Registry for all quest definitions and their state
pub struct QuestRegistry {
    /// Definitions in load order
    quests: Vec<Quest>,
    /// quest_id -> index into `quests`
    index: HashMap<String, usize>,
    log: QuestLog,
    events: Vec<QuestEvent>,
}

impl QuestRegistry {
    pub fn new() -> Self {
        Self {
            quests: Vec::new(),
            index: HashMap::new(),
            log: QuestLog::new(),
            events: Vec::new(),
        }
    }

    /// Load all quest definitions from `<data_dir>/quests`
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<usize, DataError> {
        let quests_dir = data_dir.join("quests");
        info!("Loading quests from {:?}", quests_dir);

        if !quests_dir.exists() {
            warn!("Quest directory does not exist: {:?}", quests_dir);
            return Ok(0);
        }

        let mut count = 0;
        for path in data::files_with_extension(&quests_dir, "toml")? {
            let raw: RawQuestFile = data::read_toml(&path)?;
            let quest = Quest::from_raw(&raw.quest).map_err(|reason| DataError::Invalid {
                path: path.clone(),
                reason,
            })?;
            info!("Loaded quest: {} (from {:?})", quest.id, path);
            self.register(quest);
            count += 1;
        }

        info!("Loaded {} quest definitions", count);
        Ok(count)
    }

    /// Add a quest definition, replacing any definition with the same id in place
    pub fn register(&mut self, quest: Quest) {
        match self.index.get(&quest.id) {
            Some(&i) => {
                warn!("Duplicate quest ID '{}', overwriting", quest.id);
                self.quests[i] = quest;
            }
            None => {
                self.index.insert(quest.id.clone(), self.quests.len());
                self.quests.push(quest);
            }
        }
    }

    /// Get a quest by ID
    pub fn get(&self, quest_id: &str) -> Option<&Quest> {
        self.index.get(quest_id).map(|&i| &self.quests[i])
    }

    /// All quests in load order
    pub fn all(&self) -> impl Iterator<Item = &Quest> {
        self.quests.iter()
    }

    /// Get quests offered by a specific NPC, regardless of state
    pub fn quests_for_npc<'a, 'b>(
        &'a self,
        npc_id: &'b str,
    ) -> impl Iterator<Item = &'a Quest> + use<'a, 'b> {
        self.quests.iter().filter(move |q| q.npc_id == npc_id)
    }

    /// First quest bound to `npc_id` that can still be offered
    /// (`NotStarted` or `Declined`), in load order
    pub fn get_quest_for(&self, npc_id: &str) -> Option<&Quest> {
        self.quests_for_npc(npc_id)
            .find(|q| self.log.status(&q.id).is_offerable())
    }

    /// Current status, or `None` for an unknown quest
    pub fn status(&self, quest_id: &str) -> Option<QuestStatus> {
        self.get(quest_id).map(|q| self.log.status(&q.id))
    }

    pub fn log(&self) -> &QuestLog {
        &self.log
    }

    /// Generated accept/decline dialogue for a quest
    pub fn prompt_tree(&self, quest_id: &str) -> Option<DialogueTree> {
        self.get(quest_id).map(DialogueTree::quest_prompt)
    }

    /// Accept a quest and grant its reward.
    ///
    /// The reward is granted at most once over the quest's lifetime; accepting
    /// an accepted or completed quest is a no-op. When a reward is granted the
    /// presenter is asked to show the updated inventory.
    pub fn accept(
        &mut self,
        quest_id: &str,
        inventory: &mut InventoryStore,
        presenter: &mut dyn Presenter,
    ) -> Result<AcceptOutcome, QuestError> {
        let quest = self
            .get(quest_id)
            .ok_or_else(|| QuestError::UnknownQuest(quest_id.to_string()))?;
        let reward = quest.reward.clone();

        let progress = self.log.entry(quest_id);
        match progress.status {
            QuestStatus::Accepted => return Ok(AcceptOutcome::AlreadyAccepted),
            QuestStatus::Completed => return Ok(AcceptOutcome::AlreadyCompleted),
            QuestStatus::NotStarted | QuestStatus::Declined => {}
        }

        progress.accept();
        let grant = !progress.reward_granted;
        progress.reward_granted = true;

        info!("Quest accepted: {}", quest_id);
        self.events.push(QuestEvent::QuestAccepted {
            quest_id: quest_id.to_string(),
        });

        if grant {
            inventory.add_item(&reward.item_id, reward.quantity);
            self.events.push(QuestEvent::RewardGranted {
                quest_id: quest_id.to_string(),
                item_id: reward.item_id.clone(),
                quantity: reward.quantity,
            });
            info!(
                "Granted {}x{} for quest {}",
                reward.quantity, reward.item_id, quest_id
            );
            presenter.open_inventory(inventory.player(), inventory.counterpart());
        } else {
            debug!("Quest {} re-accepted, reward already granted", quest_id);
        }

        Ok(AcceptOutcome::Accepted {
            reward_granted: grant,
        })
    }

    /// Decline a quest. Returns whether the status changed; declining an
    /// accepted or completed quest leaves it as it is.
    pub fn decline(&mut self, quest_id: &str) -> Result<bool, QuestError> {
        if self.get(quest_id).is_none() {
            return Err(QuestError::UnknownQuest(quest_id.to_string()));
        }

        let progress = self.log.entry(quest_id);
        match progress.status {
            QuestStatus::NotStarted | QuestStatus::Declined => {
                progress.decline();
                info!("Quest declined: {}", quest_id);
                self.events.push(QuestEvent::QuestDeclined {
                    quest_id: quest_id.to_string(),
                });
                Ok(true)
            }
            status => {
                debug!("Ignoring decline of quest {} while {:?}", quest_id, status);
                Ok(false)
            }
        }
    }

    /// Complete an accepted quest
    pub fn complete(&mut self, quest_id: &str) -> Result<(), QuestError> {
        if self.get(quest_id).is_none() {
            return Err(QuestError::UnknownQuest(quest_id.to_string()));
        }

        let progress = self.log.entry(quest_id);
        if progress.status != QuestStatus::Accepted {
            return Err(QuestError::NotAccepted {
                quest_id: quest_id.to_string(),
                status: progress.status,
            });
        }

        progress.complete();
        info!("Quest completed: {}", quest_id);
        self.events.push(QuestEvent::QuestCompleted {
            quest_id: quest_id.to_string(),
        });
        Ok(())
    }

    /// Take all events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<QuestEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get count of loaded quests
    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }
}

impl Default for QuestRegistry {
    fn default() -> Self {
        Self::new()
    }
}
