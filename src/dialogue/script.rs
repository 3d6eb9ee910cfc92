//! Dialogue Data Files
//!
//! Dialogue trees are stored as JSON (`{start, nodes}`), with option actions
//! written declaratively and compiled into action closures on load.

use std::collections::HashMap;

use serde::Deserialize;

use super::tree::{DialogueNode, DialogueOption, DialogueTree, TreeKey};
use crate::presentation::PresentationContext;

/// A dialogue tree as it appears in JSON
#[derive(Debug, Clone, Deserialize)]
pub struct RawDialogueTree {
    pub start: String,
    pub nodes: HashMap<String, RawDialogueNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawDialogueNode {
    Text {
        lines: Vec<String>,
        #[serde(default)]
        next: Option<String>,
    },
    Choice {
        question: String,
        options: Vec<RawDialogueOption>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDialogueOption {
    pub text: String,
    /// Run in order when the option is picked
    #[serde(default)]
    pub actions: Vec<ScriptedAction>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Declarative option action
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedAction {
    AcceptQuest(String),
    DeclineQuest(String),
    CompleteQuest(String),
    GiveItem {
        item: String,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
    OpenInventory,
    OpenTrade(String),
    /// Hand over to the quest's offer dialogue
    StartQuest(String),
    /// Hand over to another NPC's dialogue
    StartDialogue(String),
}

fn default_quantity() -> u32 {
    1
}

impl ScriptedAction {
    pub fn apply(&self, ctx: &mut PresentationContext<'_>) {
        match self {
            ScriptedAction::AcceptQuest(id) => {
                ctx.accept_quest(id);
            }
            ScriptedAction::DeclineQuest(id) => {
                ctx.decline_quest(id);
            }
            ScriptedAction::CompleteQuest(id) => {
                ctx.complete_quest(id);
            }
            ScriptedAction::GiveItem { item, quantity } => ctx.give_item(item, *quantity),
            ScriptedAction::OpenInventory => ctx.open_inventory(),
            ScriptedAction::OpenTrade(merchant_id) => {
                ctx.open_trade(merchant_id);
            }
            ScriptedAction::StartQuest(id) => {
                ctx.start_quest(id);
            }
            ScriptedAction::StartDialogue(npc_id) => ctx.start_dialogue(TreeKey::npc(npc_id)),
        }
    }
}

impl DialogueOption {
    fn from_raw(raw: &RawDialogueOption) -> Result<Self, String> {
        for action in &raw.actions {
            if let ScriptedAction::GiveItem { item, quantity: 0 } = action {
                return Err(format!("option '{}' gives zero '{}'", raw.text, item));
            }
        }

        let mut option = DialogueOption::new(&raw.text);
        option.next = raw.next.clone();
        if !raw.actions.is_empty() {
            let actions = raw.actions.clone();
            option = option.with_action(move |ctx| {
                for action in &actions {
                    action.apply(ctx);
                }
            });
        }
        Ok(option)
    }
}

impl DialogueTree {
    /// Build a tree from JSON data
    pub fn from_raw(raw: &RawDialogueTree) -> Result<Self, String> {
        let mut tree = DialogueTree::new(&raw.start);
        for (key, node) in &raw.nodes {
            let node = match node {
                RawDialogueNode::Text { lines, next } => DialogueNode::Text {
                    lines: lines.clone(),
                    next: next.clone(),
                },
                RawDialogueNode::Choice { question, options } => {
                    if options.is_empty() {
                        return Err(format!("choice node '{}' has no options", key));
                    }
                    DialogueNode::Choice {
                        question: question.clone(),
                        options: options
                            .iter()
                            .map(DialogueOption::from_raw)
                            .collect::<Result<Vec<_>, _>>()?,
                    }
                }
            };
            tree = tree.with_node(key, node);
        }
        Ok(tree)
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let raw: RawDialogueTree =
            serde_json::from_str(json).map_err(|e| format!("invalid dialogue JSON: {}", e))?;
        Self::from_raw(&raw)
    }
}
