//! Error Types
//!
//! Typed failures for the inventory, quest, dialogue and trade subsystems.

use std::path::PathBuf;
use thiserror::Error;

use crate::dialogue::TreeKey;
use crate::quest::QuestStatus;

/// Failures from mutating a stack-based inventory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// No single stack holds the requested amount
    #[error("insufficient quantity of '{item_id}': requested {requested}, available {available}")]
    InsufficientQuantity {
        item_id: String,
        requested: u32,
        available: u32,
    },
}

/// Failures from quest registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestError {
    #[error("unknown quest '{0}'")]
    UnknownQuest(String),

    /// `complete` was called on a quest that is not currently accepted
    #[error("quest '{quest_id}' cannot be completed while {status:?}")]
    NotAccepted {
        quest_id: String,
        status: QuestStatus,
    },
}

/// Failures from starting or resuming a dialogue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogueError {
    #[error("no dialogue tree registered for {0}")]
    UnknownTree(TreeKey),

    /// A reply arrived for a session that is no longer active
    #[error("reply for an inactive dialogue session")]
    StaleReply,

    /// A reply arrived that does not match what the session is waiting for
    #[error("dialogue session is not waiting for this reply")]
    UnexpectedReply,

    #[error("choice {index} is out of range ({options} options)")]
    InvalidChoice { index: usize, options: usize },
}

/// Failures from buying or selling with a merchant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeError {
    #[error("unknown merchant '{0}'")]
    UnknownMerchant(String),

    #[error("'{item_id}' is not traded by '{merchant_id}'")]
    NotTraded {
        merchant_id: String,
        item_id: String,
    },

    #[error("no trade screen is open")]
    NoTradeOpen,

    #[error("trade quantity must be at least 1")]
    InvalidQuantity,

    #[error("no room for more '{item_id}'")]
    StackFull { item_id: String },

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// Failures while loading game data from disk
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid definition in {path:?}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
