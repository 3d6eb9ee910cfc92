//! Dialogue System
//!
//! Branching NPC conversations: tree definitions, JSON loading, sessions and
//! the engine that walks them.

mod engine;
mod script;
mod session;
mod tree;

pub use engine::{DialogueEngine, Flow};
pub use script::{RawDialogueNode, RawDialogueOption, RawDialogueTree, ScriptedAction};
pub use session::{DialogueSession, SessionId, SessionState};
pub use tree::{ActionFn, DialogueNode, DialogueOption, DialogueTree, NodeKey, TreeKey};
