//! Dialogue, quest and inventory core for the isometric RPG.
//!
//! NPC conversations are dialogue trees walked by a [`dialogue::DialogueEngine`];
//! choices run actions that accept quests through the [`quest::QuestRegistry`],
//! which grants rewards into the [`item::InventoryStore`]. The
//! [`interaction::InteractionCoordinator`] ties these to NPC interactions and
//! pauses the world while a panel is open.

pub mod config;
pub mod console;
pub mod data;
pub mod dialogue;
pub mod error;
pub mod interaction;
pub mod item;
pub mod npc;
pub mod presentation;
pub mod quest;
pub mod shop;

pub use config::GameConfig;
pub use interaction::InteractionCoordinator;
pub use presentation::{PendingChoice, PendingText, PresentationContext, Presenter};
