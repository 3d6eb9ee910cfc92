//! Quest System Module
//!
//! Quest definitions loaded from TOML, the per-quest lifecycle
//! (not started / accepted / declined / completed) and reward granting.

pub mod definition;
pub mod events;
pub mod registry;
pub mod state;

pub use definition::{Quest, Reward};
pub use events::QuestEvent;
pub use registry::{AcceptOutcome, QuestRegistry};
pub use state::{QuestLog, QuestProgress, QuestStatus};
