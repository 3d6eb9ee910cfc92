//! Presentation Boundary
//!
//! The UI layer implements [`Presenter`] to display text and choice panels.
//! Every panel request carries a one-shot reply ticket; the UI hands the ticket
//! back to the coordinator once the player closes the panel or picks an option.
//! Dialogue actions reach the game through a [`PresentationContext`].

use tracing::{debug, warn};

use crate::dialogue::{SessionId, TreeKey};
use crate::item::{Counterpart, Inventory, InventoryStore};
use crate::quest::{AcceptOutcome, QuestRegistry};
use crate::shop::{Shop, ShopRegistry};

// ============================================================================
// Reply Tickets
// ============================================================================

/// Reply owed for a text panel. Hand it back via `on_text_closed`.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingText {
    session: SessionId,
    node: String,
}

impl PendingText {
    pub(crate) fn new(session: SessionId, node: &str) -> Self {
        Self {
            session,
            node: node.to_string(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Node that produced the panel
    pub fn node(&self) -> &str {
        &self.node
    }
}

/// Reply owed for a choice panel. Hand it back via `on_choice_selected`.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingChoice {
    session: SessionId,
    node: String,
    options: usize,
}

impl PendingChoice {
    pub(crate) fn new(session: SessionId, node: &str, options: usize) -> Self {
        Self {
            session,
            node: node.to_string(),
            options,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    /// Number of options shown with this panel
    pub fn option_count(&self) -> usize {
        self.options
    }
}

// ============================================================================
// Presenter
// ============================================================================

/// UI surface driven by the dialogue core
pub trait Presenter {
    /// Show lines of text. The panel must eventually give `reply` back.
    fn show_text(&mut self, lines: &[String], reply: PendingText);

    /// Show a question with options. The panel must eventually give `reply`
    /// back with the selected index.
    fn show_choice(&mut self, question: &str, options: &[String], reply: PendingChoice);

    /// Advisory: the player's inventory changed and may be shown
    fn open_inventory(&mut self, _player: &Inventory, _counterpart: Option<&Counterpart>) {}

    /// Advisory: a merchant's trade screen was opened
    fn open_trade(&mut self, _shop: &Shop, _player: &Inventory) {}
}

// ============================================================================
// Action Context
// ============================================================================

/// Capabilities handed to dialogue option actions
pub struct PresentationContext<'a> {
    quests: &'a mut QuestRegistry,
    inventory: &'a mut InventoryStore,
    shops: &'a mut ShopRegistry,
    presenter: &'a mut dyn Presenter,
    handoff: Option<TreeKey>,
    opened_trade: Option<String>,
}

impl<'a> PresentationContext<'a> {
    pub fn new(
        quests: &'a mut QuestRegistry,
        inventory: &'a mut InventoryStore,
        shops: &'a mut ShopRegistry,
        presenter: &'a mut dyn Presenter,
    ) -> Self {
        Self {
            quests,
            inventory,
            shops,
            presenter,
            handoff: None,
            opened_trade: None,
        }
    }

    pub fn quests(&self) -> &QuestRegistry {
        &*self.quests
    }

    pub fn inventory(&self) -> &InventoryStore {
        &*self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut InventoryStore {
        &mut *self.inventory
    }

    pub fn presenter(&mut self) -> &mut dyn Presenter {
        &mut *self.presenter
    }

    /// Accept a quest, granting its reward the first time. Returns false if
    /// the quest is unknown.
    pub fn accept_quest(&mut self, quest_id: &str) -> bool {
        match self
            .quests
            .accept(quest_id, &mut *self.inventory, &mut *self.presenter)
        {
            Ok(AcceptOutcome::Accepted { .. }) => true,
            Ok(outcome) => {
                debug!("Accept of quest '{}' was a no-op: {:?}", quest_id, outcome);
                true
            }
            Err(e) => {
                warn!("Dialogue action could not accept quest: {}", e);
                false
            }
        }
    }

    pub fn decline_quest(&mut self, quest_id: &str) -> bool {
        match self.quests.decline(quest_id) {
            Ok(_) => true,
            Err(e) => {
                warn!("Dialogue action could not decline quest: {}", e);
                false
            }
        }
    }

    pub fn complete_quest(&mut self, quest_id: &str) -> bool {
        match self.quests.complete(quest_id) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dialogue action could not complete quest: {}", e);
                false
            }
        }
    }

    /// Add items straight to the player's inventory
    pub fn give_item(&mut self, item_id: &str, quantity: u32) {
        if quantity == 0 {
            warn!("Ignoring zero-quantity grant of '{}'", item_id);
            return;
        }
        self.inventory.add_item(item_id, quantity);
    }

    pub fn open_inventory(&mut self) {
        self.presenter
            .open_inventory(self.inventory.player(), self.inventory.counterpart());
    }

    /// Open a merchant's trade screen. Returns false if the merchant has no shop.
    pub fn open_trade(&mut self, merchant_id: &str) -> bool {
        let Some(shop) = self.shops.get(merchant_id) else {
            warn!("Dialogue action opened unknown shop '{}'", merchant_id);
            return false;
        };
        self.inventory.set_counterpart(&shop.id, shop.stock.clone());
        self.presenter.open_trade(shop, self.inventory.player());
        self.opened_trade = Some(merchant_id.to_string());
        true
    }

    /// Hand the conversation over to another tree once the action returns
    pub fn start_dialogue(&mut self, key: TreeKey) {
        if let Some(previous) = self.handoff.replace(key) {
            debug!("Dialogue hand-off to {} superseded", previous);
        }
    }

    /// Hand the conversation over to a quest's offer dialogue
    pub fn start_quest(&mut self, quest_id: &str) -> bool {
        let Some(quest) = self.quests.get(quest_id) else {
            warn!("Dialogue action started unknown quest '{}'", quest_id);
            return false;
        };
        let key = TreeKey::Quest(quest.tree_key().to_string());
        self.start_dialogue(key);
        true
    }

    pub(crate) fn take_handoff(&mut self) -> Option<TreeKey> {
        self.handoff.take()
    }

    pub(crate) fn take_opened_trade(&mut self) -> Option<String> {
        self.opened_trade.take()
    }
}
