//! Interaction Coordinator
//!
//! Top-level glue between the world and the dialogue core. Decides what
//! talking to an NPC does, owns the active dialogue session, and keeps the
//! world paused while a dialogue or trade screen is open.

use tracing::{debug, info, warn};

use crate::config::{DEFAULT_INTERACTION_RANGE, GameConfig};
use crate::dialogue::{DialogueEngine, DialogueSession, DialogueTree, Flow, TreeKey};
use crate::error::{DataError, DialogueError, TradeError};
use crate::item::{Inventory, InventoryStore};
use crate::npc::NpcDirectory;
use crate::presentation::{PendingChoice, PendingText, PresentationContext, Presenter};
use crate::quest::QuestRegistry;
use crate::shop::{Shop, ShopRegistry, TradeReceipt};

pub struct InteractionCoordinator<P: Presenter> {
    engine: DialogueEngine,
    quests: QuestRegistry,
    inventory: InventoryStore,
    shops: ShopRegistry,
    npcs: NpcDirectory,
    presenter: P,
    /// Present only while the session is waiting on the presenter
    session: Option<DialogueSession>,
    /// Merchant whose trade screen is open
    trade: Option<String>,
    world_paused: bool,
    interaction_range: f32,
    currency_item: String,
}

impl<P: Presenter> InteractionCoordinator<P> {
    pub fn new(
        engine: DialogueEngine,
        quests: QuestRegistry,
        inventory: InventoryStore,
        shops: ShopRegistry,
        npcs: NpcDirectory,
        presenter: P,
    ) -> Self {
        Self {
            engine,
            quests,
            inventory,
            shops,
            npcs,
            presenter,
            session: None,
            trade: None,
            world_paused: false,
            interaction_range: DEFAULT_INTERACTION_RANGE,
            currency_item: "coin".to_string(),
        }
    }

    /// Load all game data under the configured data directory
    pub fn from_config(config: &GameConfig, presenter: P) -> Result<Self, DataError> {
        let mut quests = QuestRegistry::new();
        quests.load_from_directory(&config.data_dir)?;

        let mut engine = DialogueEngine::new();
        engine.load_from_directory(&config.data_dir)?;

        let mut shops = ShopRegistry::new();
        shops.load_from_directory(&config.data_dir)?;

        let mut npcs = NpcDirectory::new();
        npcs.load_from_file(&config.data_dir.join("npcs.toml"))?;

        let mut player = Inventory::new();
        if config.starting_coins > 0 {
            player.add_item(&config.currency_item, config.starting_coins);
        }

        let mut coordinator = Self::new(
            engine,
            quests,
            InventoryStore::new(player),
            shops,
            npcs,
            presenter,
        );
        coordinator.interaction_range = config.interaction_range;
        coordinator.currency_item = config.currency_item.clone();
        coordinator.install_quest_prompts();
        Ok(coordinator)
    }

    /// Register a generated prompt tree for every quest without a quest tree.
    /// Returns how many were added.
    pub fn install_quest_prompts(&mut self) -> usize {
        let mut installed = 0;
        for quest in self.quests.all() {
            let key = TreeKey::Quest(quest.tree_key().to_string());
            if self.engine.has_tree(&key) {
                continue;
            }
            if quest.dialogue_tree.is_some() {
                warn!("Quest '{}' names missing {}, using prompt", quest.id, key);
            }
            self.engine.register_tree(key, DialogueTree::quest_prompt(quest));
            installed += 1;
        }
        debug!("Installed {} quest prompt trees", installed);
        installed
    }

    // ========================================================================
    // Triggers
    // ========================================================================

    /// The player talked to an NPC. Starts its dialogue, else offers its next
    /// quest, else opens its shop if it is a merchant. Returns false if the
    /// NPC had nothing.
    pub fn on_interact(&mut self, npc_id: &str) -> bool {
        let npc_key = TreeKey::npc(npc_id);
        if self.engine.has_tree(&npc_key) {
            return self.start_dialogue(npc_key);
        }

        if let Some(quest) = self.quests.get_quest_for(npc_id) {
            let key = TreeKey::Quest(quest.tree_key().to_string());
            return self.start_dialogue(key);
        }

        let is_merchant = self.npcs.get(npc_id).is_some_and(|npc| npc.merchant);
        if is_merchant && self.shops.contains(npc_id) {
            return self.open_trade(npc_id);
        }

        warn!("NPC '{}' has no dialogue, quest or shop", npc_id);
        false
    }

    /// Interact with the closest NPC within range of a tile
    pub fn interact_nearby(&mut self, x: i32, y: i32) -> bool {
        let Some(npc) = self.npcs.nearest_within(x, y, self.interaction_range) else {
            debug!("No NPC within {} tiles of ({}, {})", self.interaction_range, x, y);
            return false;
        };
        let npc_id = npc.id.clone();
        self.on_interact(&npc_id)
    }

    /// Start a tree, abandoning any active session. Returns false if no tree
    /// is registered under `key`.
    /// An unknown key leaves the active session running.
    pub fn start_dialogue(&mut self, key: TreeKey) -> bool {
        let session = match self.engine.start_dialogue(&key, &mut self.presenter) {
            Ok(session) => session,
            Err(e) => {
                debug!("Dialogue not started: {}", e);
                return false;
            }
        };

        if let Some(previous) = self.session.take() {
            info!("Abandoning dialogue session {} ({})", previous.id(), previous.key());
        }
        if !session.is_terminated() {
            self.session = Some(session);
        }
        self.sync_pause();
        true
    }

    /// Drop the active session without running anything further
    pub fn cancel_dialogue(&mut self) {
        if let Some(session) = self.session.take() {
            info!("Dialogue session {} cancelled", session.id());
        }
        self.sync_pause();
    }

    // ========================================================================
    // Presenter Replies
    // ========================================================================

    pub fn on_text_closed(&mut self, reply: PendingText) -> Result<(), DialogueError> {
        let Some(session) = self.session.as_mut() else {
            warn!("Text reply with no active dialogue");
            return Err(DialogueError::StaleReply);
        };
        let flow = match self.engine.text_closed(session, reply, &mut self.presenter) {
            Ok(flow) => flow,
            Err(e) => {
                warn!("Ignoring text reply: {}", e);
                return Err(e);
            }
        };
        self.after(flow);
        Ok(())
    }

    pub fn on_choice_selected(
        &mut self,
        reply: PendingChoice,
        index: usize,
    ) -> Result<(), DialogueError> {
        let Some(session) = self.session.as_mut() else {
            warn!("Choice reply with no active dialogue");
            return Err(DialogueError::StaleReply);
        };

        let mut ctx = PresentationContext::new(
            &mut self.quests,
            &mut self.inventory,
            &mut self.shops,
            &mut self.presenter,
        );
        let result = self.engine.choice_selected(session, reply, index, &mut ctx);
        let opened_trade = ctx.take_opened_trade();

        if let Some(merchant_id) = opened_trade {
            self.trade = Some(merchant_id);
        }
        let flow = match result {
            Ok(flow) => flow,
            Err(e) => {
                warn!("Ignoring choice reply: {}", e);
                self.sync_pause();
                return Err(e);
            }
        };
        self.after(flow);
        Ok(())
    }

    fn after(&mut self, flow: Flow) {
        match flow {
            Flow::Suspended => {}
            Flow::Ended => self.session = None,
            Flow::Handoff(key) => {
                self.session = None;
                self.start_dialogue(key);
            }
        }
        self.sync_pause();
    }

    // ========================================================================
    // Trade & Inventory
    // ========================================================================

    /// Open a merchant's trade screen
    pub fn open_trade(&mut self, merchant_id: &str) -> bool {
        let Some(shop) = self.shops.get(merchant_id) else {
            warn!("No shop for merchant '{}'", merchant_id);
            return false;
        };
        self.inventory.set_counterpart(&shop.id, shop.stock.clone());
        self.presenter.open_trade(shop, self.inventory.player());
        self.trade = Some(merchant_id.to_string());
        self.sync_pause();
        true
    }

    /// Close the trade screen. Returns false if none was open.
    pub fn close_trade(&mut self) -> bool {
        let closed = self.trade.take().is_some();
        self.inventory.clear_counterpart();
        self.sync_pause();
        closed
    }

    pub fn buy(&mut self, item_id: &str, quantity: u32) -> Result<TradeReceipt, TradeError> {
        let result = self.trade_with(|shop, player, currency| {
            shop.buy(player, item_id, quantity, currency)
        });
        if let Err(e) = &result {
            warn!("Purchase of {} x{} failed: {}", item_id, quantity, e);
        }
        result
    }

    pub fn sell(&mut self, item_id: &str, quantity: u32) -> Result<TradeReceipt, TradeError> {
        let result = self.trade_with(|shop, player, currency| {
            shop.sell(player, item_id, quantity, currency)
        });
        if let Err(e) = &result {
            warn!("Sale of {} x{} failed: {}", item_id, quantity, e);
        }
        result
    }

    fn trade_with<F>(&mut self, trade: F) -> Result<TradeReceipt, TradeError>
    where
        F: FnOnce(&mut Shop, &mut Inventory, &str) -> Result<TradeReceipt, TradeError>,
    {
        let merchant_id = self.trade.as_deref().ok_or(TradeError::NoTradeOpen)?;
        let shop = self
            .shops
            .get_mut(merchant_id)
            .ok_or_else(|| TradeError::UnknownMerchant(merchant_id.to_string()))?;

        let receipt = trade(shop, self.inventory.player_mut(), &self.currency_item)?;

        self.inventory.set_counterpart(&shop.id, shop.stock.clone());
        self.presenter
            .open_inventory(self.inventory.player(), self.inventory.counterpart());
        Ok(receipt)
    }

    pub fn open_inventory(&mut self) {
        self.presenter
            .open_inventory(self.inventory.player(), self.inventory.counterpart());
    }

    fn sync_pause(&mut self) {
        let paused = self.session.is_some() || self.trade.is_some();
        if paused != self.world_paused {
            self.world_paused = paused;
            if paused {
                info!("World paused");
            } else {
                info!("World resumed");
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn is_world_paused(&self) -> bool {
        self.world_paused
    }

    pub fn session(&self) -> Option<&DialogueSession> {
        self.session.as_ref()
    }

    pub fn active_trade(&self) -> Option<&str> {
        self.trade.as_deref()
    }

    pub fn engine(&self) -> &DialogueEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut DialogueEngine {
        &mut self.engine
    }

    pub fn quests(&self) -> &QuestRegistry {
        &self.quests
    }

    pub fn quests_mut(&mut self) -> &mut QuestRegistry {
        &mut self.quests
    }

    pub fn inventory(&self) -> &InventoryStore {
        &self.inventory
    }

    pub fn shops(&self) -> &ShopRegistry {
        &self.shops
    }

    pub fn npcs(&self) -> &NpcDirectory {
        &self.npcs
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn currency_item(&self) -> &str {
        &self.currency_item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{DialogueNode, DialogueOption};
    use crate::npc::NpcDefinition;
    use crate::presentation::testing::{RecordingPresenter, Shown};
    use crate::quest::{Quest, QuestStatus, Reward};
    use tempfile::TempDir;

    fn help_tree() -> DialogueTree {
        DialogueTree::new("greeting")
            .with_node(
                "greeting",
                DialogueNode::choice(
                    "Help me?",
                    vec![
                        DialogueOption::new("Yes")
                            .with_action(|ctx| {
                                ctx.accept_quest("q1");
                            })
                            .with_next("thanks"),
                        DialogueOption::new("No").with_next("bye"),
                    ],
                ),
            )
            .with_node("thanks", DialogueNode::text(&["Thank you!"]))
            .with_node("bye", DialogueNode::text(&["Ok."]))
    }

    fn merchant_tree() -> DialogueTree {
        DialogueTree::new("greeting")
            .with_node(
                "greeting",
                DialogueNode::choice(
                    "What can I do for you?",
                    vec![
                        DialogueOption::new("Do you have a quest for me?")
                            .with_action(|ctx| {
                                ctx.start_quest("merchantQuest");
                            })
                            .with_next("close"),
                        DialogueOption::new("Show me your wares")
                            .with_action(|ctx| {
                                ctx.open_trade("merchant1");
                            })
                            .with_next("close"),
                    ],
                ),
            )
            .with_node("close", DialogueNode::text(&["Safe travels!"]))
    }

    fn coordinator() -> InteractionCoordinator<RecordingPresenter> {
        let mut engine = DialogueEngine::new();
        engine.register_tree(TreeKey::npc("npc1"), help_tree());
        engine.register_tree(TreeKey::npc("merchant1"), merchant_tree());

        let mut quests = QuestRegistry::new();
        quests.register(Quest::new(
            "q1",
            "npc1",
            "Help me?",
            "Yes",
            "No",
            Reward::new("coin", 5),
        ));
        quests.register(Quest::new(
            "quest2",
            "npc2",
            "Will you help me?",
            "Of course",
            "Not now",
            Reward::new("coin", 5),
        ));
        quests.register(Quest::new(
            "merchantQuest",
            "merchant1",
            "Fetch my herbs?",
            "Sure",
            "No thanks",
            Reward::new("potion", 1),
        ));

        let mut shops = ShopRegistry::new();
        shops.insert(
            Shop::new("merchant1", "Merchant")
                .with_offer("potion", 10, 5)
                .with_stock("potion", 3),
        );
        shops.insert(
            Shop::new("merchant2", "Quiet Merchant")
                .with_offer("potion", 10, 5)
                .with_stock("potion", 1),
        );
        shops.insert(
            Shop::new("stall", "Empty Stall")
                .with_offer("potion", 10, 5)
                .with_stock("potion", 1),
        );

        let mut npcs = NpcDirectory::new();
        npcs.insert(NpcDefinition::new("npc1", "Elder", 5, 5));
        npcs.insert(NpcDefinition::new("npc2", "Villager", 20, 20));
        npcs.insert(NpcDefinition::new("merchant2", "Quiet Merchant", 40, 40).merchant());
        npcs.insert(NpcDefinition::new("stall", "Empty Stall", 50, 50));

        let mut coordinator = InteractionCoordinator::new(
            engine,
            quests,
            InventoryStore::default(),
            shops,
            npcs,
            RecordingPresenter::new(),
        );
        coordinator.install_quest_prompts();
        coordinator
    }

    fn choose(c: &mut InteractionCoordinator<RecordingPresenter>, index: usize) {
        let reply = c.presenter_mut().take_choice();
        c.on_choice_selected(reply, index).unwrap();
    }

    fn close_text(c: &mut InteractionCoordinator<RecordingPresenter>) {
        let reply = c.presenter_mut().take_text();
        c.on_text_closed(reply).unwrap();
    }

    #[test]
    fn test_accept_scenario() {
        let mut c = coordinator();
        assert!(c.on_interact("npc1"));
        assert!(c.is_world_paused());

        choose(&mut c, 0);
        assert_eq!(c.quests().status("q1"), Some(QuestStatus::Accepted));
        assert_eq!(c.inventory().find_stack("coin").unwrap().quantity, 5);
        assert_eq!(
            c.presenter().texts().last().unwrap(),
            &vec!["Thank you!".to_string()]
        );
        assert!(c.is_world_paused());

        close_text(&mut c);
        assert!(c.session().is_none());
        assert!(!c.is_world_paused());

        // Talking again replays the tree but never pays twice
        c.on_interact("npc1");
        choose(&mut c, 0);
        assert_eq!(c.inventory().find_stack("coin").unwrap().quantity, 5);
    }

    #[test]
    fn test_decline_scenario() {
        let mut c = coordinator();
        c.on_interact("npc1");
        choose(&mut c, 1);

        assert_eq!(c.quests().status("q1"), Some(QuestStatus::NotStarted));
        assert!(c.inventory().find_stack("coin").is_none());
        assert_eq!(c.presenter().texts(), vec![vec!["Ok.".to_string()]]);
    }

    #[test]
    fn test_quest_prompt_fallback() {
        let mut c = coordinator();
        assert!(c.on_interact("npc2"));
        assert_eq!(
            c.presenter().shown.last(),
            Some(&Shown::Choice {
                question: "Will you help me?".to_string(),
                options: vec!["Of course".to_string(), "Not now".to_string()],
            })
        );

        // Declining ends the conversation at once
        choose(&mut c, 1);
        assert_eq!(c.quests().status("quest2"), Some(QuestStatus::Declined));
        assert!(!c.is_world_paused());

        // A declined quest is offered again
        assert!(c.on_interact("npc2"));
        choose(&mut c, 0);
        assert_eq!(c.quests().status("quest2"), Some(QuestStatus::Accepted));
        assert_eq!(
            c.presenter().texts().last().unwrap(),
            &vec![crate::quest::definition::DEFAULT_THANKS_TEXT.to_string()]
        );
        close_text(&mut c);

        // Nothing left to offer
        assert!(!c.on_interact("npc2"));
        assert!(!c.is_world_paused());
    }

    #[test]
    fn test_replacing_session_abandons_previous() {
        let mut c = coordinator();
        c.on_interact("npc1");
        let abandoned = c.presenter_mut().take_choice();

        c.on_interact("npc2");
        assert_eq!(
            c.on_choice_selected(abandoned, 0),
            Err(DialogueError::StaleReply)
        );
        assert_eq!(c.quests().status("q1"), Some(QuestStatus::NotStarted));
        assert!(c.is_world_paused());

        c.cancel_dialogue();
        assert!(!c.is_world_paused());
        assert!(c.session().is_none());
    }

    #[test]
    fn test_unknown_targets_leave_world_running() {
        let mut c = coordinator();
        assert!(!c.start_dialogue(TreeKey::npc("ghost")));
        assert!(!c.on_interact("ghost"));
        assert!(!c.is_world_paused());
    }

    #[test]
    fn test_invalid_choice_keeps_waiting() {
        let mut c = coordinator();
        c.on_interact("npc1");
        let reply = c.presenter_mut().take_choice();
        assert_eq!(
            c.on_choice_selected(reply, 9),
            Err(DialogueError::InvalidChoice { index: 9, options: 2 })
        );
        assert!(c.is_world_paused());
        choose(&mut c, 0);
        assert_eq!(c.quests().status("q1"), Some(QuestStatus::Accepted));
    }

    #[test]
    fn test_handoff_to_quest_prompt() {
        let mut c = coordinator();
        c.on_interact("merchant1");
        let first = c.session().unwrap().id();

        choose(&mut c, 0);
        let session = c.session().unwrap();
        assert_ne!(session.id(), first);
        assert_eq!(session.key(), &TreeKey::quest("merchantQuest"));
        assert!(c.presenter().texts().is_empty());

        choose(&mut c, 0);
        assert_eq!(c.quests().status("merchantQuest"), Some(QuestStatus::Accepted));
        assert_eq!(c.inventory().find_stack("potion").unwrap().quantity, 1);
    }

    #[test]
    fn test_trade_from_dialogue() {
        let mut c = coordinator();
        c.inventory.add_item("coin", 30);
        c.on_interact("merchant1");
        choose(&mut c, 1);

        assert_eq!(c.active_trade(), Some("merchant1"));
        assert_eq!(c.inventory().counterpart().unwrap().owner_id, "merchant1");
        close_text(&mut c);
        assert!(c.session().is_none());
        // Trade screen still holds the pause
        assert!(c.is_world_paused());

        let receipt = c.buy("potion", 2).unwrap();
        assert_eq!(receipt.coins, 20);
        assert_eq!(c.inventory().find_stack("coin").unwrap().quantity, 10);
        assert_eq!(c.shops().get("merchant1").unwrap().stock.count("potion"), 1);
        assert_eq!(
            c.inventory().counterpart().unwrap().inventory.count("potion"),
            1
        );

        assert!(c.buy("potion", 2).is_err());
        assert_eq!(c.inventory().find_stack("coin").unwrap().quantity, 10);

        assert!(c.close_trade());
        assert!(!c.is_world_paused());
        assert!(c.inventory().counterpart().is_none());
        assert_eq!(c.buy("potion", 1), Err(TradeError::NoTradeOpen));
    }

    #[test]
    fn test_merchant_without_dialogue_opens_shop() {
        let mut c = coordinator();
        assert!(c.on_interact("merchant2"));
        assert_eq!(c.active_trade(), Some("merchant2"));
        assert!(c.is_world_paused());
        assert_eq!(
            c.presenter().shown.last(),
            Some(&Shown::Trade("merchant2".to_string()))
        );
    }

    #[test]
    fn test_shop_needs_merchant_npc() {
        let mut c = coordinator();
        assert!(!c.on_interact("stall"));
        assert!(c.active_trade().is_none());
        assert!(!c.is_world_paused());

        // Dialogue actions can still open it
        assert!(c.open_trade("stall"));
        assert_eq!(c.active_trade(), Some("stall"));
    }

    #[test]
    fn test_unknown_tree_keeps_active_session() {
        let mut c = coordinator();
        c.on_interact("npc1");
        let before = c.session().unwrap().id();

        assert!(!c.start_dialogue(TreeKey::npc("ghost")));
        assert_eq!(c.session().unwrap().id(), before);
        assert!(c.is_world_paused());

        choose(&mut c, 0);
        assert_eq!(c.quests().status("q1"), Some(QuestStatus::Accepted));
    }

    #[test]
    fn test_interact_nearby() {
        let mut c = coordinator();
        assert!(!c.interact_nearby(10, 10));
        assert!(c.interact_nearby(6, 6));
        assert_eq!(c.session().unwrap().key(), &TreeKey::npc("npc1"));
    }

    #[test]
    fn test_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path();
        std::fs::create_dir(data_dir.join("quests")).unwrap();
        std::fs::write(
            data_dir.join("quests").join("quest2.toml"),
            r#"
[quest]
id = "quest2"
npc_id = "npc2"
prompt = "Will you help me?"
accept_text = "Yes"
decline_text = "No"

[quest.reward]
item = "coin"
quantity = 5
"#,
        )
        .unwrap();
        std::fs::write(
            data_dir.join("npcs.toml"),
            "[[npc]]\nid = \"npc2\"\ndisplay_name = \"Villager\"\nx = 1\ny = 1\n",
        )
        .unwrap();

        let config = GameConfig {
            data_dir: data_dir.to_path_buf(),
            starting_coins: 40,
            ..GameConfig::default()
        };
        let mut c = InteractionCoordinator::from_config(&config, RecordingPresenter::new()).unwrap();
        assert_eq!(c.inventory().find_stack("coin").unwrap().quantity, 40);
        assert!(c.engine().has_tree(&TreeKey::quest("quest2")));

        assert!(c.interact_nearby(2, 2));
        choose(&mut c, 0);
        assert_eq!(c.inventory().find_stack("coin").unwrap().quantity, 45);
    }

    #[test]
    fn test_bundled_data() {
        let config = GameConfig {
            data_dir: std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data"),
            ..GameConfig::default()
        };
        let mut c = InteractionCoordinator::from_config(&config, RecordingPresenter::new()).unwrap();
        assert_eq!(c.quests().len(), 2);
        assert!(c.engine().has_tree(&TreeKey::quest("merchant1-quest")));
        assert!(c.engine().has_tree(&TreeKey::quest("quest2")));

        // The merchant hands over to its hand-written quest tree
        assert!(c.on_interact("merchant1"));
        choose(&mut c, 0);
        assert_eq!(
            c.session().unwrap().key(),
            &TreeKey::quest("merchant1-quest")
        );
        close_text(&mut c);
        choose(&mut c, 0);
        assert_eq!(
            c.quests().status("merchant1Quest"),
            Some(QuestStatus::Accepted)
        );
        assert_eq!(c.inventory().find_stack("potion").unwrap().quantity, 1);
    }
}
