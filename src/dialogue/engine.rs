//! Dialogue Engine
//!
//! Holds the registered trees and walks sessions through them. The engine
//! suspends at every text and choice node and resumes only when the reply
//! ticket for that node is handed back. Walking is an explicit loop over the
//! session state, so long chains of nodes never grow the stack.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info, warn};

use super::script::RawDialogueTree;
use super::session::{DialogueSession, SessionState};
use super::tree::{DialogueNode, DialogueTree, TreeKey};
use crate::data;
use crate::error::{DataError, DialogueError};
use crate::presentation::{PendingChoice, PendingText, PresentationContext, Presenter};

/// What a session did after being started or resumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Waiting on a text or choice reply
    Suspended,
    /// Reached the end of the conversation
    Ended,
    /// An action asked for another tree; this session has ended
    Handoff(TreeKey),
}

/// Registry of dialogue trees and the interpreter that walks them
pub struct DialogueEngine {
    npc_trees: HashMap<String, Rc<DialogueTree>>,
    quest_trees: HashMap<String, Rc<DialogueTree>>,
}

impl DialogueEngine {
    pub fn new() -> Self {
        Self {
            npc_trees: HashMap::new(),
            quest_trees: HashMap::new(),
        }
    }

    /// Load trees from `<data_dir>/dialogues/npcs` and `<data_dir>/dialogues/quests`.
    /// Each file's stem is its key.
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<usize, DataError> {
        let dialogues_dir = data_dir.join("dialogues");
        let mut count = 0;

        for (subdir, make_key) in [
            ("npcs", TreeKey::Npc as fn(String) -> TreeKey),
            ("quests", TreeKey::Quest as fn(String) -> TreeKey),
        ] {
            let dir = dialogues_dir.join(subdir);
            if !dir.exists() {
                warn!("Dialogue directory does not exist: {:?}", dir);
                continue;
            }

            for path in data::files_with_extension(&dir, "json")? {
                let Some(name) = data::file_key(&path) else {
                    warn!("Skipping dialogue file with unusable name: {:?}", path);
                    continue;
                };
                let raw: RawDialogueTree = data::read_json(&path)?;
                let tree = DialogueTree::from_raw(&raw).map_err(|reason| DataError::Invalid {
                    path: path.clone(),
                    reason,
                })?;

                for (from, to) in tree.dangling_links() {
                    if from.is_empty() {
                        warn!("Dialogue {:?} starts at missing node '{}'", path, to);
                    } else {
                        warn!("Dialogue {:?}: node '{}' links to missing node '{}'", path, from, to);
                    }
                }

                self.register_tree(make_key(name), tree);
                count += 1;
            }
        }

        info!("Loaded {} dialogue trees", count);
        Ok(count)
    }

    /// Store a tree, replacing any tree already registered under `key`
    pub fn register_tree(&mut self, key: TreeKey, tree: DialogueTree) {
        let (trees, name) = match key {
            TreeKey::Npc(name) => (&mut self.npc_trees, name),
            TreeKey::Quest(name) => (&mut self.quest_trees, name),
        };
        if trees.insert(name.clone(), Rc::new(tree)).is_some() {
            debug!("Replaced dialogue tree '{}'", name);
        }
    }

    pub fn tree(&self, key: &TreeKey) -> Option<&Rc<DialogueTree>> {
        match key {
            TreeKey::Npc(name) => self.npc_trees.get(name),
            TreeKey::Quest(name) => self.quest_trees.get(name),
        }
    }

    pub fn has_tree(&self, key: &TreeKey) -> bool {
        self.tree(key).is_some()
    }

    pub fn tree_count(&self) -> usize {
        self.npc_trees.len() + self.quest_trees.len()
    }

    /// Create a session at the tree's start node and run it to its first
    /// suspension. The returned session may already be terminated (for
    /// example when the start node is missing).
    pub fn start_dialogue(
        &self,
        key: &TreeKey,
        presenter: &mut dyn Presenter,
    ) -> Result<DialogueSession, DialogueError> {
        let Some(tree) = self.tree(key) else {
            warn!("No dialogue tree found for {}", key);
            return Err(DialogueError::UnknownTree(key.clone()));
        };

        let mut session = DialogueSession::new(key.clone(), Rc::clone(tree));
        debug!("Starting dialogue session {} for {}", session.id(), key);
        self.run(&mut session, presenter);
        Ok(session)
    }

    /// The text panel for the session's current node was closed
    pub fn text_closed(
        &self,
        session: &mut DialogueSession,
        reply: PendingText,
        presenter: &mut dyn Presenter,
    ) -> Result<Flow, DialogueError> {
        if reply.session_id() != session.id() {
            return Err(DialogueError::StaleReply);
        }
        match &session.state {
            SessionState::AwaitingText(node) if node == reply.node() => {}
            _ => return Err(DialogueError::UnexpectedReply),
        }

        let next = match session.tree.node(reply.node()) {
            Some(DialogueNode::Text { next, .. }) => next.clone(),
            _ => None,
        };
        match next {
            Some(next) => session.state = SessionState::Running(next),
            None => session.terminate(),
        }

        Ok(self.run(session, presenter))
    }

    /// The player picked option `index` on the session's current choice node.
    ///
    /// The option's action runs to completion before its `next` link is
    /// followed. An out-of-range index re-presents the same choice.
    pub fn choice_selected(
        &self,
        session: &mut DialogueSession,
        reply: PendingChoice,
        index: usize,
        ctx: &mut PresentationContext<'_>,
    ) -> Result<Flow, DialogueError> {
        if reply.session_id() != session.id() {
            return Err(DialogueError::StaleReply);
        }
        match &session.state {
            SessionState::AwaitingChoice(node) if node == reply.node() => {}
            _ => return Err(DialogueError::UnexpectedReply),
        }

        let tree = Rc::clone(&session.tree);
        let Some(DialogueNode::Choice { question, options }) = tree.node(reply.node()) else {
            session.terminate();
            return Ok(Flow::Ended);
        };

        let Some(option) = options.get(index) else {
            warn!(
                "Choice {} out of range for node '{}' ({} options)",
                index,
                reply.node(),
                options.len()
            );
            let texts: Vec<String> = options.iter().map(|o| o.text.clone()).collect();
            let reissued = PendingChoice::new(session.id(), reply.node(), options.len());
            ctx.presenter().show_choice(question, &texts, reissued);
            return Err(DialogueError::InvalidChoice {
                index,
                options: options.len(),
            });
        };

        debug!("Session {} chose '{}'", session.id(), option.text);
        if let Some(action) = &option.action {
            action(ctx);
        }

        if let Some(handoff) = ctx.take_handoff() {
            debug!("Session {} handing off to {}", session.id(), handoff);
            session.terminate();
            return Ok(Flow::Handoff(handoff));
        }

        match &option.next {
            Some(next) => session.state = SessionState::Running(next.clone()),
            None => session.terminate(),
        }

        Ok(self.run(session, ctx.presenter()))
    }

    /// Drive a session forward until it waits on the presenter or ends
    fn run(&self, session: &mut DialogueSession, presenter: &mut dyn Presenter) -> Flow {
        loop {
            let key = match &session.state {
                SessionState::Running(key) => key.clone(),
                SessionState::Terminated => {
                    debug!("Dialogue session {} ended", session.id());
                    return Flow::Ended;
                }
                SessionState::AwaitingText(_) | SessionState::AwaitingChoice(_) => {
                    return Flow::Suspended;
                }
            };

            let tree = Rc::clone(&session.tree);
            let Some(node) = tree.node(&key) else {
                debug!("Node '{}' not found, ending conversation", key);
                session.terminate();
                continue;
            };

            session.visit(&key);
            match node {
                DialogueNode::Text { lines, .. } => {
                    session.state = SessionState::AwaitingText(key.clone());
                    presenter.show_text(lines, PendingText::new(session.id(), &key));
                }
                DialogueNode::Choice { options, .. } if options.is_empty() => {
                    warn!("Choice node '{}' has no options, ending conversation", key);
                    session.terminate();
                }
                DialogueNode::Choice { question, options } => {
                    let texts: Vec<String> = options.iter().map(|o| o.text.clone()).collect();
                    session.state = SessionState::AwaitingChoice(key.clone());
                    presenter.show_choice(
                        question,
                        &texts,
                        PendingChoice::new(session.id(), &key, options.len()),
                    );
                }
            }
        }
    }
}

impl Default for DialogueEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::DialogueOption;
    use crate::item::InventoryStore;
    use crate::presentation::testing::{RecordingPresenter, Shown};
    use crate::quest::{Quest, QuestRegistry, QuestStatus, Reward};
    use crate::shop::ShopRegistry;
    use tempfile::TempDir;

    struct World {
        quests: QuestRegistry,
        inventory: InventoryStore,
        shops: ShopRegistry,
        presenter: RecordingPresenter,
    }

    impl World {
        fn new() -> Self {
            let mut quests = QuestRegistry::new();
            quests.register(Quest::new(
                "q1",
                "npc1",
                "Help me?",
                "Yes",
                "No",
                Reward::new("coin", 5),
            ));
            Self {
                quests,
                inventory: InventoryStore::default(),
                shops: ShopRegistry::new(),
                presenter: RecordingPresenter::new(),
            }
        }

        fn choose(
            &mut self,
            engine: &DialogueEngine,
            session: &mut DialogueSession,
            index: usize,
        ) -> Result<Flow, DialogueError> {
            let reply = self.presenter.take_choice();
            let mut ctx = PresentationContext::new(
                &mut self.quests,
                &mut self.inventory,
                &mut self.shops,
                &mut self.presenter,
            );
            engine.choice_selected(session, reply, index, &mut ctx)
        }

        fn close_text(
            &mut self,
            engine: &DialogueEngine,
            session: &mut DialogueSession,
        ) -> Result<Flow, DialogueError> {
            let reply = self.presenter.take_text();
            engine.text_closed(session, reply, &mut self.presenter)
        }
    }

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

    fn branching_tree() -> DialogueTree {
        DialogueTree::new("a")
            .with_node("a", DialogueNode::text_then(&["A"], "b"))
            .with_node(
                "b",
                DialogueNode::choice(
                    "B?",
                    vec![
                        DialogueOption::new("to c").with_next("c"),
                        DialogueOption::new("to d").with_next("d"),
                    ],
                ),
            )
            .with_node("c", DialogueNode::text_then(&["C"], "b"))
            .with_node("d", DialogueNode::text(&["D"]))
    }

    /// Walk a tree replying with `choices` in order, returning visited nodes
    fn walk(tree: DialogueTree, choices: &[usize]) -> Vec<String> {
        let mut engine = DialogueEngine::new();
        engine.register_tree(TreeKey::npc("npc"), tree);
        let mut world = World::new();
        let mut session = engine
            .start_dialogue(&TreeKey::npc("npc"), &mut world.presenter)
            .unwrap();
        let mut choices = choices.iter();

        while !session.is_terminated() {
            match session.state().clone() {
                SessionState::AwaitingText(_) => {
                    world.close_text(&engine, &mut session).unwrap();
                }
                SessionState::AwaitingChoice(_) => {
                    let index = *choices.next().expect("ran out of choices");
                    world.choose(&engine, &mut session, index).unwrap();
                }
                state => panic!("unexpected state {:?}", state),
            }
        }
        session.visited().to_vec()
    }

    #[test]
    fn test_traversal_is_deterministic() {
        let choices = [0, 0, 1];
        let first = walk(branching_tree(), &choices);
        for _ in 0..5 {
            assert_eq!(walk(branching_tree(), &choices), first);
        }
        assert_eq!(first, vec!["a", "b", "c", "b", "c", "b", "d"]);
    }

    #[test]
    fn test_unknown_tree() {
        let engine = DialogueEngine::new();
        let mut presenter = RecordingPresenter::new();
        let err = engine
            .start_dialogue(&TreeKey::npc("ghost"), &mut presenter)
            .unwrap_err();
        assert_eq!(err, DialogueError::UnknownTree(TreeKey::npc("ghost")));
        assert!(presenter.shown.is_empty());
    }

    #[test]
    fn test_namespaces_are_separate() {
        let mut engine = DialogueEngine::new();
        engine.register_tree(TreeKey::npc("shared"), help_tree());
        assert!(engine.has_tree(&TreeKey::npc("shared")));
        assert!(!engine.has_tree(&TreeKey::quest("shared")));
    }

    #[test]
    fn test_missing_start_node_ends_silently() {
        let mut engine = DialogueEngine::new();
        engine.register_tree(
            TreeKey::npc("broken"),
            DialogueTree::new("nowhere").with_node("elsewhere", DialogueNode::text(&["?"])),
        );
        let mut presenter = RecordingPresenter::new();

        let session = engine
            .start_dialogue(&TreeKey::npc("broken"), &mut presenter)
            .unwrap();

        assert!(session.is_terminated());
        assert!(session.visited().is_empty());
        assert!(presenter.shown.is_empty());
    }

    #[test]
    fn test_missing_next_node_ends_conversation() {
        let mut engine = DialogueEngine::new();
        engine.register_tree(
            TreeKey::npc("npc"),
            DialogueTree::new("a").with_node("a", DialogueNode::text_then(&["A"], "missing")),
        );
        let mut world = World::new();
        let mut session = engine
            .start_dialogue(&TreeKey::npc("npc"), &mut world.presenter)
            .unwrap();

        let flow = world.close_text(&engine, &mut session).unwrap();
        assert_eq!(flow, Flow::Ended);
        assert!(session.is_terminated());
        assert_eq!(world.presenter.shown.len(), 1);
    }

    #[test]
    fn test_choice_without_options_ends_conversation() {
        let mut engine = DialogueEngine::new();
        engine.register_tree(
            TreeKey::npc("npc"),
            DialogueTree::new("a")
                .with_node("a", DialogueNode::text_then(&["A"], "empty"))
                .with_node("empty", DialogueNode::choice("Well?", Vec::new())),
        );
        let mut world = World::new();
        let mut session = engine
            .start_dialogue(&TreeKey::npc("npc"), &mut world.presenter)
            .unwrap();

        let flow = world.close_text(&engine, &mut session).unwrap();
        assert_eq!(flow, Flow::Ended);
        assert!(session.is_terminated());
        assert_eq!(world.presenter.shown.len(), 1);
    }

    #[test]
    fn test_action_runs_before_next_is_presented() {
        let mut world = World::new();
        let journal = Rc::clone(&world.presenter.journal);
        let action_journal = Rc::clone(&journal);

        let mut engine = DialogueEngine::new();
        engine.register_tree(
            TreeKey::npc("npc1"),
            DialogueTree::new("ask")
                .with_node(
                    "ask",
                    DialogueNode::choice(
                        "Help me?",
                        vec![DialogueOption::new("Yes")
                            .with_action(move |ctx| {
                                ctx.accept_quest("q1");
                                let status = ctx.quests().status("q1");
                                action_journal
                                    .borrow_mut()
                                    .push(format!("action:{:?}", status));
                            })
                            .with_next("thanks")],
                    ),
                )
                .with_node("thanks", DialogueNode::text(&["Thank you!"])),
        );

        let mut session = engine
            .start_dialogue(&TreeKey::npc("npc1"), &mut world.presenter)
            .unwrap();
        world.choose(&engine, &mut session, 0).unwrap();

        assert_eq!(
            *journal.borrow(),
            vec![
                "choice:ask".to_string(),
                "inventory".to_string(),
                format!("action:{:?}", Some(QuestStatus::Accepted)),
                "text:thanks".to_string(),
            ]
        );
    }

    #[test]
    fn test_end_to_end_accept() {
        let mut engine = DialogueEngine::new();
        engine.register_tree(TreeKey::npc("npc1"), help_tree());
        let mut world = World::new();

        let mut session = engine
            .start_dialogue(&TreeKey::npc("npc1"), &mut world.presenter)
            .unwrap();
        let flow = world.choose(&engine, &mut session, 0).unwrap();

        assert_eq!(flow, Flow::Suspended);
        assert_eq!(world.quests.status("q1"), Some(QuestStatus::Accepted));
        assert_eq!(world.inventory.find_stack("coin").unwrap().quantity, 5);
        assert_eq!(session.state(), &SessionState::AwaitingText("thanks".to_string()));
        assert_eq!(
            world.presenter.texts().last().unwrap(),
            &vec!["Thank you!".to_string()]
        );

        assert_eq!(world.close_text(&engine, &mut session).unwrap(), Flow::Ended);
        assert_eq!(session.visited(), ["greeting", "thanks"]);
    }

    #[test]
    fn test_end_to_end_decline() {
        let mut engine = DialogueEngine::new();
        engine.register_tree(TreeKey::npc("npc1"), help_tree());
        let mut world = World::new();

        let mut session = engine
            .start_dialogue(&TreeKey::npc("npc1"), &mut world.presenter)
            .unwrap();
        world.choose(&engine, &mut session, 1).unwrap();

        assert_eq!(world.quests.status("q1"), Some(QuestStatus::NotStarted));
        assert!(world.inventory.find_stack("coin").is_none());
        assert_eq!(session.state(), &SessionState::AwaitingText("bye".to_string()));
        assert_eq!(world.presenter.texts(), vec![vec!["Ok.".to_string()]]);
    }

    #[test]
    fn test_invalid_choice_reissues_panel() {
        let mut engine = DialogueEngine::new();
        engine.register_tree(TreeKey::npc("npc1"), help_tree());
        let mut world = World::new();
        let mut session = engine
            .start_dialogue(&TreeKey::npc("npc1"), &mut world.presenter)
            .unwrap();

        let err = world.choose(&engine, &mut session, 7).unwrap_err();
        assert_eq!(err, DialogueError::InvalidChoice { index: 7, options: 2 });
        assert_eq!(
            session.state(),
            &SessionState::AwaitingChoice("greeting".to_string())
        );

        // The reissued ticket still works
        world.choose(&engine, &mut session, 0).unwrap();
        assert_eq!(world.quests.status("q1"), Some(QuestStatus::Accepted));
    }

    #[test]
    fn test_stale_and_mismatched_replies() {
        let mut engine = DialogueEngine::new();
        engine.register_tree(TreeKey::npc("npc1"), help_tree());
        let mut world = World::new();

        let mut old = engine
            .start_dialogue(&TreeKey::npc("npc1"), &mut world.presenter)
            .unwrap();
        let old_reply = world.presenter.take_choice();
        let mut current = engine
            .start_dialogue(&TreeKey::npc("npc1"), &mut world.presenter)
            .unwrap();

        let mut ctx = PresentationContext::new(
            &mut world.quests,
            &mut world.inventory,
            &mut world.shops,
            &mut world.presenter,
        );
        assert_eq!(
            engine.choice_selected(&mut current, old_reply, 0, &mut ctx),
            Err(DialogueError::StaleReply)
        );
        drop(ctx);
        assert_eq!(world.quests.status("q1"), Some(QuestStatus::NotStarted));

        // A text reply while a choice is pending is rejected
        let reply = world.presenter.take_choice();
        let bogus = PendingText::new(current.id(), reply.node());
        assert_eq!(
            engine.text_closed(&mut current, bogus, &mut world.presenter),
            Err(DialogueError::UnexpectedReply)
        );
        assert!(!old.is_terminated());
        old.terminate();
    }

    #[test]
    fn test_handoff_skips_next() {
        let mut engine = DialogueEngine::new();
        engine.register_tree(
            TreeKey::npc("merchant1"),
            DialogueTree::new("greeting")
                .with_node(
                    "greeting",
                    DialogueNode::choice(
                        "What can I do for you?",
                        vec![DialogueOption::new("A quest?")
                            .with_action(|ctx| {
                                ctx.start_quest("q1");
                            })
                            .with_next("close")],
                    ),
                )
                .with_node("close", DialogueNode::text(&["Safe travels!"])),
        );
        let mut world = World::new();
        let mut session = engine
            .start_dialogue(&TreeKey::npc("merchant1"), &mut world.presenter)
            .unwrap();

        let flow = world.choose(&engine, &mut session, 0).unwrap();
        assert_eq!(flow, Flow::Handoff(TreeKey::quest("q1")));
        assert!(session.is_terminated());
        assert!(world.presenter.texts().is_empty());
    }

    #[test]
    fn test_long_linear_chain() {
        let mut tree = DialogueTree::new("n0");
        for i in 0..10_000 {
            tree = tree.with_node(
                &format!("n{}", i),
                DialogueNode::text_then(&["..."], &format!("n{}", i + 1)),
            );
        }
        let mut engine = DialogueEngine::new();
        engine.register_tree(TreeKey::npc("long"), tree);
        let mut world = World::new();
        let mut session = engine
            .start_dialogue(&TreeKey::npc("long"), &mut world.presenter)
            .unwrap();

        let mut closed = 0;
        while !session.is_terminated() {
            world.close_text(&engine, &mut session).unwrap();
            closed += 1;
        }
        assert_eq!(closed, 10_000);
        assert!(matches!(world.presenter.shown.last(), Some(Shown::Text(_))));
    }

    #[test]
    fn test_load_from_directory() {
        let temp_dir = TempDir::new().unwrap();
        let npcs = temp_dir.path().join("dialogues").join("npcs");
        std::fs::create_dir_all(&npcs).unwrap();
        std::fs::write(
            npcs.join("npc2.json"),
            r#"{ "start": "hi", "nodes": { "hi": { "type": "text", "lines": ["Hello!"] } } }"#,
        )
        .unwrap();

        let mut engine = DialogueEngine::new();
        assert_eq!(engine.load_from_directory(temp_dir.path()).unwrap(), 1);
        assert!(engine.has_tree(&TreeKey::npc("npc2")));
        assert!(!engine.has_tree(&TreeKey::quest("npc2")));
    }

    #[test]
    fn test_register_overwrites() {
        let mut engine = DialogueEngine::new();
        engine.register_tree(TreeKey::npc("npc"), help_tree());
        engine.register_tree(
            TreeKey::npc("npc"),
            DialogueTree::new("x").with_node("x", DialogueNode::text(&["new"])),
        );
        assert_eq!(engine.tree_count(), 1);
        assert_eq!(engine.tree(&TreeKey::npc("npc")).unwrap().start(), "x");
    }
}
