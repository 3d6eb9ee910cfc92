//! Dialogue Tree Structures
//!
//! A tree is a graph of text and choice nodes keyed by name, with a start node.
//! Trees are immutable once registered with the engine.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::presentation::PresentationContext;
use crate::quest::Quest;

/// Name of a node within one tree
pub type NodeKey = String;

/// Side effect attached to a choice option
pub type ActionFn = Rc<dyn Fn(&mut PresentationContext<'_>)>;

/// Which registry a tree lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TreeKey {
    /// Conversation started by talking to an NPC
    Npc(String),
    /// Conversation that offers a quest
    Quest(String),
}

impl TreeKey {
    pub fn npc(id: &str) -> Self {
        TreeKey::Npc(id.to_string())
    }

    pub fn quest(id: &str) -> Self {
        TreeKey::Quest(id.to_string())
    }
}

impl fmt::Display for TreeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeKey::Npc(id) => write!(f, "npc tree '{}'", id),
            TreeKey::Quest(id) => write!(f, "quest tree '{}'", id),
        }
    }
}

/// One selectable answer of a choice node
#[derive(Clone)]
pub struct DialogueOption {
    pub text: String,
    pub action: Option<ActionFn>,
    pub next: Option<NodeKey>,
}

impl DialogueOption {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            action: None,
            next: None,
        }
    }

    pub fn with_next(mut self, next: &str) -> Self {
        self.next = Some(next.to_string());
        self
    }

    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut PresentationContext<'_>) + 'static,
    {
        self.action = Some(Rc::new(action));
        self
    }
}

impl fmt::Debug for DialogueOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogueOption")
            .field("text", &self.text)
            .field("action", &self.action.as_ref().map(|_| "<action>"))
            .field("next", &self.next)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum DialogueNode {
    /// Lines shown in order, then optionally continue to `next`
    Text {
        lines: Vec<String>,
        next: Option<NodeKey>,
    },
    /// A question with one or more options
    Choice {
        question: String,
        options: Vec<DialogueOption>,
    },
}

impl DialogueNode {
    pub fn text(lines: &[&str]) -> Self {
        DialogueNode::Text {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            next: None,
        }
    }

    pub fn text_then(lines: &[&str], next: &str) -> Self {
        DialogueNode::Text {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            next: Some(next.to_string()),
        }
    }

    pub fn choice(question: &str, options: Vec<DialogueOption>) -> Self {
        DialogueNode::Choice {
            question: question.to_string(),
            options,
        }
    }

    /// Keys this node can continue to
    pub fn links(&self) -> Vec<&str> {
        match self {
            DialogueNode::Text { next, .. } => next.as_deref().into_iter().collect(),
            DialogueNode::Choice { options, .. } => {
                options.iter().filter_map(|o| o.next.as_deref()).collect()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DialogueTree {
    start: NodeKey,
    nodes: HashMap<NodeKey, DialogueNode>,
}

impl DialogueTree {
    pub fn new(start: &str) -> Self {
        Self {
            start: start.to_string(),
            nodes: HashMap::new(),
        }
    }

    pub fn with_node(mut self, key: &str, node: DialogueNode) -> Self {
        self.nodes.insert(key.to_string(), node);
        self
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn node(&self, key: &str) -> Option<&DialogueNode> {
        self.nodes.get(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(from, to)` pairs whose target is not a node of this tree, plus
    /// `("", start)` if the start node is missing. Sorted for stable output.
    pub fn dangling_links(&self) -> Vec<(String, String)> {
        let mut dangling = Vec::new();
        if !self.nodes.contains_key(&self.start) {
            dangling.push((String::new(), self.start.clone()));
        }
        for (key, node) in &self.nodes {
            for link in node.links() {
                if !self.nodes.contains_key(link) {
                    dangling.push((key.clone(), link.to_string()));
                }
            }
        }
        dangling.sort();
        dangling
    }

    /// Offer dialogue for a quest with no hand-written tree: ask the prompt,
    /// accept and thank on the first option, decline and end on the second.
    pub fn quest_prompt(quest: &Quest) -> Self {
        let accept_id = quest.id.clone();
        let decline_id = quest.id.clone();

        DialogueTree::new("offer")
            .with_node(
                "offer",
                DialogueNode::choice(
                    &quest.prompt,
                    vec![
                        DialogueOption::new(&quest.accept_text)
                            .with_action(move |ctx| {
                                ctx.accept_quest(&accept_id);
                            })
                            .with_next("accepted"),
                        DialogueOption::new(&quest.decline_text).with_action(move |ctx| {
                            ctx.decline_quest(&decline_id);
                        }),
                    ],
                ),
            )
            .with_node("accepted", DialogueNode::text(&[quest.thanks_text.as_str()]))
    }
}
