//! Dialogue Sessions
//!
//! One in-progress walk of a dialogue tree.

use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

use super::tree::{DialogueTree, NodeKey, TreeKey};

/// Identity of one session; reply tickets carry it so that replies meant for
/// an abandoned session are recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// About to present this node
    Running(NodeKey),
    /// Text panel for this node is open
    AwaitingText(NodeKey),
    /// Choice panel for this node is open
    AwaitingChoice(NodeKey),
    Terminated,
}

#[derive(Debug)]
pub struct DialogueSession {
    id: SessionId,
    key: TreeKey,
    pub(crate) tree: Rc<DialogueTree>,
    pub(crate) state: SessionState,
    visited: Vec<NodeKey>,
}

impl DialogueSession {
    pub(crate) fn new(key: TreeKey, tree: Rc<DialogueTree>) -> Self {
        let start = tree.start().to_string();
        Self {
            id: SessionId::new(),
            key,
            tree,
            state: SessionState::Running(start),
            visited: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Tree this session walks
    pub fn key(&self) -> &TreeKey {
        &self.key
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Nodes presented so far, in order
    pub fn visited(&self) -> &[NodeKey] {
        &self.visited
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    pub(crate) fn visit(&mut self, key: &str) {
        self.visited.push(key.to_string());
    }

    pub(crate) fn terminate(&mut self) {
        self.state = SessionState::Terminated;
    }
}
