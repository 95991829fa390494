//! Client-side snapshot of loaded tracing data.
//!
//! Commands derive the [`State`](crate::State) they send from what the client
//! has loaded. [`LocalState`] is that knowledge: node edition times, parent
//! relations and connector links, updated as server responses arrive.

use std::collections::{BTreeMap, HashMap};

use arbor_core::{ConnectorRef, EditionTime, NodeId, NodeRef};

use crate::error::StateError;
use crate::state::{NewNodeState, NodeState};

#[derive(Debug, Clone, Copy)]
struct KnownNode {
    edition_time: EditionTime,
    parent: Option<NodeId>,
}

/// What the client currently knows about nodes and their links.
#[derive(Debug, Clone, Default)]
pub struct LocalState {
    nodes: BTreeMap<NodeId, KnownNode>,
    links: HashMap<NodeId, Vec<ConnectorRef>>,
}

impl LocalState {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or refresh) a node.
    pub fn add_node(&mut self, id: NodeId, edition_time: EditionTime, parent: Option<NodeId>) {
        self.nodes.insert(
            id,
            KnownNode {
                edition_time,
                parent,
            },
        );
    }

    /// Record a connector link of `node`. A link to the same connector with
    /// the same relation replaces the previous entry.
    pub fn add_link(&mut self, node: NodeId, link: ConnectorRef) {
        let links = self.links.entry(node).or_default();
        links.retain(|l| !(l.id == link.id && l.relation == link.relation));
        links.push(link);
    }

    /// Forget a node and its links. Children keep pointing at the removed
    /// ID until they are refreshed.
    pub fn remove_node(&mut self, id: NodeId) {
        self.nodes.remove(&id);
        self.links.remove(&id);
    }

    /// Number of known nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no nodes are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node with its last seen edition time.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<NodeRef> {
        self.nodes.get(&id).map(|n| NodeRef::new(id, n.edition_time))
    }

    /// The parent of a known node, `None` for a root.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeRef>, StateError> {
        let known = self.nodes.get(&id).ok_or(StateError::UnknownNode(id))?;
        known
            .parent
            .map(|p| self.node(p).ok_or(StateError::UnknownNode(p)))
            .transpose()
    }

    /// Loaded children of a node, sorted by ID.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeRef> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent == Some(id))
            .map(|(child, n)| NodeRef::new(*child, n.edition_time))
            .collect()
    }

    /// Connector links of a node.
    #[must_use]
    pub fn links(&self, id: NodeId) -> &[ConnectorRef] {
        self.links.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Full neighborhood snapshot of an existing node.
    pub fn node_state(&self, id: NodeId) -> Result<NodeState, StateError> {
        let node = self.node(id).ok_or(StateError::UnknownNode(id))?;
        Ok(NodeState::new(
            node.edition_time,
            self.parent(id)?,
            self.children(id),
            self.links(id).to_vec(),
        ))
    }

    /// Snapshot for creating a node under `parent` (a new root when `None`).
    pub fn new_node_state(&self, parent: Option<NodeId>) -> Result<NewNodeState, StateError> {
        let parent = parent
            .map(|p| self.node(p).ok_or(StateError::UnknownNode(p)))
            .transpose()?;
        Ok(NewNodeState::new(parent))
    }
}
