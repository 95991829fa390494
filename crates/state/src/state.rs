//! State value objects and their wire encoding.

use arbor_core::{ConnectorRef, EditionTime, NodeRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};

use crate::error::StateError;

/// The client's belief about the server-side version of the data an edit
/// touches.
///
/// This is a closed set: the server understands exactly these three shapes.
///
/// ```json
/// {"edition_time": "...", "parent": [id, "..."], "children": [[id, "..."]], "links": [[id, "...", rel]]}
/// {"parent": [id, "..."]}
/// {"nocheck": true}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// An existing node and its neighborhood.
    Node(NodeState),
    /// A node that does not exist yet.
    NewNode(NewNodeState),
    /// Skip version validation for this request.
    NoCheck,
}

impl State {
    /// Encode as the JSON value the server validates.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Node(node) => json!({
                "edition_time": node.edition_time.to_string(),
                "parent": parent_pair(node.parent.as_ref()),
                "children": node.children.iter().map(node_pair).collect::<Vec<_>>(),
                "links": node.links.iter().map(link_triple).collect::<Vec<_>>(),
            }),
            Self::NewNode(new) => json!({
                "parent": parent_pair(new.parent.as_ref()),
            }),
            Self::NoCheck => json!({ "nocheck": true }),
        }
    }

    /// Encode as a JSON string. The output is deterministic: equal states
    /// always produce identical text.
    ///
    /// This inherent method takes precedence over [`Serialize::serialize`]
    /// in method-call syntax; both produce the same JSON, so
    /// `serde_json::to_string(&state)` is equivalent.
    #[must_use]
    pub fn serialize(&self) -> String {
        self.to_json().to_string()
    }

    /// Parse a state from its JSON text.
    pub fn parse(input: &str) -> Result<Self, StateError> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_json(&value)
    }

    /// Parse a state from an already decoded JSON value.
    pub fn from_json(value: &Value) -> Result<Self, StateError> {
        crate::parse::parse_state(value)
    }

    /// Whether the server should skip validation for this state.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::NoCheck)
    }
}

impl From<NodeState> for State {
    fn from(state: NodeState) -> Self {
        Self::Node(state)
    }
}

impl From<NewNodeState> for State {
    fn from(state: NewNodeState) -> Self {
        Self::NewNode(state)
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(s)
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Snapshot of an existing node: its own edition time, its parent, its
/// children and its connector links.
///
/// Children and links are kept sorted by ID; the server does not care about
/// their order and sorting makes the encoding canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState {
    edition_time: EditionTime,
    parent: Option<NodeRef>,
    children: Vec<NodeRef>,
    links: Vec<ConnectorRef>,
}

impl NodeState {
    /// Build a node snapshot. `parent` is `None` for a root node.
    #[must_use]
    pub fn new(
        edition_time: EditionTime,
        parent: Option<NodeRef>,
        mut children: Vec<NodeRef>,
        mut links: Vec<ConnectorRef>,
    ) -> Self {
        children.sort_by_key(|c| c.id);
        links.sort_by_key(|l| (l.id, l.relation));
        Self {
            edition_time,
            parent,
            children,
            links,
        }
    }

    /// The node's own edition time.
    #[must_use]
    pub fn edition_time(&self) -> EditionTime {
        self.edition_time
    }

    /// The parent, `None` for a root node.
    #[must_use]
    pub fn parent(&self) -> Option<&NodeRef> {
        self.parent.as_ref()
    }

    /// Direct children, sorted by ID.
    #[must_use]
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    /// Connector links, sorted by connector ID.
    #[must_use]
    pub fn links(&self) -> &[ConnectorRef] {
        &self.links
    }
}

/// Snapshot for a node that is about to be created: only the intended parent
/// is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewNodeState {
    parent: Option<NodeRef>,
}

impl NewNodeState {
    /// A new node under `parent`, or a new skeleton root when `None`.
    #[must_use]
    pub const fn new(parent: Option<NodeRef>) -> Self {
        Self { parent }
    }

    /// A new node that starts a new skeleton.
    #[must_use]
    pub const fn root() -> Self {
        Self { parent: None }
    }

    /// The intended parent.
    #[must_use]
    pub fn parent(&self) -> Option<&NodeRef> {
        self.parent.as_ref()
    }
}

fn parent_pair(parent: Option<&NodeRef>) -> Value {
    parent.map_or_else(|| json!([null, null]), node_pair)
}

fn node_pair(node: &NodeRef) -> Value {
    json!([node.id.get(), node.edition_time.to_string()])
}

fn link_triple(link: &ConnectorRef) -> Value {
    json!([link.id.get(), link.edition_time.to_string(), link.relation.get()])
}
