//! Tracing backend port.
//!
//! The persistence collaborator the edit commands talk to. Requests that
//! change the skeleton graph carry a [`State`]: the server compares it
//! with what it has stored and answers with
//! [`BackendError::StateMismatch`] when the client was working from a stale
//! view.

use std::collections::BTreeMap;

use arbor_core::{ConnectorId, ConnectorRef, EditionTime, NodeId, NodeRef, ProjectId, RelationId};
use arbor_state::State;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Position of a node in project space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Location {
    /// Build a location.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A connector link to create together with a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLink {
    /// Connector to link to.
    pub connector: ConnectorId,
    /// Relation of the link.
    pub relation: RelationId,
    /// Link confidence.
    pub confidence: u8,
}

/// Request to create a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNode {
    /// Position.
    pub location: Location,
    /// Parent node, `None` to start a new skeleton.
    pub parent: Option<NodeId>,
    /// Node radius.
    pub radius: f64,
    /// Confidence of the edge to the parent.
    pub confidence: u8,
    /// Existing nodes that become children of the new node.
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Connector links to create.
    #[serde(default)]
    pub links: Vec<NewLink>,
}

/// Outcome of a tag update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagUpdate {
    /// Tags the node did not have before.
    pub new_labels: Vec<String>,
    /// Requested tags the node already had.
    pub duplicate_labels: Vec<String>,
    /// Tags removed from the node.
    pub deleted_labels: Vec<String>,
}

/// Outcome of a node creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedNode {
    /// The new node with its edition time.
    pub node: NodeRef,
    /// Re-attached children with their new edition times.
    pub children: Vec<NodeRef>,
    /// Created links, in request order.
    pub links: Vec<ConnectorRef>,
}

/// A link that was removed together with its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedLink {
    /// Connector the node was linked to.
    pub connector: ConnectorId,
    /// Relation of the link.
    pub relation: RelationId,
    /// Link confidence.
    pub confidence: u8,
}

/// Everything the server reports about a removed node, enough to create it
/// again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedNode {
    /// Former position.
    pub location: Location,
    /// Former radius.
    pub radius: f64,
    /// Former confidence of the edge to the parent.
    pub confidence: u8,
    /// Former parent.
    pub parent: Option<NodeId>,
    /// Former children, now attached to the parent, with new edition times.
    pub children: Vec<NodeRef>,
    /// Removed connector links.
    pub links: Vec<RemovedLink>,
}

/// Which edges a confidence update applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTarget {
    /// The edge to the parent node.
    Parent,
    /// The links to connectors.
    Connectors,
}

/// Outcome of a confidence update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceUpdate {
    /// Previous confidence per updated partner (parent node or connector).
    pub updated_partners: BTreeMap<i64, u8>,
}

/// Which nodes a radius update reaches, starting from the addressed node.
///
/// The wire value is the server's numeric mode (see [`code`](Self::code)).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusUpdateMode {
    /// Only the node itself.
    #[default]
    Node,
    /// Towards the root up to and including the previous branch node.
    ToBranchIncluding,
    /// Towards the root up to but excluding the previous branch node.
    ToBranchExcluding,
    /// Towards the root up to the previous node that has a radius set.
    ToPreviousRadius,
    /// Towards the root, root included.
    ToRoot,
    /// Every node of the skeleton.
    Skeleton,
}

impl RadiusUpdateMode {
    /// Numeric mode understood by the server.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Node => 0,
            Self::ToBranchIncluding => 1,
            Self::ToBranchExcluding => 2,
            Self::ToPreviousRadius => 3,
            Self::ToRoot => 4,
            Self::Skeleton => 5,
        }
    }
}

/// Set one node's radius. The server checks `node.edition_time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusChange {
    /// Node with the edition time the client last saw.
    pub node: NodeRef,
    /// Radius to set.
    pub radius: f64,
}

/// Previous radius of a node changed by a radius update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdatedRadius {
    /// Radius before the update.
    pub old: f64,
    /// Edition time after the update.
    pub edition_time: EditionTime,
}

/// Outcome of a radius update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadiusUpdate {
    /// Every changed node.
    pub updated_nodes: BTreeMap<NodeId, UpdatedRadius>,
}

/// Requests the edit commands issue against the tracing server.
#[async_trait]
pub trait TracingBackend: Send + Sync {
    /// Add tags to a node, optionally replacing all existing ones.
    async fn add_tags(
        &self,
        project: ProjectId,
        node: NodeId,
        tags: &[String],
        delete_existing: bool,
    ) -> Result<TagUpdate, BackendError>;

    /// Remove one tag from a node.
    async fn remove_tag(
        &self,
        project: ProjectId,
        node: NodeId,
        tag: &str,
    ) -> Result<TagUpdate, BackendError>;

    /// Create a node. `state` describes the neighborhood the client expects.
    async fn create_node(
        &self,
        project: ProjectId,
        request: &NewNode,
        state: &State,
    ) -> Result<CreatedNode, BackendError>;

    /// Remove a node. `state` describes its neighborhood as the client knows
    /// it.
    async fn remove_node(
        &self,
        project: ProjectId,
        node: NodeId,
        state: &State,
    ) -> Result<RemovedNode, BackendError>;

    /// Set the radius of `node` and, depending on `mode`, of nodes around
    /// it. Fails with a stale-version error if `node` was edited since its
    /// edition time.
    async fn update_radius(
        &self,
        project: ProjectId,
        node: NodeRef,
        radius: f64,
        mode: RadiusUpdateMode,
    ) -> Result<RadiusUpdate, BackendError>;

    /// Set individual radii in one request. Either every edition time matches
    /// and all radii change, or nothing changes.
    async fn update_radii(
        &self,
        project: ProjectId,
        changes: &[RadiusChange],
    ) -> Result<RadiusUpdate, BackendError>;

    /// Set the confidence of a node's edges. With `partner` only the edge to
    /// that parent or connector is changed.
    async fn update_confidence(
        &self,
        project: ProjectId,
        node: NodeId,
        confidence: u8,
        target: ConfidenceTarget,
        partner: Option<i64>,
    ) -> Result<ConfidenceUpdate, BackendError>;
}
