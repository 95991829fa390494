//! Node commands.
//!
//! Commands capture the IDs and edition times they see when they are built.
//! On every run they translate those through the history's [`IdMap`]: a node
//! removed and re-created by undo comes back under a new ID, and commands
//! further down the journal must address the new one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use arbor_command::{Command, CommandError, CommandResult, IdKind, IdMap, UndoData};
use arbor_core::{ConnectorRef, NodeId, NodeRef, ProjectId};
use arbor_state::{LocalState, NewNodeState, NodeState, State, StateError};
use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{
    ConfidenceTarget, ConfidenceUpdate, Location, NewLink, NewNode, RadiusChange, RadiusUpdate,
    RadiusUpdateMode, RemovedNode, TracingBackend, UpdatedRadius,
};

/// Highest confidence value the server accepts; the lowest is 1.
pub const MAX_CONFIDENCE: u8 = 5;

fn check_confidence(title: &str, confidence: u8) -> CommandResult<()> {
    if (1..=MAX_CONFIDENCE).contains(&confidence) {
        Ok(())
    } else {
        Err(CommandError::construction(
            title,
            format!("confidence must be between 1 and {MAX_CONFIDENCE}, got {confidence}"),
        ))
    }
}

fn map_link(map: &IdMap, link: &ConnectorRef) -> ConnectorRef {
    let mapped = map.get_with_time(IdKind::Connector, link.id.get(), link.edition_time);
    ConnectorRef::new(mapped.value.into(), mapped.timestamp, link.relation)
}

/// Record new edition times of nodes that kept their IDs.
fn remember_times<'a>(map: &IdMap, nodes: impl IntoIterator<Item = &'a NodeRef>) {
    for node in nodes {
        map.add_node(Some(node.id), *node);
    }
}

fn location_text(location: &Location) -> String {
    format!("({}, {}, {})", location.x, location.y, location.z)
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Create a node, optionally under a parent.
///
/// Undo removes the created node again. A redo creates a fresh node and maps
/// the ID of the first one to it.
pub struct CreateNodeCommand {
    backend: Arc<dyn TracingBackend>,
    project: ProjectId,
    parent: Option<NodeRef>,
    location: Location,
    radius: f64,
    confidence: u8,
    title: String,
    first: Option<NodeId>,
    created: UndoData<NodeRef>,
}

impl CreateNodeCommand {
    /// Create a node at `location` under `parent`, taking the parent's edition
    /// time from `state`.
    pub fn new(
        backend: Arc<dyn TracingBackend>,
        project: ProjectId,
        state: &LocalState,
        parent: Option<NodeId>,
        location: Location,
        radius: f64,
        confidence: u8,
    ) -> CommandResult<Self> {
        let title = format!(
            "Create new node with parent {} at {}",
            parent.map_or_else(|| "none".to_owned(), |p| p.to_string()),
            location_text(&location)
        );
        check_confidence(&title, confidence)?;
        let parent = state.new_node_state(parent)?.parent().copied();
        Ok(Self {
            backend,
            project,
            parent,
            location,
            radius,
            confidence,
            title,
            first: None,
            created: UndoData::NotYetExecuted,
        })
    }
}

#[async_trait]
impl Command for CreateNodeCommand {
    fn title(&self) -> &str {
        &self.title
    }

    async fn execute(&mut self, map: &IdMap) -> CommandResult {
        let parent = self.parent.map(|p| map.node_with_time(p));
        let state = State::from(NewNodeState::new(parent));
        let request = NewNode {
            location: self.location,
            parent: parent.map(|p| p.id),
            radius: self.radius,
            confidence: self.confidence,
            children: Vec::new(),
            links: Vec::new(),
        };
        let created = self
            .backend
            .create_node(self.project, &request, &state)
            .await?;

        map.add_node(self.first, created.node);
        self.first.get_or_insert(created.node.id);
        tracing::debug!(node = %created.node.id, "node created");

        let output = serde_json::to_value(&created)?;
        self.created.stash(created.node);
        Ok(output)
    }

    async fn undo(&mut self, map: &IdMap) -> CommandResult {
        let created = *self.created.get(&self.title)?;
        let node = map.node_with_time(created);
        let parent = self.parent.map(|p| map.node_with_time(p));
        let state = State::from(NodeState::new(node.edition_time, parent, Vec::new(), Vec::new()));

        let removed = self
            .backend
            .remove_node(self.project, node.id, &state)
            .await?;
        tracing::debug!(node = %node.id, "created node removed");
        self.created.clear();
        Ok(serde_json::to_value(&removed)?)
    }
}

impl fmt::Debug for CreateNodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateNodeCommand")
            .field("project", &self.project)
            .field("parent", &self.parent)
            .field("location", &self.location)
            .field("radius", &self.radius)
            .field("confidence", &self.confidence)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Insert
// ---------------------------------------------------------------------------

/// Insert a new node on the edge between a parent and one of its children.
///
/// Undo removes the inserted node, which hands the child back to the parent.
/// Like [`CreateNodeCommand`], a redo maps the first inserted ID to the new
/// node.
pub struct InsertNodeCommand {
    backend: Arc<dyn TracingBackend>,
    project: ProjectId,
    parent: NodeRef,
    child: NodeRef,
    location: Location,
    radius: f64,
    confidence: u8,
    title: String,
    first: Option<NodeId>,
    inserted: UndoData<NodeRef>,
}

impl InsertNodeCommand {
    /// Insert a node at `location` between `parent` and its child `child`,
    /// taking both edition times from `state`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        backend: Arc<dyn TracingBackend>,
        project: ProjectId,
        state: &LocalState,
        parent: NodeId,
        child: NodeId,
        location: Location,
        radius: f64,
        confidence: u8,
    ) -> CommandResult<Self> {
        let title = format!(
            "Insert new node between parent #{parent} and child #{child} at {}",
            location_text(&location)
        );
        check_confidence(&title, confidence)?;
        let child_ref = state.node(child).ok_or(StateError::UnknownNode(child))?;
        let parent_ref = match state.parent(child)? {
            Some(found) if found.id == parent => found,
            _ => {
                return Err(CommandError::construction(
                    &title,
                    format!("node {child} is not a child of node {parent}"),
                ));
            }
        };
        Ok(Self {
            backend,
            project,
            parent: parent_ref,
            child: child_ref,
            location,
            radius,
            confidence,
            title,
            first: None,
            inserted: UndoData::NotYetExecuted,
        })
    }
}

#[async_trait]
impl Command for InsertNodeCommand {
    fn title(&self) -> &str {
        &self.title
    }

    async fn execute(&mut self, map: &IdMap) -> CommandResult {
        let parent = map.node_with_time(self.parent);
        let child = map.node_with_time(self.child);
        // Only the edge is checked; the node itself does not exist yet.
        let state = State::from(NodeState::new(
            parent.edition_time,
            Some(parent),
            vec![child],
            Vec::new(),
        ));
        let request = NewNode {
            location: self.location,
            parent: Some(parent.id),
            radius: self.radius,
            confidence: self.confidence,
            children: vec![child.id],
            links: Vec::new(),
        };
        let created = self
            .backend
            .create_node(self.project, &request, &state)
            .await?;

        map.add_node(self.first, created.node);
        self.first.get_or_insert(created.node.id);
        remember_times(map, &created.children);
        tracing::debug!(node = %created.node.id, child = %child.id, "node inserted");

        let output = serde_json::to_value(&created)?;
        self.inserted.stash(created.node);
        Ok(output)
    }

    async fn undo(&mut self, map: &IdMap) -> CommandResult {
        let inserted = *self.inserted.get(&self.title)?;
        let node = map.node_with_time(inserted);
        let parent = map.node_with_time(self.parent);
        let child = map.node_with_time(self.child);
        let state = State::from(NodeState::new(
            node.edition_time,
            Some(parent),
            vec![child],
            Vec::new(),
        ));

        let removed = self
            .backend
            .remove_node(self.project, node.id, &state)
            .await?;
        remember_times(map, &removed.children);
        tracing::debug!(node = %node.id, "inserted node removed");
        self.inserted.clear();
        Ok(serde_json::to_value(&removed)?)
    }
}

impl fmt::Debug for InsertNodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertNodeCommand")
            .field("project", &self.project)
            .field("parent", &self.parent)
            .field("child", &self.child)
            .field("location", &self.location)
            .field("inserted", &self.inserted)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Remove
// ---------------------------------------------------------------------------

/// Remove a node.
///
/// The full neighborhood (parent, children, links) is captured at build time
/// and re-mapped on every run. Undo re-creates the node from what the server
/// reported on removal, re-attaches its children and links, and maps the
/// original node ID to the new one.
pub struct RemoveNodeCommand {
    backend: Arc<dyn TracingBackend>,
    project: ProjectId,
    node: NodeRef,
    parent: Option<NodeRef>,
    children: Vec<NodeRef>,
    links: Vec<ConnectorRef>,
    title: String,
    removed: UndoData<RemovedNode>,
}

impl RemoveNodeCommand {
    /// Remove `node`, taking its neighborhood from `state`.
    pub fn new(
        backend: Arc<dyn TracingBackend>,
        project: ProjectId,
        state: &LocalState,
        node: NodeId,
    ) -> CommandResult<Self> {
        let neighborhood = state.node_state(node)?;
        Ok(Self {
            backend,
            project,
            node: NodeRef::new(node, neighborhood.edition_time()),
            parent: neighborhood.parent().copied(),
            children: neighborhood.children().to_vec(),
            links: neighborhood.links().to_vec(),
            title: format!("Remove node #{node}"),
            removed: UndoData::NotYetExecuted,
        })
    }
}

#[async_trait]
impl Command for RemoveNodeCommand {
    fn title(&self) -> &str {
        &self.title
    }

    async fn execute(&mut self, map: &IdMap) -> CommandResult {
        let node = map.node_with_time(self.node);
        let parent = self.parent.map(|p| map.node_with_time(p));
        let children = self.children.iter().map(|c| map.node_with_time(*c)).collect();
        let links = self.links.iter().map(|l| map_link(map, l)).collect();
        let state = State::from(NodeState::new(node.edition_time, parent, children, links));

        let removed = self
            .backend
            .remove_node(self.project, node.id, &state)
            .await?;

        map.add_node(Some(self.node.id), node);
        // Children keep their IDs but got new edition times.
        remember_times(map, &removed.children);
        tracing::debug!(
            node = %node.id,
            children = removed.children.len(),
            links = removed.links.len(),
            "node removed"
        );

        let output = serde_json::to_value(&removed)?;
        self.removed.stash(removed);
        Ok(output)
    }

    async fn undo(&mut self, map: &IdMap) -> CommandResult {
        let removed = self.removed.get(&self.title)?;
        let last_seen = map.node_with_time(self.node);
        let parent = self.parent.map(|p| map.node_with_time(p));
        let children: Vec<NodeRef> = removed
            .children
            .iter()
            .map(|c| map.node_with_time(*c))
            .collect();
        let links = removed
            .links
            .iter()
            .map(|l| NewLink {
                connector: map.connector(l.connector),
                relation: l.relation,
                confidence: l.confidence,
            })
            .collect();

        // Re-inserting between parent and former children checks both; a
        // plain re-creation only checks the parent.
        let state = if children.is_empty() {
            State::from(NewNodeState::new(parent))
        } else {
            State::from(NodeState::new(
                last_seen.edition_time,
                parent,
                children.clone(),
                Vec::new(),
            ))
        };
        let request = NewNode {
            location: removed.location,
            parent: parent.map(|p| p.id),
            radius: removed.radius,
            confidence: removed.confidence,
            children: children.iter().map(|c| c.id).collect(),
            links,
        };

        let created = self
            .backend
            .create_node(self.project, &request, &state)
            .await?;

        map.add_node(Some(self.node.id), created.node);
        remember_times(map, &created.children);
        for link in &created.links {
            map.add_connector(Some(link.id), link.id, link.edition_time);
        }
        tracing::debug!(
            original = %self.node.id,
            node = %created.node.id,
            "removed node re-created"
        );

        self.removed.clear();
        Ok(serde_json::to_value(&created)?)
    }
}

impl fmt::Debug for RemoveNodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoveNodeCommand")
            .field("project", &self.project)
            .field("node", &self.node)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("links", &self.links)
            .field("removed", &self.removed)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Radius
// ---------------------------------------------------------------------------

/// Set the radius of a node, or of a stretch of its skeleton depending on
/// the [`RadiusUpdateMode`].
///
/// The server reports the previous radius of every node it changed; undo
/// restores exactly those in one request.
pub struct UpdateNodeRadiusCommand {
    backend: Arc<dyn TracingBackend>,
    project: ProjectId,
    node: NodeRef,
    radius: f64,
    mode: RadiusUpdateMode,
    title: String,
    updated: UndoData<BTreeMap<NodeId, UpdatedRadius>>,
}

impl UpdateNodeRadiusCommand {
    /// Set the radius of `node` (and its neighbors per `mode`), taking the
    /// node's edition time from `state`.
    pub fn new(
        backend: Arc<dyn TracingBackend>,
        project: ProjectId,
        state: &LocalState,
        node: NodeId,
        radius: f64,
        mode: RadiusUpdateMode,
    ) -> CommandResult<Self> {
        let node_ref = state.node(node).ok_or(StateError::UnknownNode(node))?;
        let title = match mode {
            RadiusUpdateMode::Node => format!("Update radius of node {node} to be {radius}nm"),
            RadiusUpdateMode::ToBranchIncluding => format!(
                "Update radii of all nodes from {node} to last branch (including) to be {radius}nm"
            ),
            RadiusUpdateMode::ToBranchExcluding => format!(
                "Update radii of all nodes from {node} to last branch (excluding) to be {radius}nm"
            ),
            RadiusUpdateMode::ToPreviousRadius => format!(
                "Update radii of all nodes before {node} to last without radius to be {radius}nm"
            ),
            RadiusUpdateMode::ToRoot => {
                format!("Update radii of all nodes from {node} to root to be {radius}nm")
            }
            RadiusUpdateMode::Skeleton => {
                format!("Update radii of all node {node}'s skeleton to be {radius}nm")
            }
        };
        Ok(Self {
            backend,
            project,
            node: node_ref,
            radius,
            mode,
            title,
            updated: UndoData::NotYetExecuted,
        })
    }

    fn remember(map: &IdMap, update: &RadiusUpdate) {
        for (&id, changed) in &update.updated_nodes {
            map.add_node(Some(id), NodeRef::new(id, changed.edition_time));
        }
    }
}

#[async_trait]
impl Command for UpdateNodeRadiusCommand {
    fn title(&self) -> &str {
        &self.title
    }

    async fn execute(&mut self, map: &IdMap) -> CommandResult {
        let node = map.node_with_time(self.node);
        let update = self
            .backend
            .update_radius(self.project, node, self.radius, self.mode)
            .await?;
        Self::remember(map, &update);
        tracing::debug!(node = %node.id, changed = update.updated_nodes.len(), "radius updated");

        let output = serde_json::to_value(&update)?;
        self.updated.stash(update.updated_nodes);
        Ok(output)
    }

    async fn undo(&mut self, map: &IdMap) -> CommandResult {
        let updated = self.updated.get(&self.title)?;
        let changes: Vec<RadiusChange> = updated
            .iter()
            .map(|(&id, changed)| RadiusChange {
                node: map.node_with_time(NodeRef::new(id, changed.edition_time)),
                radius: changed.old,
            })
            .collect();

        let restored = self.backend.update_radii(self.project, &changes).await?;
        Self::remember(map, &restored);
        tracing::debug!(restored = changes.len(), "previous radii restored");
        self.updated.clear();
        Ok(serde_json::to_value(&restored)?)
    }
}

impl fmt::Debug for UpdateNodeRadiusCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateNodeRadiusCommand")
            .field("project", &self.project)
            .field("node", &self.node)
            .field("radius", &self.radius)
            .field("mode", &self.mode)
            .field("updated", &self.updated)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Set the confidence of a node's edge to its parent or of its connector
/// links. Undo restores the previous value per partner.
pub struct UpdateConfidenceCommand {
    backend: Arc<dyn TracingBackend>,
    project: ProjectId,
    node: NodeId,
    confidence: u8,
    target: ConfidenceTarget,
    title: String,
    previous: UndoData<ConfidenceUpdate>,
}

impl UpdateConfidenceCommand {
    /// Set the confidence of `node`'s edges selected by `target`.
    pub fn new(
        backend: Arc<dyn TracingBackend>,
        project: ProjectId,
        node: NodeId,
        confidence: u8,
        target: ConfidenceTarget,
    ) -> CommandResult<Self> {
        let title = match target {
            ConfidenceTarget::Connectors => format!(
                "Update confidence between node #{node} and its linked connectors to {confidence}"
            ),
            ConfidenceTarget::Parent => {
                format!("Update confidence between node #{node} and its parent to {confidence}")
            }
        };
        check_confidence(&title, confidence)?;
        Ok(Self {
            backend,
            project,
            node,
            confidence,
            target,
            title,
            previous: UndoData::NotYetExecuted,
        })
    }
}

#[async_trait]
impl Command for UpdateConfidenceCommand {
    fn title(&self) -> &str {
        &self.title
    }

    async fn execute(&mut self, map: &IdMap) -> CommandResult {
        let node = map.node(self.node);
        let update = self
            .backend
            .update_confidence(self.project, node, self.confidence, self.target, None)
            .await?;
        let output = serde_json::to_value(&update)?;
        self.previous.stash(update);
        Ok(output)
    }

    async fn undo(&mut self, map: &IdMap) -> CommandResult {
        let node = map.node(self.node);
        let kind = match self.target {
            ConfidenceTarget::Parent => IdKind::Node,
            ConfidenceTarget::Connectors => IdKind::Connector,
        };
        let mut pending = self.previous.take(&self.title)?;
        let mut restored = Vec::with_capacity(pending.updated_partners.len());
        while let Some((partner, confidence)) = pending.updated_partners.pop_first() {
            let current = map.get(kind, partner);
            let request = self.backend.update_confidence(
                self.project,
                node,
                confidence,
                self.target,
                Some(current),
            );
            if let Err(err) = request.await {
                // Partners already restored are not retried.
                pending.updated_partners.insert(partner, confidence);
                self.previous.stash(pending);
                return Err(err.into());
            }
            restored.push(current);
        }
        Ok(Value::from(restored))
    }
}

impl fmt::Debug for UpdateConfidenceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateConfidenceCommand")
            .field("project", &self.project)
            .field("node", &self.node)
            .field("confidence", &self.confidence)
            .field("target", &self.target)
            .field("previous", &self.previous)
            .finish_non_exhaustive()
    }
}
