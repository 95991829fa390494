//! In-memory tracing backend for the edit integration tests.
//!
//! Checks submitted states the way the tracing server does: every node and
//! link named in a state must exist with a matching edition time, and a
//! removal state must list the complete neighborhood.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use arbor_core::{ConnectorId, ConnectorRef, EditionTime, NodeId, NodeRef, ProjectId, RelationId};
use arbor_edit::{
    BackendError, ConfidenceTarget, ConfidenceUpdate, CreatedNode, Location, NewNode,
    RadiusChange, RadiusUpdate, RadiusUpdateMode, RemovedLink, RemovedNode, TagUpdate,
    TracingBackend, UpdatedRadius,
};
use arbor_state::{LocalState, NodeState, State};
use async_trait::async_trait;
use chrono::TimeDelta;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

pub const PROJECT: ProjectId = ProjectId::new(1);
pub const PRE: RelationId = RelationId::new(100);

#[derive(Debug, Clone)]
struct StoredNode {
    edition_time: EditionTime,
    parent: Option<NodeId>,
    location: Location,
    radius: f64,
    confidence: u8,
    tags: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy)]
struct StoredLink {
    node: NodeId,
    connector: ConnectorId,
    relation: RelationId,
    confidence: u8,
    edition_time: EditionTime,
}

#[derive(Debug)]
struct Store {
    nodes: BTreeMap<NodeId, StoredNode>,
    links: Vec<StoredLink>,
    next_id: i64,
    clock: EditionTime,
    /// Tag removals that succeed before the next one fails.
    tag_removal_fault: Option<usize>,
}

impl Store {
    fn tick(&mut self) -> EditionTime {
        self.clock = self.clock.shifted(TimeDelta::seconds(1));
        self.clock
    }

    fn check_version(&self, node: &NodeRef) -> Result<(), BackendError> {
        match self.nodes.get(&node.id) {
            Some(stored) if stored.edition_time.matches(&node.edition_time) => Ok(()),
            Some(_) => Err(BackendError::stale_version(format!(
                "node {} was edited by someone else",
                node.id
            ))),
            None => Err(BackendError::not_found("node", node.id)),
        }
    }

    fn set_radius(&mut self, id: NodeId, radius: f64, update: &mut RadiusUpdate) {
        let edition_time = self.tick();
        if let Some(stored) = self.nodes.get_mut(&id) {
            update.updated_nodes.insert(
                id,
                UpdatedRadius {
                    old: stored.radius,
                    edition_time,
                },
            );
            stored.radius = radius;
            stored.edition_time = edition_time;
        }
    }

    fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent == Some(id))
            .map(|(child, _)| *child)
            .collect()
    }

    fn links_of(&self, id: NodeId) -> impl Iterator<Item = &StoredLink> {
        self.links.iter().filter(move |l| l.node == id)
    }

    fn check_node(&self, node: &NodeRef, state: &State) -> Result<(), BackendError> {
        match self.nodes.get(&node.id) {
            Some(stored) if stored.edition_time.matches(&node.edition_time) => Ok(()),
            Some(_) => Err(BackendError::state_mismatch(
                format!("node {} was edited by someone else", node.id),
                state.clone(),
            )),
            None => Err(BackendError::state_mismatch(
                format!("node {} does not exist anymore", node.id),
                state.clone(),
            )),
        }
    }

    fn check_parent(
        &self,
        expected: Option<&NodeRef>,
        actual: Option<NodeId>,
        state: &State,
    ) -> Result<(), BackendError> {
        match expected {
            Some(parent) if actual == Some(parent.id) => self.check_node(parent, state),
            None if actual.is_none() => Ok(()),
            _ => Err(BackendError::state_mismatch("parent differs", state.clone())),
        }
    }

    fn check_children(&self, expected: &[NodeRef], state: &State) -> Result<(), BackendError> {
        expected.iter().try_for_each(|c| self.check_node(c, state))
    }

    fn check_neighborhood(
        &self,
        node: NodeId,
        expected: &NodeState,
        state: &State,
    ) -> Result<(), BackendError> {
        self.check_node(&NodeRef::new(node, expected.edition_time()), state)?;
        let stored_parent = self.nodes.get(&node).and_then(|n| n.parent);
        self.check_parent(expected.parent(), stored_parent, state)?;

        let children: Vec<NodeId> = expected.children().iter().map(|c| c.id).collect();
        if children != self.children_of(node) {
            return Err(BackendError::state_mismatch("children differ", state.clone()));
        }
        self.check_children(expected.children(), state)?;

        let mut stored: Vec<(ConnectorId, RelationId)> =
            self.links_of(node).map(|l| (l.connector, l.relation)).collect();
        stored.sort();
        let listed: Vec<(ConnectorId, RelationId)> =
            expected.links().iter().map(|l| (l.id, l.relation)).collect();
        if stored != listed {
            return Err(BackendError::state_mismatch("links differ", state.clone()));
        }
        for link in expected.links() {
            let current = self
                .links_of(node)
                .find(|l| l.connector == link.id && l.relation == link.relation);
            if !current.is_some_and(|l| l.edition_time.matches(&link.edition_time)) {
                return Err(BackendError::state_mismatch(
                    format!("link to connector {} was edited", link.id),
                    state.clone(),
                ));
            }
        }
        Ok(())
    }
}

/// Send command logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Thread-safe in-memory stand-in for the tracing server.
#[derive(Debug)]
pub struct MemoryBackend {
    store: Mutex<Store>,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        init_tracing();
        Arc::new(Self {
            store: Mutex::new(Store {
                nodes: BTreeMap::new(),
                links: Vec::new(),
                next_id: 1,
                clock: EditionTime::parse("2024-01-01T00:00:00Z").unwrap(),
                tag_removal_fault: None,
            }),
        })
    }

    /// Let `successes` tag removals through, then fail exactly one.
    pub fn fail_tag_removal_after(&self, successes: usize) {
        self.store.lock().tag_removal_fault = Some(successes);
    }

    pub fn seed_node(&self, parent: Option<NodeId>) -> NodeRef {
        let mut store = self.store.lock();
        let id = NodeId::new(store.next_id);
        store.next_id += 1;
        let edition_time = store.tick();
        store.nodes.insert(
            id,
            StoredNode {
                edition_time,
                parent,
                location: Location::new(1.0, 2.0, 3.0),
                radius: -1.0,
                confidence: 5,
                tags: BTreeSet::new(),
            },
        );
        NodeRef::new(id, edition_time)
    }

    pub fn seed_link(&self, node: NodeId, connector: ConnectorId) -> ConnectorRef {
        let mut store = self.store.lock();
        let edition_time = store.tick();
        store.links.push(StoredLink {
            node,
            connector,
            relation: PRE,
            confidence: 5,
            edition_time,
        });
        ConnectorRef::new(connector, edition_time, PRE)
    }

    pub fn seed_tags(&self, node: NodeId, tags: &[&str]) {
        let mut store = self.store.lock();
        if let Some(stored) = store.nodes.get_mut(&node) {
            stored.tags.extend(tags.iter().map(|t| (*t).to_owned()));
        }
    }

    /// Simulate an edit by another client.
    pub fn touch(&self, node: NodeId) {
        let mut store = self.store.lock();
        let edition_time = store.tick();
        if let Some(stored) = store.nodes.get_mut(&node) {
            stored.edition_time = edition_time;
        }
    }

    /// What a client that just loaded everything would know.
    pub fn local_state(&self) -> LocalState {
        let store = self.store.lock();
        let mut local = LocalState::new();
        for (id, node) in &store.nodes {
            local.add_node(*id, node.edition_time, node.parent);
        }
        for link in &store.links {
            local.add_link(
                link.node,
                ConnectorRef::new(link.connector, link.edition_time, link.relation),
            );
        }
        local
    }

    pub fn tags(&self, node: NodeId) -> Vec<String> {
        self.store
            .lock()
            .nodes
            .get(&node)
            .map(|n| n.tags.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.store.lock().nodes.contains_key(&node)
    }

    pub fn node_count(&self) -> usize {
        self.store.lock().nodes.len()
    }

    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.store.lock().nodes.get(&node).and_then(|n| n.parent)
    }

    pub fn radius(&self, node: NodeId) -> Option<f64> {
        self.store.lock().nodes.get(&node).map(|n| n.radius)
    }

    pub fn confidence(&self, node: NodeId) -> Option<u8> {
        self.store.lock().nodes.get(&node).map(|n| n.confidence)
    }

    pub fn link_confidences(&self, node: NodeId) -> Vec<(ConnectorId, u8)> {
        self.store
            .lock()
            .links_of(node)
            .map(|l| (l.connector, l.confidence))
            .collect()
    }

    pub fn linked_connectors(&self, node: NodeId) -> Vec<ConnectorId> {
        self.store.lock().links_of(node).map(|l| l.connector).collect()
    }
}

#[async_trait]
impl TracingBackend for MemoryBackend {
    async fn add_tags(
        &self,
        _project: ProjectId,
        node: NodeId,
        tags: &[String],
        delete_existing: bool,
    ) -> Result<TagUpdate, BackendError> {
        let mut store = self.store.lock();
        let stored = store
            .nodes
            .get_mut(&node)
            .ok_or_else(|| BackendError::not_found("node", node))?;

        let mut update = TagUpdate::default();
        if delete_existing {
            let keep: BTreeSet<&String> = tags.iter().collect();
            update.deleted_labels = stored
                .tags
                .iter()
                .filter(|t| !keep.contains(t))
                .cloned()
                .collect();
            stored.tags.retain(|t| keep.contains(t));
        }
        for tag in tags {
            if stored.tags.insert(tag.clone()) {
                update.new_labels.push(tag.clone());
            } else {
                update.duplicate_labels.push(tag.clone());
            }
        }
        Ok(update)
    }

    async fn remove_tag(
        &self,
        _project: ProjectId,
        node: NodeId,
        tag: &str,
    ) -> Result<TagUpdate, BackendError> {
        let mut store = self.store.lock();
        match store.tag_removal_fault {
            Some(0) => {
                store.tag_removal_fault = None;
                return Err(BackendError::Request("connection reset".into()));
            }
            Some(left) => store.tag_removal_fault = Some(left - 1),
            None => {}
        }
        let stored = store
            .nodes
            .get_mut(&node)
            .ok_or_else(|| BackendError::not_found("node", node))?;
        let mut update = TagUpdate::default();
        if stored.tags.remove(tag) {
            update.deleted_labels.push(tag.to_owned());
        }
        Ok(update)
    }

    async fn create_node(
        &self,
        _project: ProjectId,
        request: &NewNode,
        state: &State,
    ) -> Result<CreatedNode, BackendError> {
        let mut store = self.store.lock();
        match state {
            State::NoCheck => {}
            State::NewNode(expected) => {
                store.check_parent(expected.parent(), request.parent, state)?;
            }
            // Insertion: the node's own edition time is not checked, it does
            // not exist yet.
            State::Node(expected) => {
                store.check_parent(expected.parent(), request.parent, state)?;
                store.check_children(expected.children(), state)?;
            }
        }

        let id = NodeId::new(store.next_id);
        store.next_id += 1;
        let edition_time = store.tick();
        store.nodes.insert(
            id,
            StoredNode {
                edition_time,
                parent: request.parent,
                location: request.location,
                radius: request.radius,
                confidence: request.confidence,
                tags: BTreeSet::new(),
            },
        );

        let mut children = Vec::new();
        for child in &request.children {
            let time = store.tick();
            let stored = store
                .nodes
                .get_mut(child)
                .ok_or_else(|| BackendError::not_found("node", child))?;
            stored.parent = Some(id);
            stored.edition_time = time;
            children.push(NodeRef::new(*child, time));
        }

        let mut links = Vec::new();
        for link in &request.links {
            let time = store.tick();
            store.links.push(StoredLink {
                node: id,
                connector: link.connector,
                relation: link.relation,
                confidence: link.confidence,
                edition_time: time,
            });
            links.push(ConnectorRef::new(link.connector, time, link.relation));
        }

        Ok(CreatedNode {
            node: NodeRef::new(id, edition_time),
            children,
            links,
        })
    }

    async fn remove_node(
        &self,
        _project: ProjectId,
        node: NodeId,
        state: &State,
    ) -> Result<RemovedNode, BackendError> {
        let mut store = self.store.lock();
        match state {
            State::NoCheck => {}
            State::Node(expected) => store.check_neighborhood(node, expected, state)?,
            State::NewNode(_) => {
                return Err(BackendError::state_mismatch(
                    "removal needs a node state",
                    state.clone(),
                ));
            }
        }

        let stored = store
            .nodes
            .remove(&node)
            .ok_or_else(|| BackendError::not_found("node", node))?;

        let mut children = Vec::new();
        for child in store.children_of(node) {
            let time = store.tick();
            if let Some(c) = store.nodes.get_mut(&child) {
                c.parent = stored.parent;
                c.edition_time = time;
            }
            children.push(NodeRef::new(child, time));
        }

        let links = store
            .links_of(node)
            .map(|l| RemovedLink {
                connector: l.connector,
                relation: l.relation,
                confidence: l.confidence,
            })
            .collect();
        store.links.retain(|l| l.node != node);

        Ok(RemovedNode {
            location: stored.location,
            radius: stored.radius,
            confidence: stored.confidence,
            parent: stored.parent,
            children,
            links,
        })
    }

    async fn update_radius(
        &self,
        _project: ProjectId,
        node: NodeRef,
        radius: f64,
        mode: RadiusUpdateMode,
    ) -> Result<RadiusUpdate, BackendError> {
        let mut store = self.store.lock();
        store.check_version(&node)?;
        let targets = match mode {
            RadiusUpdateMode::Node => vec![node.id],
            RadiusUpdateMode::ToRoot => {
                let mut path = vec![node.id];
                let mut current = node.id;
                while let Some(parent) = store.nodes.get(&current).and_then(|n| n.parent) {
                    path.push(parent);
                    current = parent;
                }
                path
            }
            other => {
                return Err(BackendError::Request(format!(
                    "radius mode {} is not supported here",
                    other.code()
                )));
            }
        };
        let mut update = RadiusUpdate::default();
        for id in targets {
            store.set_radius(id, radius, &mut update);
        }
        Ok(update)
    }

    async fn update_radii(
        &self,
        _project: ProjectId,
        changes: &[RadiusChange],
    ) -> Result<RadiusUpdate, BackendError> {
        let mut store = self.store.lock();
        for change in changes {
            store.check_version(&change.node)?;
        }
        let mut update = RadiusUpdate::default();
        for change in changes {
            store.set_radius(change.node.id, change.radius, &mut update);
        }
        Ok(update)
    }

    async fn update_confidence(
        &self,
        _project: ProjectId,
        node: NodeId,
        confidence: u8,
        target: ConfidenceTarget,
        partner: Option<i64>,
    ) -> Result<ConfidenceUpdate, BackendError> {
        let mut store = self.store.lock();
        let mut update = ConfidenceUpdate::default();
        match target {
            ConfidenceTarget::Parent => {
                let stored = store
                    .nodes
                    .get_mut(&node)
                    .ok_or_else(|| BackendError::not_found("node", node))?;
                let parent = stored
                    .parent
                    .ok_or_else(|| BackendError::Request(format!("node {node} is a root")))?;
                if partner.is_some_and(|p| p != parent.get()) {
                    return Err(BackendError::Request("partner is not the parent".into()));
                }
                update.updated_partners.insert(parent.get(), stored.confidence);
                stored.confidence = confidence;
            }
            ConfidenceTarget::Connectors => {
                for link in store.links.iter_mut().filter(|l| l.node == node) {
                    if partner.is_some_and(|p| p != link.connector.get()) {
                        continue;
                    }
                    update
                        .updated_partners
                        .insert(link.connector.get(), link.confidence);
                    link.confidence = confidence;
                }
            }
        }
        Ok(update)
    }
}
