//! Original-to-current ID translation shared by the commands of a history.
//!
//! Undoing a node removal re-creates the node, and the server hands out a new
//! ID for it. Commands further down the journal still hold the ID they
//! captured when they were built, so before talking to the server they look
//! it up here. The map is keyed by the *original* ID; looking up an ID that
//! is already current returns its entry as well.
//!
//! Overwriting is allowed and the latest mapping wins: a redo after an undo
//! legitimately moves an entity to yet another ID.

use std::collections::HashMap;
use std::sync::Arc;

use arbor_core::{ConnectorId, EditionTime, NodeId, NodeRef};
use parking_lot::RwLock;

/// Entity kinds with independent ID spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// Skeleton nodes.
    Node,
    /// Connectors.
    Connector,
}

/// Current ID of an entity together with its latest known edition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapped {
    /// Current ID.
    pub value: i64,
    /// Latest known edition time.
    pub timestamp: EditionTime,
}

type Table = HashMap<i64, Mapped>;

/// Shared ID translation table. Cloning yields another handle to the same
/// table.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    inner: Arc<RwLock<HashMap<IdKind, Table>>>,
}

impl IdMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the entity originally known as `original` is now
    /// `current`, last edited at `timestamp`.
    ///
    /// `original = None` registers a freshly created entity under its own
    /// ID. If `original` is not a known original ID but is the current ID of
    /// an existing entry, that entry is updated instead, so chains of
    /// re-creations always resolve from the first ID.
    pub fn add(&self, kind: IdKind, original: Option<i64>, current: i64, timestamp: EditionTime) {
        let original = original.unwrap_or(current);
        let mut tables = self.inner.write();
        let table = tables.entry(kind).or_default();
        let key = if table.contains_key(&original) {
            original
        } else {
            find_by_current(table, original).unwrap_or(original)
        };
        table.insert(
            key,
            Mapped {
                value: current,
                timestamp,
            },
        );
    }

    /// Current ID for `id`. Unknown IDs map to themselves.
    #[must_use]
    pub fn get(&self, kind: IdKind, id: i64) -> i64 {
        self.inner
            .read()
            .get(&kind)
            .and_then(|t| t.get(&id))
            .map_or(id, |m| m.value)
    }

    /// Current ID and latest edition time for `id`. Unknown IDs return the
    /// given pair unchanged.
    #[must_use]
    pub fn get_with_time(&self, kind: IdKind, id: i64, timestamp: EditionTime) -> Mapped {
        let tables = self.inner.read();
        let Some(table) = tables.get(&kind) else {
            return Mapped {
                value: id,
                timestamp,
            };
        };
        table
            .get(&id)
            .or_else(|| find_by_current(table, id).and_then(|k| table.get(&k)))
            .copied()
            .unwrap_or(Mapped {
                value: id,
                timestamp,
            })
    }

    /// Typed [`add`](Self::add) for nodes.
    pub fn add_node(&self, original: Option<NodeId>, current: NodeRef) {
        self.add(
            IdKind::Node,
            original.map(NodeId::get),
            current.id.get(),
            current.edition_time,
        );
    }

    /// Typed [`get`](Self::get) for nodes.
    #[must_use]
    pub fn node(&self, id: NodeId) -> NodeId {
        NodeId::new(self.get(IdKind::Node, id.get()))
    }

    /// Typed [`get_with_time`](Self::get_with_time) for nodes.
    #[must_use]
    pub fn node_with_time(&self, node: NodeRef) -> NodeRef {
        let m = self.get_with_time(IdKind::Node, node.id.get(), node.edition_time);
        NodeRef::new(NodeId::new(m.value), m.timestamp)
    }

    /// Typed [`add`](Self::add) for connectors.
    pub fn add_connector(&self, original: Option<ConnectorId>, current: ConnectorId, timestamp: EditionTime) {
        self.add(
            IdKind::Connector,
            original.map(ConnectorId::get),
            current.get(),
            timestamp,
        );
    }

    /// Typed [`get`](Self::get) for connectors.
    #[must_use]
    pub fn connector(&self, id: ConnectorId) -> ConnectorId {
        ConnectorId::new(self.get(IdKind::Connector, id.get()))
    }

    /// Number of mappings across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().values().map(HashMap::len).sum()
    }

    /// Returns `true` if no mappings are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all mappings.
    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

fn find_by_current(table: &Table, current: i64) -> Option<i64> {
    table
        .iter()
        .find(|(original, m)| m.value == current && **original != current)
        .map(|(original, _)| *original)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn t(secs: u32) -> EditionTime {
        EditionTime::parse(&format!("2024-01-01T00:00:{secs:02}Z")).unwrap()
    }

    #[test]
    fn unknown_ids_pass_through() {
        let map = IdMap::new();
        assert_eq!(map.get(IdKind::Node, 5), 5);
        assert_eq!(
            map.get_with_time(IdKind::Node, 5, t(1)),
            Mapped {
                value: 5,
                timestamp: t(1)
            }
        );
        assert!(map.is_empty());
    }

    #[test]
    fn recreated_node_resolves_from_original_id() {
        let map = IdMap::new();
        map.add(IdKind::Node, Some(5), 9, t(2));
        assert_eq!(map.get(IdKind::Node, 5), 9);
        assert_eq!(map.get_with_time(IdKind::Node, 5, t(1)).timestamp, t(2));
    }

    #[test]
    fn latest_mapping_wins() {
        let map = IdMap::new();
        map.add(IdKind::Node, Some(5), 9, t(2));
        map.add(IdKind::Node, Some(5), 12, t(3));
        assert_eq!(map.get(IdKind::Node, 5), 12);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn current_id_updates_its_original_entry() {
        let map = IdMap::new();
        map.add(IdKind::Node, Some(3), 7, t(1));
        // Server reports node 7 with a new edition time.
        map.add(IdKind::Node, Some(7), 7, t(4));
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get_with_time(IdKind::Node, 3, t(0)),
            Mapped {
                value: 7,
                timestamp: t(4)
            }
        );
        assert_eq!(map.get_with_time(IdKind::Node, 7, t(0)).timestamp, t(4));
    }

    #[test]
    fn fresh_entities_register_under_their_own_id() {
        let map = IdMap::new();
        map.add_node(None, NodeRef::new(NodeId::new(20), t(5)));
        assert_eq!(
            map.node_with_time(NodeRef::new(NodeId::new(20), t(0))),
            NodeRef::new(NodeId::new(20), t(5))
        );
    }

    #[test]
    fn kinds_are_independent() {
        let map = IdMap::new();
        map.add(IdKind::Node, Some(1), 2, t(1));
        map.add_connector(Some(ConnectorId::new(1)), ConnectorId::new(3), t(1));
        assert_eq!(map.node(NodeId::new(1)), NodeId::new(2));
        assert_eq!(map.connector(ConnectorId::new(1)), ConnectorId::new(3));
    }

    #[test]
    fn clones_share_the_table() {
        let map = IdMap::new();
        let other = map.clone();
        other.add(IdKind::Node, Some(1), 2, t(1));
        assert_eq!(map.get(IdKind::Node, 1), 2);
        map.clear();
        assert!(other.is_empty());
    }
}
