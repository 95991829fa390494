//! Integer identifiers for tracing entities.
//!
//! The tracing server assigns every entity a database-wide integer ID. Each
//! entity kind gets its own newtype so a connector ID can never be passed
//! where a node ID is expected.
//!
//! All ID types are `Copy` and support:
//! - `new(i64)` / `get()` for raw access
//! - `parse(&str)` via [`FromStr`]
//! - serde as a plain JSON integer
//! - `Display`, `Eq`, `Ord`, `Hash`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::time::EditionTime;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw server-side ID.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// The raw server-side ID.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| CoreError::InvalidId {
                        kind: $kind,
                        input: s.to_owned(),
                    })
            }
        }
    };
}

define_id!(
    /// A skeleton node (treenode).
    NodeId,
    "node"
);
define_id!(
    /// A connector, the synapse-like object nodes link to.
    ConnectorId,
    "connector"
);
define_id!(
    /// The relation type of a node-connector link (pre-, postsynaptic, ...).
    RelationId,
    "relation"
);
define_id!(
    /// The project all edited entities belong to.
    ProjectId,
    "project"
);

/// A node together with the edition time the client last saw for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Node ID.
    pub id: NodeId,
    /// Last known edition time.
    pub edition_time: EditionTime,
}

impl NodeRef {
    /// Pair a node with its edition time.
    #[must_use]
    pub const fn new(id: NodeId, edition_time: EditionTime) -> Self {
        Self { id, edition_time }
    }
}

/// A node-connector link as seen from the node side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorRef {
    /// Connector ID.
    pub id: ConnectorId,
    /// Last known edition time of the connector.
    pub edition_time: EditionTime,
    /// Relation of the link.
    pub relation: RelationId,
}

impl ConnectorRef {
    /// Describe a link to a connector.
    #[must_use]
    pub const fn new(id: ConnectorId, edition_time: EditionTime, relation: RelationId) -> Self {
        Self {
            id,
            edition_time,
            relation,
        }
    }
}
