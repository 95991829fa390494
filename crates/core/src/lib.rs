//! # Arbor Core
//!
//! Identifiers and edition timestamps shared by every Arbor crate.
//!
//! ## Key Components
//!
//! - **Identifiers**: [`NodeId`], [`ConnectorId`], [`RelationId`], [`ProjectId`]
//!   (integer IDs assigned by the tracing server)
//! - **Versions**: [`EditionTime`], the server-side last-modified timestamp used
//!   for optimistic concurrency checks
//! - **References**: [`NodeRef`] and [`ConnectorRef`], an ID paired with the
//!   edition time the client last saw
//!
//! ## Usage
//!
//! ```rust
//! use arbor_core::{EditionTime, NodeId, NodeRef};
//!
//! let node: NodeId = "42".parse().unwrap();
//! let seen = NodeRef::new(node, EditionTime::parse("2024-03-01T12:00:00Z").unwrap());
//! assert_eq!(seen.id.get(), 42);
//! ```

pub mod id;
pub mod time;

mod error;

pub use error::CoreError;
pub use id::{ConnectorId, ConnectorRef, NodeId, NodeRef, ProjectId, RelationId};
pub use time::EditionTime;

/// Result type used by the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
