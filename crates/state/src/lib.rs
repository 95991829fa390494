#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Arbor State
//!
//! Snapshots of what the client believes the server-side version of a piece
//! of tracing data is. Every mutating request carries one; the server
//! compares the edition times inside against its own and rejects the request
//! when they differ, so concurrent edits by other users are detected instead
//! of silently overwritten.
//!
//! - [`State`] -- the closed set of snapshot variants
//! - [`NodeState`] -- an existing node with its parent, children and links
//! - [`NewNodeState`] -- a node about to be created under a parent
//! - [`State::NoCheck`] -- explicit opt-out of version checking
//! - [`LocalState`] -- the client-side knowledge that states are derived from
//!
//! ```rust
//! use arbor_core::{EditionTime, NodeId, NodeRef};
//! use arbor_state::{NewNodeState, State};
//!
//! let t = EditionTime::parse("2024-03-01T12:00:00Z").unwrap();
//! let state = State::from(NewNodeState::new(Some(NodeRef::new(NodeId::new(7), t))));
//! assert_eq!(state.serialize(), r#"{"parent":[7,"2024-03-01T12:00:00Z"]}"#);
//! assert_eq!(State::parse(&state.serialize()).unwrap(), state);
//! ```

pub mod error;
pub mod local;
pub mod state;

mod parse;

pub use error::StateError;
pub use local::LocalState;
pub use state::{NewNodeState, NodeState, State};
