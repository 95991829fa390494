#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Arbor Edit
//!
//! Reversible tracing edits built on [`arbor_command`].
//!
//! - [`TracingBackend`] -- the server requests the commands issue
//! - [`AddTagsCommand`], [`RemoveTagCommand`] -- node tags
//! - [`CreateNodeCommand`], [`InsertNodeCommand`], [`RemoveNodeCommand`] --
//!   skeleton nodes, with ID re-mapping when undo or redo re-creates a node
//! - [`UpdateNodeRadiusCommand`] -- node radii
//! - [`UpdateConfidenceCommand`] -- edge confidence
//!
//! Node-changing requests carry an [`arbor_state::State`] built from the
//! client's [`arbor_state::LocalState`]; a stale one comes back as
//! [`arbor_command::CommandError::StateConflict`] and leaves the history
//! untouched.

pub mod backend;
pub mod error;
pub mod nodes;
pub mod tags;

pub use backend::{
    ConfidenceTarget, ConfidenceUpdate, CreatedNode, Location, NewLink, NewNode, RadiusChange,
    RadiusUpdate, RadiusUpdateMode, RemovedLink, RemovedNode, TagUpdate, TracingBackend,
    UpdatedRadius,
};
pub use error::BackendError;
pub use nodes::{
    CreateNodeCommand, InsertNodeCommand, MAX_CONFIDENCE, RemoveNodeCommand,
    UpdateConfidenceCommand, UpdateNodeRadiusCommand,
};
pub use tags::{AddTagsCommand, RemoveTagCommand};
