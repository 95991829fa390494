//! State error types.

use arbor_core::{CoreError, NodeId};
use thiserror::Error;

/// Errors raised while building or parsing a [`State`](crate::State).
#[derive(Debug, Error)]
pub enum StateError {
    /// The input was not valid JSON.
    #[error("invalid state JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The input was empty (`null`, `""`, `{}` or `[]`).
    #[error("no state provided")]
    Empty,

    /// The top-level value was not an object.
    #[error("invalid state provided, expected a JSON object")]
    NotAnObject,

    /// The parent reference was malformed.
    #[error("invalid state provided, invalid parent: {0}")]
    InvalidParent(String),

    /// A child reference was malformed.
    #[error("invalid state provided, invalid children: {0}")]
    InvalidChildren(String),

    /// A link reference was malformed.
    #[error("invalid state provided, invalid links: {0}")]
    InvalidLinks(String),

    /// Node-level fields were given without the node's own edition time.
    #[error("invalid state provided, missing edition time")]
    MissingEditionTime,

    /// An ID or timestamp could not be parsed.
    #[error("invalid state provided, {0}")]
    Value(#[from] CoreError),

    /// The local snapshot has no record of a node.
    #[error("no local state for node {0}")]
    UnknownNode(NodeId),
}
