//! Error type for tracing backend requests.
//!
//! Backend drivers map their transport and server errors into these
//! variants. A stale state is kept apart from other failures so commands can
//! surface it as a concurrent-modification conflict.

use arbor_command::CommandError;
use arbor_state::State;

/// Error type for all [`TracingBackend`](crate::TracingBackend) requests.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The server rejected the submitted state as out of date.
    #[error("state mismatch: {message}")]
    StateMismatch {
        /// Server message describing the difference.
        message: String,
        /// The state that was submitted. `None` for requests that only
        /// carry edition times, such as radius updates.
        state: Option<State>,
    },

    /// The target entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity (e.g. "node").
        entity: String,
        /// Identifier that was looked up.
        id: String,
    },

    /// Any other request failure (connection, permissions, server error).
    #[error("request failed: {0}")]
    Request(String),
}

impl BackendError {
    /// Convenience constructor for [`BackendError::StateMismatch`].
    pub fn state_mismatch(message: impl Into<String>, state: State) -> Self {
        Self::StateMismatch {
            message: message.into(),
            state: Some(state),
        }
    }

    /// A stale edition time on a request without a [`State`].
    pub fn stale_version(message: impl Into<String>) -> Self {
        Self::StateMismatch {
            message: message.into(),
            state: None,
        }
    }

    /// Convenience constructor for [`BackendError::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<BackendError> for CommandError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::StateMismatch { message, state } => {
                Self::StateConflict { message, state }
            }
            other => Self::Backend(other.to_string()),
        }
    }
}
