//! Command and history error types.

use arbor_state::{State, StateError};
use thiserror::Error;

/// Errors raised by individual commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command was built without a required part.
    #[error("invalid command {title:?}: {reason}")]
    Construction {
        /// Title of the command being built.
        title: String,
        /// What was missing.
        reason: String,
    },

    /// `undo` ran without data from a prior successful `execute`.
    #[error("can't undo {command:?}, undo data not available")]
    UndoDataMissing {
        /// Title of the command.
        command: String,
    },

    /// The server rejected the request because the submitted state is stale.
    #[error("the provided state differs from the database state: {message}")]
    StateConflict {
        /// Server message.
        message: String,
        /// The state that was submitted, if known.
        state: Option<State>,
    },

    /// The backend request failed for another reason.
    #[error("backend request failed: {0}")]
    Backend(String),

    /// A state could not be built or parsed.
    #[error(transparent)]
    State(#[from] StateError),

    /// A serialization or deserialization error.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other command-specific failure.
    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    /// Convenience constructor for [`CommandError::UndoDataMissing`].
    pub fn undo_data_missing(command: impl Into<String>) -> Self {
        Self::UndoDataMissing {
            command: command.into(),
        }
    }

    /// Convenience constructor for [`CommandError::Construction`].
    pub fn construction(title: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construction {
            title: title.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the server reported a concurrent modification.
    #[must_use]
    pub fn is_state_conflict(&self) -> bool {
        matches!(self, Self::StateConflict { .. })
    }
}

/// Errors raised by [`CommandHistory`](crate::CommandHistory) operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// `undo` was called with every entry already undone.
    #[error("nothing to undo")]
    NothingToUndo,

    /// `redo` was called with no undone entry left.
    #[error("nothing to redo")]
    NothingToRedo,

    /// The history configuration was rejected.
    #[error("invalid history config: {0}")]
    InvalidConfig(String),

    /// The command itself failed; the journal is unchanged.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The task running the operation was cancelled before it finished,
    /// which only happens while the runtime shuts down.
    #[error("history operation interrupted: {0}")]
    Interrupted(String),
}

impl HistoryError {
    /// Returns `true` for conditions that are warnings to the user rather
    /// than failures ("nothing to undo/redo").
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::NothingToUndo | Self::NothingToRedo)
    }

    /// The underlying command error, if any.
    #[must_use]
    pub fn as_command_error(&self) -> Option<&CommandError> {
        match self {
            Self::Command(err) => Some(err),
            _ => None,
        }
    }
}
