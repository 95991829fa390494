//! Command trait and undo payloads.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CommandError;
use crate::id_map::IdMap;

/// Result type for command operations. Commands produce JSON values so that
/// heterogeneous commands can share one journal.
pub type CommandResult<T = Value> = Result<T, CommandError>;

/// A unit of reversible work.
///
/// `execute` applies the change and records whatever `undo` needs to reverse
/// it, without re-querying the server. `undo` must fail with
/// [`CommandError::UndoDataMissing`] instead of doing nothing when that
/// record is absent.
///
/// Both receive the [`IdMap`] of the history running them, which translates
/// IDs captured when the command was built into the IDs the entities carry
/// now (undoing a deletion re-creates the entity under a new ID).
#[async_trait]
pub trait Command: Send + Sync {
    /// Human-readable title for undo/redo menus and the history browser.
    fn title(&self) -> &str;

    /// Apply the change. Also used for redo.
    async fn execute(&mut self, map: &IdMap) -> CommandResult;

    /// Reverse the change made by the last successful [`execute`](Self::execute).
    async fn undo(&mut self, map: &IdMap) -> CommandResult;
}

#[async_trait]
impl<C: Command + ?Sized> Command for Box<C> {
    fn title(&self) -> &str {
        (**self).title()
    }

    async fn execute(&mut self, map: &IdMap) -> CommandResult {
        (**self).execute(map).await
    }

    async fn undo(&mut self, map: &IdMap) -> CommandResult {
        (**self).undo(map).await
    }
}

/// Data a command stashes during `execute` so that `undo` can reverse it.
///
/// The two states make "undo before execute" an explicit case instead of a
/// missing field: every accessor returns [`CommandError::UndoDataMissing`]
/// while nothing is stashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoData<T> {
    /// `execute` has not completed successfully yet (or was undone).
    NotYetExecuted,
    /// Payload recorded by the last successful `execute`.
    Executed(T),
}

impl<T> Default for UndoData<T> {
    fn default() -> Self {
        Self::NotYetExecuted
    }
}

impl<T> UndoData<T> {
    /// Record the payload of a successful `execute`, replacing any older one.
    pub fn stash(&mut self, data: T) {
        *self = Self::Executed(data);
    }

    /// Borrow the payload. `command` names the command in the error.
    pub fn get(&self, command: &str) -> CommandResult<&T> {
        match self {
            Self::Executed(data) => Ok(data),
            Self::NotYetExecuted => Err(CommandError::undo_data_missing(command)),
        }
    }

    /// Take the payload out, leaving [`UndoData::NotYetExecuted`].
    pub fn take(&mut self, command: &str) -> CommandResult<T> {
        match std::mem::take(self) {
            Self::Executed(data) => Ok(data),
            Self::NotYetExecuted => Err(CommandError::undo_data_missing(command)),
        }
    }

    /// Returns `true` if a payload is stashed.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Executed(_))
    }

    /// Drop the payload.
    pub fn clear(&mut self) {
        *self = Self::NotYetExecuted;
    }
}
