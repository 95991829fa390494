//! Building commands from closures.
//!
//! [`make_command`] is for one-off commands that do not warrant their own
//! type. The `exec` closure returns the result value together with the undo
//! payload; the command stashes the payload and hands it to the `undo`
//! closure later.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::command::{Command, CommandResult, UndoData};
use crate::error::CommandError;
use crate::id_map::IdMap;

/// Outcome of a successful `exec`: the value returned to the caller and the
/// payload `undo` will need.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed<T> {
    /// Result value of the execution.
    pub output: Value,
    /// Payload stashed for undo.
    pub undo: T,
}

impl<T> Executed<T> {
    /// Pair a result value with its undo payload.
    pub fn new(output: Value, undo: T) -> Self {
        Self { output, undo }
    }
}

type ExecFn<T> = Box<dyn Fn(IdMap) -> BoxFuture<'static, CommandResult<Executed<T>>> + Send + Sync>;
type UndoFn<T> = Box<dyn Fn(T, IdMap) -> BoxFuture<'static, CommandResult> + Send + Sync>;

/// Start building a command titled `title` whose undo payload is `T`.
pub fn make_command<T>(title: impl Into<String>) -> CommandBuilder<T> {
    CommandBuilder {
        title: title.into(),
        exec: None,
        undo: None,
    }
}

/// Builder returned by [`make_command`].
pub struct CommandBuilder<T> {
    title: String,
    exec: Option<ExecFn<T>>,
    undo: Option<UndoFn<T>>,
}

impl<T> CommandBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Set the function that applies the change.
    pub fn exec<F, Fut>(mut self, exec: F) -> Self
    where
        F: Fn(IdMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult<Executed<T>>> + Send + 'static,
    {
        self.exec = Some(Box::new(move |map| Box::pin(exec(map))));
        self
    }

    /// Set the function that reverses the change from the stashed payload.
    pub fn undo<F, Fut>(mut self, undo: F) -> Self
    where
        F: Fn(T, IdMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        self.undo = Some(Box::new(move |data, map| Box::pin(undo(data, map))));
        self
    }

    /// Finish the command. Fails if `exec` or `undo` was not set.
    pub fn build(self) -> CommandResult<FnCommand<T>> {
        let exec = self
            .exec
            .ok_or_else(|| CommandError::construction(&self.title, "no exec function"))?;
        let undo = self
            .undo
            .ok_or_else(|| CommandError::construction(&self.title, "no undo function"))?;
        Ok(FnCommand {
            title: self.title,
            exec,
            undo,
            stash: UndoData::NotYetExecuted,
        })
    }
}

/// A command backed by an `exec`/`undo` closure pair.
///
/// A successful undo clears the stash, so undoing twice in a row fails with
/// [`CommandError::UndoDataMissing`]; a failed undo keeps it for a retry.
pub struct FnCommand<T> {
    title: String,
    exec: ExecFn<T>,
    undo: UndoFn<T>,
    stash: UndoData<T>,
}

impl<T> FnCommand<T> {
    /// Whether undo data from a successful execution is available.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.stash.is_available()
    }
}

impl<T> fmt::Debug for FnCommand<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCommand")
            .field("title", &self.title)
            .field("executed", &self.stash.is_available())
            .finish()
    }
}

#[async_trait]
impl<T> Command for FnCommand<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn title(&self) -> &str {
        &self.title
    }

    async fn execute(&mut self, map: &IdMap) -> CommandResult {
        let Executed { output, undo } = (self.exec)(map.clone()).await?;
        self.stash.stash(undo);
        Ok(output)
    }

    async fn undo(&mut self, map: &IdMap) -> CommandResult {
        let data = self.stash.get(&self.title)?.clone();
        let output = (self.undo)(data, map.clone()).await?;
        self.stash.clear();
        Ok(output)
    }
}
