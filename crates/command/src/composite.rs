//! Several commands as one journal entry.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::command::{Command, CommandResult};
use crate::error::CommandError;
use crate::id_map::IdMap;

/// Groups commands so they are undone and redone together.
///
/// Children run in insertion order and share the history's [`IdMap`]. Undo
/// runs them in reverse. If a child fails partway, the children that already
/// succeeded are reversed again before the error is returned, so the
/// composite either fully applies or not at all (best effort: failures while
/// rolling back are logged).
pub struct CompositeCommand {
    title: String,
    commands: Vec<Box<dyn Command>>,
}

impl CompositeCommand {
    /// Create an empty composite.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            commands: Vec::new(),
        }
    }

    /// Append a child command.
    pub fn add(&mut self, command: impl Command + 'static) {
        self.commands.push(Box::new(command));
    }

    /// Number of child commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if there are no child commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Start a builder.
    pub fn builder(title: impl Into<String>) -> CompositeBuilder {
        CompositeBuilder {
            composite: Self::new(title),
        }
    }
}

impl fmt::Debug for CompositeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeCommand")
            .field("title", &self.title)
            .field(
                "commands",
                &self.commands.iter().map(|c| c.title()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[async_trait]
impl Command for CompositeCommand {
    fn title(&self) -> &str {
        &self.title
    }

    async fn execute(&mut self, map: &IdMap) -> CommandResult {
        let mut outputs = Vec::with_capacity(self.commands.len());
        for index in 0..self.commands.len() {
            match self.commands[index].execute(map).await {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    for done in self.commands[..index].iter_mut().rev() {
                        if let Err(rollback) = done.undo(map).await {
                            tracing::warn!(
                                composite = %self.title,
                                title = done.title(),
                                error = %rollback,
                                "rollback after failed child left a change applied"
                            );
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(Value::Array(outputs))
    }

    async fn undo(&mut self, map: &IdMap) -> CommandResult {
        let mut outputs = Vec::with_capacity(self.commands.len());
        let count = self.commands.len();
        for index in (0..count).rev() {
            match self.commands[index].undo(map).await {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    for undone in self.commands[index + 1..].iter_mut() {
                        if let Err(rollback) = undone.execute(map).await {
                            tracing::warn!(
                                composite = %self.title,
                                title = undone.title(),
                                error = %rollback,
                                "re-applying child after failed undo failed"
                            );
                        }
                    }
                    return Err(err);
                }
            }
        }
        outputs.reverse();
        Ok(Value::Array(outputs))
    }
}

/// Fluent builder for [`CompositeCommand`].
pub struct CompositeBuilder {
    composite: CompositeCommand,
}

impl CompositeBuilder {
    /// Append a child command.
    pub fn command(mut self, command: impl Command + 'static) -> Self {
        self.composite.add(command);
        self
    }

    /// Append a child command if `condition` holds.
    pub fn command_if(self, condition: bool, command: impl Command + 'static) -> Self {
        if condition {
            self.command(command)
        } else {
            self
        }
    }

    /// Finish the composite. Fails if no child was added.
    pub fn build(self) -> CommandResult<CompositeCommand> {
        if self.composite.is_empty() {
            return Err(CommandError::construction(
                &self.composite.title,
                "composite has no commands",
            ));
        }
        Ok(self.composite)
    }
}
