//! Tag commands.

use std::fmt;
use std::sync::Arc;

use arbor_command::{Command, CommandResult, IdMap, UndoData};
use arbor_core::{NodeId, ProjectId};
use async_trait::async_trait;
use serde_json::Value;

use crate::backend::TracingBackend;

/// Add tags to a node.
///
/// Undo removes exactly the tags the server reported as new, so tags the
/// node already had survive the round trip. With `delete_existing` the
/// removed tags are not restored by undo.
pub struct AddTagsCommand {
    backend: Arc<dyn TracingBackend>,
    project: ProjectId,
    node: NodeId,
    tags: Vec<String>,
    delete_existing: bool,
    title: String,
    added: UndoData<Vec<String>>,
}

impl AddTagsCommand {
    /// Add `tags` to `node`, replacing all its tags when `delete_existing`.
    pub fn new(
        backend: Arc<dyn TracingBackend>,
        project: ProjectId,
        node: NodeId,
        tags: Vec<String>,
        delete_existing: bool,
    ) -> Self {
        let title = match (delete_existing, tags.is_empty()) {
            (true, true) => format!("Remove all tags from node {node}"),
            (true, false) => format!(
                "Replace existing tags of node {node} with tags {}",
                tags.join(", ")
            ),
            (false, _) => format!("Add tag(s) {} to node {node}", tags.join(", ")),
        };
        Self {
            backend,
            project,
            node,
            tags,
            delete_existing,
            title,
            added: UndoData::NotYetExecuted,
        }
    }
}

#[async_trait]
impl Command for AddTagsCommand {
    fn title(&self) -> &str {
        &self.title
    }

    async fn execute(&mut self, map: &IdMap) -> CommandResult {
        let node = map.node(self.node);
        let update = self
            .backend
            .add_tags(self.project, node, &self.tags, self.delete_existing)
            .await?;
        tracing::debug!(%node, added = ?update.new_labels, "tags added");
        let output = serde_json::to_value(&update)?;
        self.added.stash(update.new_labels);
        Ok(output)
    }

    async fn undo(&mut self, map: &IdMap) -> CommandResult {
        let node = map.node(self.node);
        let mut pending = self.added.take(&self.title)?;
        let total = pending.len();
        while !pending.is_empty() {
            let tag = pending.remove(0);
            if let Err(err) = self.backend.remove_tag(self.project, node, &tag).await {
                // Only the tags still on the node are left for a retry.
                pending.insert(0, tag);
                self.added.stash(pending);
                return Err(err.into());
            }
        }
        tracing::debug!(%node, removed = total, "added tags removed");
        Ok(Value::Null)
    }
}

impl fmt::Debug for AddTagsCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddTagsCommand")
            .field("project", &self.project)
            .field("node", &self.node)
            .field("tags", &self.tags)
            .field("delete_existing", &self.delete_existing)
            .field("added", &self.added)
            .finish_non_exhaustive()
    }
}

/// Remove one tag from a node. Undo adds it back if it was actually removed.
pub struct RemoveTagCommand {
    backend: Arc<dyn TracingBackend>,
    project: ProjectId,
    node: NodeId,
    tag: String,
    title: String,
    deleted: UndoData<Vec<String>>,
}

impl RemoveTagCommand {
    /// Remove `tag` from `node`.
    pub fn new(
        backend: Arc<dyn TracingBackend>,
        project: ProjectId,
        node: NodeId,
        tag: impl Into<String>,
    ) -> Self {
        let tag = tag.into();
        Self {
            title: format!("Remove tag {tag} from node {node}"),
            backend,
            project,
            node,
            tag,
            deleted: UndoData::NotYetExecuted,
        }
    }
}

#[async_trait]
impl Command for RemoveTagCommand {
    fn title(&self) -> &str {
        &self.title
    }

    async fn execute(&mut self, map: &IdMap) -> CommandResult {
        let node = map.node(self.node);
        let update = self
            .backend
            .remove_tag(self.project, node, &self.tag)
            .await?;
        let output = serde_json::to_value(&update)?;
        self.deleted.stash(update.deleted_labels);
        Ok(output)
    }

    async fn undo(&mut self, map: &IdMap) -> CommandResult {
        let deleted = self.deleted.get(&self.title)?;
        let output = if deleted.is_empty() {
            Value::Null
        } else {
            let node = map.node(self.node);
            let update = self
                .backend
                .add_tags(self.project, node, deleted, false)
                .await?;
            serde_json::to_value(&update)?
        };
        self.deleted.clear();
        Ok(output)
    }
}

impl fmt::Debug for RemoveTagCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoveTagCommand")
            .field("project", &self.project)
            .field("node", &self.node)
            .field("tag", &self.tag)
            .field("deleted", &self.deleted)
            .finish_non_exhaustive()
    }
}
