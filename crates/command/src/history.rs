//! Bounded command journal with serialized undo and redo.
//!
//! The journal is an ordered list of executed commands plus a pointer to the
//! most recently applied one. `None` means "before the first entry": every
//! entry is undone, or nothing was executed yet.
//!
//! All mutating operations pass one FIFO gate (a `tokio::sync::Mutex`, which
//! is fair). A caller that starts an operation without waiting for the
//! previous one to finish is queued and served in the order the operations
//! first polled the gate. The journal view used by [`CommandHistory::current_entry`]
//! and friends is published only after an operation commits, so those reads
//! never block and never observe a half-applied state.
//!
//! Once an operation holds the gate, the command runs on its own tokio task
//! together with the journal commit. Dropping the caller's future (a timeout,
//! a `select!` branch losing) only stops the wait: the command still runs to
//! completion and a successful one is recorded, so its server change stays
//! undoable. An operation dropped while still queued never starts.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard, broadcast};

use crate::command::Command;
use crate::config::HistoryConfig;
use crate::error::HistoryError;
use crate::event::HistoryEvent;
use crate::id_map::IdMap;

struct Journal {
    entries: VecDeque<Box<dyn Command>>,
    pointer: Option<usize>,
}

impl Journal {
    fn next(&self) -> usize {
        self.pointer.map_or(0, |p| p + 1)
    }
}

/// Committed snapshot of the journal for non-blocking reads.
#[derive(Debug, Default)]
struct JournalView {
    titles: Vec<String>,
    pointer: Option<usize>,
}

/// Everything an operation task needs besides the journal itself.
struct Shared {
    view: RwLock<JournalView>,
    id_map: IdMap,
    events: broadcast::Sender<HistoryEvent>,
    config: HistoryConfig,
}

impl Shared {
    fn publish(&self, journal: &Journal) {
        let mut view = self.view.write();
        view.titles = journal
            .entries
            .iter()
            .map(|c| c.title().to_owned())
            .collect();
        view.pointer = journal.pointer;
    }

    fn emit(&self, event: HistoryEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn execute(
        &self,
        mut journal: OwnedMutexGuard<Journal>,
        mut command: Box<dyn Command>,
    ) -> Result<Value, HistoryError> {
        let output = command.execute(&self.id_map).await.inspect_err(|err| {
            tracing::debug!(
                title = command.title(),
                error = %err,
                "command failed, journal unchanged"
            );
        })?;

        let title = command.title().to_owned();
        let keep = journal.next();
        let discarded = journal.entries.len() - keep;
        journal.entries.truncate(keep);
        journal.entries.push_back(command);
        journal.pointer = Some(journal.entries.len() - 1);

        let mut evicted = Vec::new();
        while journal.entries.len() > self.config.capacity {
            if let Some(old) = journal.entries.pop_front() {
                tracing::info!(
                    title = old.title(),
                    capacity = self.config.capacity,
                    "oldest entry evicted"
                );
                evicted.push(old.title().to_owned());
            }
            journal.pointer = journal.pointer.and_then(|p| p.checked_sub(1));
        }

        self.publish(&journal);
        let pointer = journal.pointer;
        drop(journal);

        tracing::debug!(title = %title, discarded, ?pointer, "command executed");
        self.emit(HistoryEvent::Executed { title, redo: false });
        for title in evicted {
            self.emit(HistoryEvent::Evicted { title });
        }
        Ok(output)
    }

    async fn undo(&self, mut journal: OwnedMutexGuard<Journal>) -> Result<Value, HistoryError> {
        let Some(index) = journal.pointer else {
            tracing::warn!("nothing to undo");
            return Err(HistoryError::NothingToUndo);
        };
        let Some(command) = journal.entries.get_mut(index) else {
            return Err(HistoryError::NothingToUndo);
        };

        let output = command.undo(&self.id_map).await.inspect_err(|err| {
            tracing::warn!(title = command.title(), error = %err, "undo failed");
        })?;
        let title = command.title().to_owned();

        journal.pointer = index.checked_sub(1);
        self.publish(&journal);
        drop(journal);

        tracing::debug!(title = %title, index, "command undone");
        self.emit(HistoryEvent::Undone { title });
        Ok(output)
    }

    async fn redo(&self, mut journal: OwnedMutexGuard<Journal>) -> Result<Value, HistoryError> {
        let index = journal.next();
        let Some(command) = journal.entries.get_mut(index) else {
            tracing::warn!("nothing to redo");
            return Err(HistoryError::NothingToRedo);
        };

        let output = command.execute(&self.id_map).await.inspect_err(|err| {
            tracing::warn!(title = command.title(), error = %err, "redo failed");
        })?;
        let title = command.title().to_owned();

        journal.pointer = Some(index);
        self.publish(&journal);
        drop(journal);

        tracing::debug!(title = %title, index, "command redone");
        self.emit(HistoryEvent::Executed { title, redo: true });
        Ok(output)
    }
}

/// Undo/redo journal for tracing edits.
///
/// Operations take `&self`; share the history behind an `Arc` when several
/// tasks issue edits. `execute`, `undo` and `redo` spawn onto the current
/// tokio runtime and must be called from within one.
pub struct CommandHistory {
    journal: Arc<Mutex<Journal>>,
    shared: Arc<Shared>,
}

impl CommandHistory {
    /// Create a history with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(HistoryConfig::default())
    }

    /// Create a history with the given configuration.
    pub fn with_config(config: HistoryConfig) -> Result<Self, HistoryError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a history keeping at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Result<Self, HistoryError> {
        Self::with_config(HistoryConfig::with_capacity(capacity))
    }

    fn build(config: HistoryConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer);
        Self {
            journal: Arc::new(Mutex::new(Journal {
                entries: VecDeque::new(),
                pointer: None,
            })),
            shared: Arc::new(Shared {
                view: RwLock::new(JournalView::default()),
                id_map: IdMap::new(),
                events,
                config,
            }),
        }
    }

    /// Wait for the gate, then finish `operation` on its own task.
    async fn run<F, Fut>(&self, operation: F) -> Result<Value, HistoryError>
    where
        F: FnOnce(Arc<Shared>, OwnedMutexGuard<Journal>) -> Fut,
        Fut: Future<Output = Result<Value, HistoryError>> + Send + 'static,
    {
        let journal = Arc::clone(&self.journal).lock_owned().await;
        let task = tokio::spawn(operation(Arc::clone(&self.shared), journal));
        match task.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(HistoryError::Interrupted(err.to_string())),
        }
    }

    /// Execute `command` and record it.
    ///
    /// On success any undone entries are discarded, the command becomes the
    /// newest entry and the oldest entry is evicted if the journal is over
    /// capacity. On failure the command's error is returned and the journal
    /// is left as it was.
    pub async fn execute<C>(&self, command: C) -> Result<Value, HistoryError>
    where
        C: Command + 'static,
    {
        let command: Box<dyn Command> = Box::new(command);
        self.run(|shared, journal| async move { shared.execute(journal, command).await })
            .await
    }

    /// Undo the entry at the pointer and move the pointer back one step.
    pub async fn undo(&self) -> Result<Value, HistoryError> {
        self.run(|shared, journal| async move { shared.undo(journal).await })
            .await
    }

    /// Execute the entry after the pointer again and move the pointer to it.
    pub async fn redo(&self) -> Result<Value, HistoryError> {
        self.run(|shared, journal| async move { shared.redo(journal).await })
            .await
    }

    /// Drop every entry and all ID mappings.
    ///
    /// Waits for in-flight operations like any other mutation.
    pub async fn clear(&self) {
        let mut journal = self.journal.lock().await;
        journal.entries.clear();
        journal.pointer = None;
        self.shared.id_map.clear();
        self.shared.publish(&journal);
        drop(journal);

        tracing::info!("history cleared");
        self.shared.emit(HistoryEvent::Cleared);
    }

    /// Index of the most recently applied entry, `None` if every entry is
    /// undone or the journal is empty.
    #[must_use]
    pub fn current_entry(&self) -> Option<usize> {
        self.shared.view.read().pointer
    }

    /// Number of entries in the journal, including undone ones.
    #[must_use]
    pub fn n_entries(&self) -> usize {
        self.shared.view.read().titles.len()
    }

    /// Titles of all entries, oldest first.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.shared.view.read().titles.clone()
    }

    /// Returns `true` if [`undo`](Self::undo) has an entry to work on.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.shared.view.read().pointer.is_some()
    }

    /// Returns `true` if [`redo`](Self::redo) has an entry to work on.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        let view = self.shared.view.read();
        view.pointer.map_or(0, |p| p + 1) < view.titles.len()
    }

    /// Maximum number of entries kept.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.config.capacity
    }

    /// ID map shared by the commands of this history.
    #[must_use]
    pub fn id_map(&self) -> &IdMap {
        &self.shared.id_map
    }

    /// Subscribe to history events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.shared.events.subscribe()
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.shared.view.read();
        f.debug_struct("CommandHistory")
            .field("entries", &view.titles)
            .field("current_entry", &view.pointer)
            .field("capacity", &self.shared.config.capacity)
            .finish()
    }
}
