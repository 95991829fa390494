//! History events.
//!
//! [`CommandHistory`](crate::CommandHistory) broadcasts one event per
//! committed operation through `tokio::sync::broadcast`. Emission is
//! fire-and-forget: with no subscribers the event is dropped.

/// Events emitted by the command history after an operation committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    /// A command was executed, either new (`redo = false`) or redone.
    Executed {
        /// Command title.
        title: String,
        /// Whether this was a redo.
        redo: bool,
    },
    /// A command was undone.
    Undone {
        /// Command title.
        title: String,
    },
    /// The oldest entry was dropped to stay within capacity.
    Evicted {
        /// Command title.
        title: String,
    },
    /// The journal was cleared.
    Cleared,
}

impl HistoryEvent {
    /// Title of the command the event is about, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Executed { title, .. } | Self::Undone { title } | Self::Evicted { title } => {
                Some(title)
            }
            Self::Cleared => None,
        }
    }
}
