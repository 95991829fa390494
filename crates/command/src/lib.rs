#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Arbor Command
//!
//! Reversible tracing edits and the journal that undoes and redoes them.
//!
//! - [`Command`] -- a unit of reversible async work with a title
//! - [`make_command`] -- build a command from an `exec`/`undo` closure pair
//! - [`UndoData`] -- the typed "what do I need to reverse myself" payload
//! - [`IdMap`] -- original-to-current ID translation shared by related commands
//! - [`CommandHistory`] -- bounded journal with serialized execute/undo/redo
//! - [`CompositeCommand`] -- several commands as one journal entry
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI64, Ordering};
//!
//! use arbor_command::{CommandHistory, Executed, make_command};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let counter = Arc::new(AtomicI64::new(0));
//! let (up, down) = (Arc::clone(&counter), Arc::clone(&counter));
//!
//! let increment = make_command::<i64>("Increment counter")
//!     .exec(move |_map| {
//!         let counter = Arc::clone(&up);
//!         async move {
//!             let before = counter.fetch_add(1, Ordering::SeqCst);
//!             Ok(Executed::new(json!(before + 1), before))
//!         }
//!     })
//!     .undo(move |before, _map| {
//!         let counter = Arc::clone(&down);
//!         async move {
//!             counter.store(before, Ordering::SeqCst);
//!             Ok(json!(before))
//!         }
//!     })
//!     .build()?;
//!
//! let history = CommandHistory::new();
//! history.execute(increment).await?;
//! history.undo().await?;
//! history.redo().await?;
//! assert_eq!(counter.load(Ordering::SeqCst), 1);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod composite;
pub mod config;
pub mod error;
pub mod event;
pub mod factory;
pub mod history;
pub mod id_map;

pub use command::{Command, CommandResult, UndoData};
pub use composite::{CompositeBuilder, CompositeCommand};
pub use config::HistoryConfig;
pub use error::{CommandError, HistoryError};
pub use event::HistoryEvent;
pub use factory::{CommandBuilder, Executed, FnCommand, make_command};
pub use history::CommandHistory;
pub use id_map::{IdKind, IdMap, Mapped};

/// Prelude for command authors.
pub mod prelude {
    pub use super::{
        Command, CommandError, CommandHistory, CommandResult, CompositeCommand, Executed,
        HistoryConfig, HistoryError, HistoryEvent, IdKind, IdMap, UndoData, make_command,
    };
}
