//! Log processing for devconsole
//!
//! This crate provides the log list of a developer console: an ordered
//! store with deduplication of repeated entries, nested groups, bounded
//! retention, filtering and incremental rendering.

mod buffer;
mod command;
mod console;
mod error;
mod eval;
mod events;
mod filter;
mod loader;
mod render;

pub use buffer::{Eviction, GroupTracker, InsertReport, Insertion, LogStore, MaxEntries};
pub use command::{COMMANDS, Command, CommandInfo, ConsoleInput, help_markup};
pub use console::{Console, ConsoleConfig};
pub use error::{EvalError, LoadError};
pub use eval::{Evaluator, JsonEvaluator};
pub use events::{ConsoleEvent, EventBus, EventKind, ListenerId};
pub use filter::Filter;
pub use loader::{HelperLoader, LoadOutcome};
pub use render::{Renderer, ScopeId, ScopeTree, Viewport};

// Re-export types used in our public API
pub use devconsole_types::{Entry, EntryId, EntryKind, EntryOptions, LogValue};
