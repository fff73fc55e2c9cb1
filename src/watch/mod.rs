// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Keeping the set of watched directories in sync with the tree
//!   ([`watch_set`]).
//! - Wiring up the platform filesystem watcher (`notify`) ([`source`]).
//! - Coalescing bursts of events per path ([`debounce`]).
//! - Turning debounced events into rebuilds and restarts ([`router`]).

pub mod debounce;
pub mod event;
pub mod router;
pub mod source;
pub mod watch_set;

pub use debounce::{Action, ActionHandler, Debouncer, DEFAULT_QUIET_PERIOD};
pub use event::{FsEvent, FsEventKind};
pub use router::{reactions_for_write, ExtensionRules, Reaction, Router};
pub use source::{create_source, SourceChannels};
pub use watch_set::{is_hidden, WatchRegistry, WatchSet};
