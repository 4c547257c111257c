//! Development server with live reload for lectern decks.
//!
//! Serves the built bundle from one or more roots, injects a live-reload
//! client into HTML pages, and watches the project for changes.

pub mod livereload;
pub mod rules;
pub mod server;
pub mod watcher;

pub use livereload::{ReloadHub, ReloadMessage};
pub use rules::{WatchRule, WatchRules};
pub use server::{bind_available, DevServer, DevServerConfig, ServerError};
pub use watcher::{ChangeKind, FileWatcher, WatchEvent};
