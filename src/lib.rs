//! Jumpmark - the core of a type-to-jump launcher.
//!
//! Jumpmark decides *what* a launcher shows as the user types and *how much*
//! of it needs to be materialized. Rendering, persistence media and network
//! fetching belong to the embedder.
//!
//! # Architecture
//!
//! The library is organized into these main modules:
//!
//! - [`config`] - Configuration loading and management
//! - [`core`] - Entries, query parsing and the ranking engine
//! - [`services`] - Fuzzy matching, tag hierarchy, caches, usage counting
//!   and list windowing
//! - [`context`] - The context object that owns the caches
//!
//! Per keystroke, a raw query has its tag filter split off, the entry
//! snapshot is narrowed and fuzzy-scored with a usage boost, and the sorted
//! result is handed to a [`VirtualScrollManager`] that maps a scroll offset
//! to the handful of rows worth rendering.
//!
//! # Example
//!
//! ```no_run
//! use jumpmark::{Config, Entry, LauncherContext};
//!
//! let mut ctx = LauncherContext::in_memory(Config::load());
//! let entries = vec![
//!     Entry::new("a", "GitHub", "https://github.com"),
//!     Entry::new("b", "GitLab", "https://gitlab.com"),
//! ];
//!
//! ctx.search("gh", &entries).unwrap();
//! for row in ctx.visible(0.0) {
//!     println!("{} at {}px", row.item.payload.name, row.style.top);
//! }
//! ```

pub mod config;
pub mod context;
pub mod core;
pub mod logging;
pub mod services;

mod error;

// Re-export commonly used types for convenience
pub use config::Config;
pub use context::LauncherContext;
pub use crate::core::entry::{Entry, EntryKind, EntrySource, TagPath, UsageMap};
pub use crate::core::search::{SearchEngine, SearchResult};
pub use error::{JumpError, JumpResult};
pub use services::storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use services::virtual_list::{ScrollAlignment, VirtualItem, VirtualScrollManager};
