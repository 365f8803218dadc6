//! Core engine module - the data model and ranking logic.
//!
//! This module contains everything that decides *what* to show:
//! - Entries, tag paths and usage maps
//! - Query parsing (tag filter extraction)
//! - The ranking engine

pub mod entry;
pub mod query;
pub mod search;

pub use entry::{Entry, EntryKind, EntrySource, StoredEntries, TagPath, UsageMap};
pub use query::ParsedQuery;
pub use search::{SearchEngine, SearchResult};
