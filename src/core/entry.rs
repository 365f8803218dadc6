//! Launcher entries and their tag paths.
//!
//! Entries arrive as an immutable snapshot from whatever manages them; the
//! core only ever reads them. Tags are stored as `/`-separated strings at the
//! boundary and parsed into [`TagPath`] segments for every hierarchy-aware
//! operation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::JumpResult;
use crate::services::storage::KeyValueStore;

/// Separator between tag path segments.
pub const TAG_SEPARATOR: char = '/';

/// Per-entry usage counts keyed by entry id.
pub type UsageMap = HashMap<String, u64>;

/// Type of entry for categorization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Bookmark,
    /// A url template with a `{query}` placeholder
    Quicklink,
    Tab,
    History,
}

/// A single jump target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique, stable identifier.
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub kind: EntryKind,
}

impl Entry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            tags: Vec::new(),
            kind: EntryKind::Bookmark,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_kind(mut self, kind: EntryKind) -> Self {
        self.kind = kind;
        self
    }

    /// Parsed tag paths, skipping tags that are empty after normalization.
    pub fn tag_paths(&self) -> impl Iterator<Item = TagPath> + '_ {
        self.tags
            .iter()
            .map(|t| TagPath::parse(t))
            .filter(|p| !p.is_empty())
    }

    /// Tags joined into the single text field the matcher scores.
    pub fn joined_tags(&self) -> String {
        self.tags.join(" ")
    }

    pub fn has_query_placeholder(&self) -> bool {
        self.kind == EntryKind::Quicklink && self.url.contains("{query}")
    }

    /// Resolve the url to open, filling in a quicklink's `{query}`.
    pub fn resolve_url(&self, query: &str) -> String {
        if self.has_query_placeholder() {
            self.url.replace("{query}", &urlencoding::encode(query))
        } else {
            self.url.clone()
        }
    }

    /// Lowercased host of the entry url, if it parses.
    pub fn host(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.url).ok()?;
        parsed.host_str().map(|h| h.to_lowercase())
    }
}

/// A tag parsed into its ordered path segments (`"a/b"` -> `["a", "b"]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagPath {
    segments: Vec<String>,
}

impl TagPath {
    /// Parse a tag string: trimmed, lowercased, empty segments dropped.
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .trim()
            .to_lowercase()
            .split(TAG_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Zero for a top-level tag.
    pub fn depth(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    pub fn parent(&self) -> Option<TagPath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// All proper ancestors, nearest first.
    pub fn ancestors(&self) -> Vec<TagPath> {
        (1..self.segments.len())
            .rev()
            .map(|len| Self {
                segments: self.segments[..len].to_vec(),
            })
            .collect()
    }

    /// True when `self` equals `other` or is a leading run of its segments.
    pub fn is_prefix_of(&self, other: &TagPath) -> bool {
        !self.is_empty()
            && self.segments.len() <= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    pub fn contains_segment(&self, segment: &str) -> bool {
        self.segments.iter().any(|s| s == segment)
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Supplies the current entry snapshot.
pub trait EntrySource {
    fn list_entries(&self) -> JumpResult<Vec<Entry>>;
}

impl EntrySource for [Entry] {
    fn list_entries(&self) -> JumpResult<Vec<Entry>> {
        Ok(self.to_vec())
    }
}

impl EntrySource for Vec<Entry> {
    fn list_entries(&self) -> JumpResult<Vec<Entry>> {
        Ok(self.clone())
    }
}

/// Entries persisted under a single key of a durable store.
pub struct StoredEntries {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl StoredEntries {
    pub const DEFAULT_KEY: &'static str = "entries";

    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, Self::DEFAULT_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
        }
    }

    /// Replace the stored snapshot.
    pub fn replace(&self, entries: &[Entry]) -> JumpResult<()> {
        self.store.set(&self.key, serde_json::to_value(entries)?)
    }
}

impl EntrySource for StoredEntries {
    fn list_entries(&self) -> JumpResult<Vec<Entry>> {
        match self.store.get(&self.key)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::MemoryStore;

    #[test]
    fn test_tag_path_parse() {
        let path = TagPath::parse("  Dev//Tools/ ");
        assert_eq!(path.segments(), &["dev".to_string(), "tools".to_string()]);
        assert_eq!(path.depth(), 1);
        assert_eq!(path.to_string(), "dev/tools");
        assert!(TagPath::parse(" / ").is_empty());
    }

    #[test]
    fn test_tag_path_ancestors() {
        let path = TagPath::parse("a/b/c");
        let ancestors: Vec<String> = path.ancestors().iter().map(|p| p.to_string()).collect();
        assert_eq!(ancestors, vec!["a/b", "a"]);
        assert_eq!(path.parent().unwrap().to_string(), "a/b");
        assert!(TagPath::parse("a").parent().is_none());
    }

    #[test]
    fn test_tag_path_prefix() {
        let dev = TagPath::parse("dev");
        let tools = TagPath::parse("dev/tools");
        assert!(dev.is_prefix_of(&tools));
        assert!(tools.is_prefix_of(&tools));
        assert!(!tools.is_prefix_of(&dev));
        assert!(!TagPath::parse("de").is_prefix_of(&tools));
    }

    #[test]
    fn test_quicklink_resolve() {
        let entry = Entry::new("s", "Search", "https://duckduckgo.com/?q={query}")
            .with_kind(EntryKind::Quicklink);
        assert!(entry.has_query_placeholder());
        assert_eq!(
            entry.resolve_url("rust lang"),
            "https://duckduckgo.com/?q=rust%20lang"
        );

        let bookmark = Entry::new("b", "Docs", "https://docs.rs/{query}");
        assert_eq!(bookmark.resolve_url("x"), "https://docs.rs/{query}");
    }

    #[test]
    fn test_host() {
        let entry = Entry::new("a", "GitHub", "https://GitHub.com/rust-lang");
        assert_eq!(entry.host().as_deref(), Some("github.com"));
        assert_eq!(Entry::new("b", "Bad", "not a url").host(), None);
    }

    #[test]
    fn test_entry_deserialize_defaults() {
        let entry: Entry =
            serde_json::from_str(r#"{"id":"a","name":"A","url":"https://a.test"}"#).unwrap();
        assert!(entry.tags.is_empty());
        assert_eq!(entry.kind, EntryKind::Bookmark);

        let tab: Entry = serde_json::from_str(
            r#"{"id":"t","name":"T","url":"https://t.test","tags":["x"],"kind":"tab"}"#,
        )
        .unwrap();
        assert_eq!(tab.kind, EntryKind::Tab);
    }

    #[test]
    fn test_stored_entries() {
        let store = Arc::new(MemoryStore::new());
        let source = StoredEntries::new(store);
        assert!(source.list_entries().unwrap().is_empty());

        let entries = vec![Entry::new("a", "A", "https://a.test").with_tags(["dev"])];
        source.replace(&entries).unwrap();
        assert_eq!(source.list_entries().unwrap(), entries);
    }
}
