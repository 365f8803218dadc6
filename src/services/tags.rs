//! Hierarchical tags: listing, usage counts with roll-up, and filtering.
//!
//! Tags are `/`-separated paths (`dev/tools/cli`). An entry tagged with a
//! child path also counts toward, and matches filters for, every ancestor,
//! even when the ancestor tag itself is never written down.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::entry::{Entry, TagPath};

/// One autocomplete candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSuggestion {
    pub name: String,
    /// Entries under this tag, descendants included.
    pub count: usize,
    /// Zero for top-level tags.
    pub depth: usize,
    pub parent_path: Option<String>,
}

/// Distinct normalized tags across `entries`, alphabetical.
pub fn get_all_tags(entries: &[Entry]) -> Vec<String> {
    entries
        .iter()
        .flat_map(Entry::tag_paths)
        .map(|p| p.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Usage count per tag, rolled up so each ancestor also counts everything
/// beneath it. Ancestors that are never used directly still get an entry.
pub fn count_tag_usage(entries: &[Entry]) -> BTreeMap<String, usize> {
    let mut leaf_counts: BTreeMap<TagPath, usize> = BTreeMap::new();
    for entry in entries {
        let distinct: BTreeSet<TagPath> = entry.tag_paths().collect();
        for path in distinct {
            *leaf_counts.entry(path).or_insert(0) += 1;
        }
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for (path, leaf) in &leaf_counts {
        *counts.entry(path.to_string()).or_insert(0) += leaf;
        for ancestor in path.ancestors() {
            *counts.entry(ancestor.to_string()).or_insert(0) += leaf;
        }
    }
    counts
}

/// Build autocomplete candidates for `tags` and their ancestors, ordered by
/// depth and then alphabetically.
pub fn create_tag_suggestions(
    tags: &[String],
    counts: &BTreeMap<String, usize>,
) -> Vec<TagSuggestion> {
    let mut paths: BTreeSet<TagPath> = BTreeSet::new();
    for tag in tags {
        let path = TagPath::parse(tag);
        if path.is_empty() {
            continue;
        }
        paths.extend(path.ancestors());
        paths.insert(path);
    }

    let mut ordered: Vec<TagPath> = paths.into_iter().collect();
    sort_hierarchically(&mut ordered);

    ordered
        .into_iter()
        .map(|path| {
            let name = path.to_string();
            TagSuggestion {
                count: counts.get(&name).copied().unwrap_or(0),
                depth: path.depth(),
                parent_path: path.parent().map(|p| p.to_string()),
                name,
            }
        })
        .collect()
}

/// Shallow tags first, alphabetical within a depth.
pub fn sort_hierarchically(paths: &mut [TagPath]) {
    paths.sort_by(|a, b| {
        a.depth()
            .cmp(&b.depth())
            .then_with(|| a.to_string().cmp(&b.to_string()))
    });
}

/// Suggestions whose path, or any segment of it, starts with `partial`.
pub fn filter_suggestions<'a>(
    suggestions: &'a [TagSuggestion],
    partial: &str,
) -> Vec<&'a TagSuggestion> {
    let partial = partial.trim().to_lowercase();
    if partial.is_empty() {
        return suggestions.iter().collect();
    }
    suggestions
        .iter()
        .filter(|s| {
            s.name.starts_with(&partial) || s.name.split('/').any(|seg| seg.starts_with(&partial))
        })
        .collect()
}

/// Whether a single tag satisfies `filter`.
///
/// A one-segment filter matches any tag containing that segment anywhere in
/// its path. A deeper filter must equal the tag or be a leading run of it.
pub fn tag_matches(tag: &TagPath, filter: &TagPath) -> bool {
    match filter.segments() {
        [] => false,
        [segment] => tag.contains_segment(segment),
        _ => filter.is_prefix_of(tag),
    }
}

pub fn entry_matches_tag(entry: &Entry, filter: &TagPath) -> bool {
    entry.tag_paths().any(|tag| tag_matches(&tag, filter))
}

/// Entries matching `filter`, in input order.
pub fn filter_by_tag<'a>(entries: &'a [Entry], filter: &TagPath) -> Vec<&'a Entry> {
    entries
        .iter()
        .filter(|e| entry_matches_tag(e, filter))
        .collect()
}
