//! Ranking engine - turns a raw query into an ordered candidate list.
//!
//! Per keystroke:
//!
//! 1. Split off a leading tag filter (`#dev/tools rest`).
//! 2. Narrow the snapshot to entries matching the filter and not on a hidden
//!    host.
//! 3. Score each survivor. With no free text every entry gets a small base
//!    score; otherwise the fuzzy score, and rejected entries drop out.
//! 4. Add the usage boost, `min(cap, ln(count + 1) × scale)`.
//! 5. Stable sort by descending score, so equal scores keep input order.

use crate::config::RankingConfig;
use crate::core::entry::{Entry, UsageMap};
use crate::core::query::ParsedQuery;
use crate::services::fuzzy::FuzzyMatcher;
use crate::services::pattern::PatternSet;
use crate::services::tags;

/// A ranked entry and the score that placed it.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<'a> {
    pub entry: &'a Entry,
    pub score: f64,
}

/// The engine that ranks entry snapshots against queries.
pub struct SearchEngine {
    config: RankingConfig,
    hidden_hosts: PatternSet,
}

impl SearchEngine {
    /// Create a search engine with default ranking settings.
    pub fn new() -> Self {
        Self::with_config(&RankingConfig::default())
    }

    pub fn with_config(config: &RankingConfig) -> Self {
        Self {
            hidden_hosts: PatternSet::compile(&config.hidden_hosts),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn parse_query(&self, query: &str) -> ParsedQuery {
        ParsedQuery::parse(query, self.config.tag_marker)
    }

    /// Logarithmic, capped bonus for historical use.
    pub fn usage_boost(&self, count: u64) -> f64 {
        ((count as f64 + 1.0).ln() * self.config.usage_boost_scale).min(self.config.usage_boost_cap)
    }

    fn is_hidden(&self, entry: &Entry) -> bool {
        if self.hidden_hosts.is_empty() {
            return false;
        }
        entry
            .host()
            .is_some_and(|host| self.hidden_hosts.is_match(&host))
    }

    /// Rank `entries` for `query`, best first.
    pub fn rank<'a>(
        &self,
        query: &str,
        entries: &'a [Entry],
        usage: &UsageMap,
    ) -> Vec<SearchResult<'a>> {
        let parsed = self.parse_query(query);

        let candidates = entries.iter().filter(|entry| {
            let in_filter = parsed
                .tag_filter
                .as_ref()
                .map_or(true, |filter| tags::entry_matches_tag(entry, filter));
            in_filter && !self.is_hidden(entry)
        });

        let boost = |entry: &Entry| self.usage_boost(usage.get(&entry.id).copied().unwrap_or(0));

        let mut results: Vec<SearchResult<'a>> = if parsed.has_text() {
            let matcher = FuzzyMatcher::new(&parsed.text);
            candidates
                .filter_map(|entry| {
                    let score = matcher.score_entry(entry)?;
                    Some(SearchResult {
                        entry,
                        score: score + boost(entry),
                    })
                })
                .collect()
        } else {
            candidates
                .map(|entry| SearchResult {
                    entry,
                    score: self.config.empty_query_score + boost(entry),
                })
                .collect()
        };

        // `sort_by` is stable: ties keep snapshot order.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        if let Some(max) = self.config.max_results {
            results.truncate(max);
        }
        results
    }

    /// Ranked entries, cloned out of the snapshot.
    pub fn rank_entries(&self, query: &str, entries: &[Entry], usage: &UsageMap) -> Vec<Entry> {
        self.rank(query, entries, usage)
            .into_iter()
            .map(|r| r.entry.clone())
            .collect()
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}
