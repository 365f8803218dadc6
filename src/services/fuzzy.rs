//! Fuzzy matching of a query against candidate text.
//!
//! Scoring, with query and candidate both lowercased:
//!
//! ```text
//! contiguous substring at char index i     40 - 1.5 × i
//! ordered subsequence                      20 - 0.02 × len(candidate) (+6 if first chars agree)
//! anything else                            rejected (None)
//! ```
//!
//! An entry is scored on its name, its url (−4) and its joined tags (−2),
//! keeping the best. Entries rejected on every field are excluded.

use regex::{Regex, RegexBuilder};

use crate::core::entry::Entry;

const SUBSTRING_BASE: f64 = 40.0;
const SUBSTRING_POSITION_PENALTY: f64 = 1.5;
const SUBSEQUENCE_BASE: f64 = 20.0;
const SUBSEQUENCE_LENGTH_PENALTY: f64 = 0.02;
const FIRST_CHAR_BONUS: f64 = 6.0;
const URL_PENALTY: f64 = 4.0;
const TAGS_PENALTY: f64 = 2.0;

/// A query prepared once and scored against many candidates.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    query: String,
    first_char: Option<char>,
    /// `q.*?u.*?e.*?r.*?y` with every query char escaped.
    subsequence: Option<Regex>,
}

impl FuzzyMatcher {
    pub fn new(query: &str) -> Self {
        let query = query.to_lowercase();
        let first_char = query.chars().next();

        let pattern = query
            .chars()
            .map(|c| regex::escape(c.encode_utf8(&mut [0u8; 4])))
            .collect::<Vec<_>>()
            .join(".*?");
        // Only fails if the compiled program is absurdly large; such a query
        // then matches by substring only.
        let subsequence = RegexBuilder::new(&pattern)
            .dot_matches_new_line(true)
            .build()
            .ok();

        Self {
            query,
            first_char,
            subsequence,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Score one candidate, `None` when it is rejected.
    pub fn score(&self, candidate: &str) -> Option<f64> {
        let candidate = candidate.to_lowercase();

        if let Some(byte_idx) = candidate.find(&self.query) {
            let char_idx = candidate[..byte_idx].chars().count();
            return Some(SUBSTRING_BASE - SUBSTRING_POSITION_PENALTY * char_idx as f64);
        }

        let is_subsequence = self
            .subsequence
            .as_ref()
            .is_some_and(|re| re.is_match(&candidate));
        if !is_subsequence {
            return None;
        }

        let len = candidate.chars().count() as f64;
        let bonus = match self.first_char {
            Some(c) if candidate.starts_with(c) => FIRST_CHAR_BONUS,
            _ => 0.0,
        };
        Some(SUBSEQUENCE_BASE - SUBSEQUENCE_LENGTH_PENALTY * len + bonus)
    }

    /// Best score across an entry's name, url and tags.
    pub fn score_entry(&self, entry: &Entry) -> Option<f64> {
        let name = self.score(&entry.name);
        let url = self.score(&entry.url).map(|s| s - URL_PENALTY);
        let tags = if entry.tags.is_empty() {
            None
        } else {
            self.score(&entry.joined_tags()).map(|s| s - TAGS_PENALTY)
        };

        [name, url, tags].into_iter().flatten().reduce(f64::max)
    }
}

/// One-shot convenience for scoring a single pair.
pub fn fuzzy_score(query: &str, candidate: &str) -> Option<f64> {
    FuzzyMatcher::new(query).score(candidate)
}
