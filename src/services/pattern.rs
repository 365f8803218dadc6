//! Compilation of user-supplied host and tag patterns.
//!
//! Patterns come from settings forms, so they are bounded in length and
//! screened for shapes known to blow up backtracking engines before being
//! compiled with a capped program size. Anything rejected becomes a pattern
//! that matches nothing.
//!
//! Plain patterns are globs (`*.example.com`); a `re:` prefix takes the rest
//! as a regular expression. Both are anchored and case-insensitive.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Longest pattern accepted, in bytes.
pub const MAX_PATTERN_LEN: usize = 256;

const COMPILED_SIZE_LIMIT: usize = 1 << 16;

const REGEX_PREFIX: &str = "re:";

static DENYLIST: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // quantified group that itself contains a quantifier: (a+)+, (.*)*
        r"\([^)]*[+*}][^)]*\)\s*[+*{]",
        // quantified alternation: (a|aa)+
        r"\([^)]*\|[^)]*\)\s*[+*{]",
        // back references
        r"\\[1-9]",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Why a pattern was turned into a never-matching one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternRejection {
    Empty,
    TooLong,
    Backtracking,
    Invalid,
}

#[derive(Debug, Clone)]
pub struct SafePattern {
    source: String,
    regex: Option<Regex>,
    rejection: Option<PatternRejection>,
}

impl SafePattern {
    pub fn compile(pattern: &str) -> Self {
        match compile_checked(pattern) {
            Ok(regex) => Self {
                source: pattern.to_string(),
                regex: Some(regex),
                rejection: None,
            },
            Err(rejection) => {
                warn!(pattern, ?rejection, "rejected user pattern");
                Self {
                    source: pattern.to_string(),
                    regex: None,
                    rejection: Some(rejection),
                }
            }
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn rejection(&self) -> Option<PatternRejection> {
        self.rejection
    }
}

fn compile_checked(pattern: &str) -> Result<Regex, PatternRejection> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(PatternRejection::Empty);
    }
    if pattern.len() > MAX_PATTERN_LEN {
        return Err(PatternRejection::TooLong);
    }

    let body = match pattern.strip_prefix(REGEX_PREFIX) {
        Some(raw) => {
            if DENYLIST.iter().any(|deny| deny.is_match(raw)) {
                return Err(PatternRejection::Backtracking);
            }
            raw.to_string()
        }
        None => glob_to_regex(pattern),
    };

    RegexBuilder::new(&format!("^(?:{body})$"))
        .case_insensitive(true)
        .size_limit(COMPILED_SIZE_LIMIT)
        .build()
        .map_err(|_| PatternRejection::Invalid)
}

/// `*` matches any run of characters, `?` a single one, all else literal.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut literal = [0u8; 4];
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut literal))),
        }
    }
    out
}

/// A set of patterns where any match counts.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<SafePattern>,
}

impl PatternSet {
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .map(|p| SafePattern::compile(p.as_ref()))
                .collect(),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_matching() {
        let pattern = SafePattern::compile("*.example.com");
        assert!(pattern.is_match("ads.example.com"));
        assert!(pattern.is_match("a.b.Example.com"));
        assert!(!pattern.is_match("example.com"));
        assert!(!pattern.is_match("example.com.evil.test"));

        let exact = SafePattern::compile("example.com");
        assert!(exact.is_match("example.com"));
        assert!(!exact.is_match("examplexcom"));
    }

    #[test]
    fn test_regex_prefix() {
        let pattern = SafePattern::compile(r"re:(www\.)?docs\.rs");
        assert!(pattern.is_match("docs.rs"));
        assert!(pattern.is_match("www.docs.rs"));
        assert!(!pattern.is_match("mydocs.rs"));
    }

    #[test]
    fn test_rejects_backtracking_shapes() {
        for bad in ["re:(a+)+", "re:(.*)*b", "re:(a|aa)+", r"re:(a)\1", "re:(x{2,})*"] {
            let pattern = SafePattern::compile(bad);
            assert_eq!(
                pattern.rejection(),
                Some(PatternRejection::Backtracking),
                "{bad}"
            );
            assert!(!pattern.is_match("aaaa"));
        }
    }

    #[test]
    fn test_rejects_long_empty_and_invalid() {
        let long = "a".repeat(MAX_PATTERN_LEN + 1);
        assert_eq!(
            SafePattern::compile(&long).rejection(),
            Some(PatternRejection::TooLong)
        );
        assert_eq!(
            SafePattern::compile("  ").rejection(),
            Some(PatternRejection::Empty)
        );
        let invalid = SafePattern::compile("re:[unclosed");
        assert_eq!(invalid.rejection(), Some(PatternRejection::Invalid));
        assert!(!invalid.is_match("[unclosed"));
    }

    #[test]
    fn test_pattern_set() {
        let set = PatternSet::compile(&["*.ads.test", "re:(a+)+", "tracker.test"]);
        assert!(set.is_match("x.ads.test"));
        assert!(set.is_match("tracker.test"));
        assert!(!set.is_match("aaaa"));
        assert!(PatternSet::default().is_empty());
    }
}
