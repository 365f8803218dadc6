//! Splitting raw input into a tag filter and free text.

use crate::core::entry::TagPath;

/// A query after tag-marker extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub tag_filter: Option<TagPath>,
    pub text: String,
}

impl ParsedQuery {
    /// Parse `raw`. `"#dev/tools gh"` with marker `#` yields the filter
    /// `dev/tools` and the text `gh`.
    pub fn parse(raw: &str, tag_marker: char) -> Self {
        let trimmed = raw.trim();

        let Some(rest) = trimmed.strip_prefix(tag_marker) else {
            return Self {
                tag_filter: None,
                text: trimmed.to_string(),
            };
        };

        let (token, remainder) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };

        let filter = TagPath::parse(token);
        Self {
            tag_filter: (!filter.is_empty()).then_some(filter),
            text: remainder.trim().to_string(),
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_query() {
        let parsed = ParsedQuery::parse("  git hub ", '#');
        assert_eq!(parsed.tag_filter, None);
        assert_eq!(parsed.text, "git hub");
    }

    #[test]
    fn test_tag_filter_with_text() {
        let parsed = ParsedQuery::parse("#Dev/Tools   cargo  doc", '#');
        assert_eq!(parsed.tag_filter, Some(TagPath::parse("dev/tools")));
        assert_eq!(parsed.text, "cargo  doc");
    }

    #[test]
    fn test_tag_filter_only() {
        let parsed = ParsedQuery::parse("#reading", '#');
        assert_eq!(parsed.tag_filter, Some(TagPath::parse("reading")));
        assert!(!parsed.has_text());
    }

    #[test]
    fn test_bare_marker_is_no_filter() {
        let parsed = ParsedQuery::parse("# mail", '#');
        assert_eq!(parsed.tag_filter, None);
        assert_eq!(parsed.text, "mail");
    }

    #[test]
    fn test_custom_marker() {
        let parsed = ParsedQuery::parse("@work notes", '@');
        assert_eq!(parsed.tag_filter, Some(TagPath::parse("work")));
        assert_eq!(parsed.text, "notes");
        assert_eq!(ParsedQuery::parse("#work", '@').text, "#work");
    }
}
