//! Pattern compilation
//!
//! Address patterns and DOM tag patterns are regular expressions whose named
//! groups become tags. Every pattern in the crate is compiled here, always
//! case-insensitive, so swapping the pattern language only touches this file.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::tags::Tags;

/// A pattern that failed to compile
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid pattern `{pattern}`: {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

/// Compile `pattern` as a case-insensitive regular expression
pub fn compile(pattern: &str) -> Result<Regex, PatternError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| PatternError {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// Run `re` once against `haystack`.
///
/// Returns `None` when there is no match, otherwise the named groups that
/// took part in the match. Groups that did not participate are left out.
pub fn named_captures(re: &Regex, haystack: &str) -> Option<Tags> {
    let caps = re.captures(haystack)?;
    let tags = re
        .capture_names()
        .flatten()
        .filter_map(|name| {
            caps.name(name)
                .map(|m| (name.to_string(), m.as_str().to_string()))
        })
        .collect();
    Some(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::tags_from;

    #[test]
    fn test_compile_is_case_insensitive() {
        let re = compile("/CASES/(?<caseId>\\d+)").unwrap();
        assert!(re.is_match("/cases/12"));
    }

    #[test]
    fn test_compile_error() {
        let err = compile("/cases/(?<caseId>\\d+").unwrap_err();
        assert_eq!(err.pattern, "/cases/(?<caseId>\\d+");
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_named_captures() {
        let re = compile("/case-details/(?<urn>[^/]+)/(?<caseId>\\d+)").unwrap();
        let tags = named_captures(&re, "<a href=\"/case-details/foo/123\">").unwrap();
        assert_eq!(tags, tags_from([("urn", "foo"), ("caseId", "123")]));
    }

    #[test]
    fn test_non_participating_group_omitted() {
        let re = compile("/cases/(?<caseId>\\d+)(?:/docs/(?<docId>\\d+))?").unwrap();
        let tags = named_captures(&re, "/cases/9").unwrap();
        assert_eq!(tags, tags_from([("caseId", "9")]));
    }

    #[test]
    fn test_no_match() {
        let re = compile("^/home$").unwrap();
        assert_eq!(named_captures(&re, "/cases/1"), None);
    }

    #[test]
    fn test_match_without_groups() {
        let re = compile(".*").unwrap();
        assert_eq!(named_captures(&re, "/x"), Some(Tags::new()));
    }
}
