//! `{tag}` placeholder substitution
//!
//! Context routing metadata (redirect URLs, menu links) is authored as a
//! template such as `/cases/{urn}/{caseId}/review`. Rendering fills each
//! placeholder from the merged tags and reports the ones it could not fill.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use super::Tags;

/// A rendered template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rendered {
    pub output: String,
    /// Placeholder names with no matching tag, in order of appearance.
    /// These are left verbatim in `output`.
    pub missing: Vec<String>,
}

impl Rendered {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").unwrap())
}

/// Replace every `{name}` in `template` with `tags[name]`
pub fn render(template: &str, tags: &Tags) -> Rendered {
    let mut missing = Vec::new();
    let output = placeholder_re()
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            match tags.get(name) {
                Some(value) => value.clone(),
                None => {
                    if !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        })
        .into_owned();

    Rendered { output, missing }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::tags_from;

    #[test]
    fn test_render_fills_placeholders() {
        let tags = tags_from([("urn", "45AA0000000"), ("caseId", "321")]);
        let rendered = render("/cases/{urn}/{caseId}/review", &tags);
        assert_eq!(rendered.output, "/cases/45AA0000000/321/review");
        assert!(rendered.is_complete());
    }

    #[test]
    fn test_render_reports_missing() {
        let tags = tags_from([("caseId", "321")]);
        let rendered = render("/cases/{urn}/{caseId}?u={urn}", &tags);
        assert_eq!(rendered.output, "/cases/{urn}/321?u={urn}");
        assert_eq!(rendered.missing, vec!["urn".to_string()]);
    }

    #[test]
    fn test_render_without_placeholders() {
        let rendered = render("https://example.org/home", &Tags::new());
        assert_eq!(rendered.output, "https://example.org/home");
        assert!(rendered.is_complete());
    }

    #[test]
    fn test_render_empty_value() {
        let tags = tags_from([("suffix", "")]);
        assert_eq!(render("/a{suffix}", &tags).output, "/a");
    }
}
