//! Context definitions and match results
//!
//! A context definition says "pages whose address matches one of these
//! patterns belong to context X". Definitions come from configuration, in
//! authored order, and never change afterwards.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::tags::Tags;

// =============================================================================
// Definition Types
// =============================================================================

/// Rule for pulling tags out of the live DOM
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomTagRule {
    pub css_selector: String,
    /// Pattern run against the outer markup of every matching element
    #[serde(alias = "pattern")]
    pub regex: String,
}

impl DomTagRule {
    pub fn new(css_selector: impl Into<String>, regex: impl Into<String>) -> Self {
        Self {
            css_selector: css_selector.into(),
            regex: regex.into(),
        }
    }
}

/// Authorisation a context requires from the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorisation {
    /// Directory group the user must belong to
    pub ad_group: String,
}

/// One entry of the ordered context list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDefinition {
    /// Address patterns. Accepts `path: "..."` or `paths: [...]`.
    #[serde(alias = "path", deserialize_with = "one_or_many")]
    pub paths: Vec<String>,
    /// Context id, or several ids separated by spaces
    pub contexts: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dom_tags: Vec<DomTagRule>,
    /// Redirect URL template, `{tag}` placeholders allowed
    #[serde(default, alias = "msalRedirectUrl", skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorisation: Option<Authorisation>,
    /// Forces the menu on or off for this context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_menu: Option<bool>,
}

impl ContextDefinition {
    pub fn new(path: impl Into<String>, contexts: impl Into<String>) -> Self {
        Self {
            paths: vec![path.into()],
            contexts: contexts.into(),
            dom_tags: Vec::new(),
            redirect_url: None,
            authorisation: None,
            show_menu: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn with_dom_tags(mut self, rules: Vec<DomTagRule>) -> Self {
        self.dom_tags = rules;
        self
    }

    pub fn with_redirect_url(mut self, template: impl Into<String>) -> Self {
        self.redirect_url = Some(template.into());
        self
    }

    pub fn with_authorisation(mut self, ad_group: impl Into<String>) -> Self {
        self.authorisation = Some(Authorisation {
            ad_group: ad_group.into(),
        });
        self
    }

    /// Individual context ids
    pub fn context_ids(&self) -> impl Iterator<Item = &str> {
        self.contexts.split_whitespace()
    }

    pub fn has_context(&self, id: &str) -> bool {
        self.context_ids().any(|c| c == id)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(path) => vec![path],
        OneOrMany::Many(paths) => paths,
    })
}

// =============================================================================
// Match Results
// =============================================================================

/// A definition that matched the current address
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedContext {
    #[serde(flatten)]
    pub definition: ContextDefinition,
    /// Named captures of the matching pattern
    #[serde(rename = "tags")]
    pub path_tags: Tags,
    /// 0-based position of `definition` in the configured list
    pub context_index: usize,
    /// The pattern that matched
    pub matched_path: String,
}

/// Outcome of context resolution
#[derive(Debug, Clone, PartialEq)]
pub enum FoundContext {
    Found(MatchedContext),
    NotFound,
}

impl FoundContext {
    pub fn is_found(&self) -> bool {
        matches!(self, FoundContext::Found(_))
    }

    pub fn matched(&self) -> Option<&MatchedContext> {
        match self {
            FoundContext::Found(m) => Some(m),
            FoundContext::NotFound => None,
        }
    }

    pub fn context_index(&self) -> Option<usize> {
        self.matched().map(|m| m.context_index)
    }

    /// DOM tag rules that apply while this context is active
    pub fn dom_tag_rules(&self) -> &[DomTagRule] {
        self.matched()
            .map(|m| m.definition.dom_tags.as_slice())
            .unwrap_or(&[])
    }

    pub fn path_tags(&self) -> Tags {
        self.matched().map(|m| m.path_tags.clone()).unwrap_or_default()
    }
}

impl Serialize for FoundContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            found: bool,
            #[serde(flatten)]
            matched: Option<&'a MatchedContext>,
        }

        Wire {
            found: self.is_found(),
            matched: self.matched(),
        }
        .serialize(serializer)
    }
}
