//! Tag Merger: one flat tag map from four prioritized sources
//!
//! Tags arrive from the matched address, the live DOM, fetched case details
//! and the hosting application. The same key may come from several of them,
//! so the merged view is an overlay in fixed precedence:
//!
//! `PathTags` < `DomTags` < `CaseDetailsTags` < `PropTags`
//!
//! The merge is pure; the store re-runs it whenever a source slot is written.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Types
// =============================================================================

/// Flat tag mapping. Ordered so serialized output is deterministic.
pub type Tags = BTreeMap<String, String>;

/// Where a group of tags came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagSource {
    /// Named captures of the matched address pattern
    PathTags,
    /// Named captures found in the observed DOM
    DomTags,
    /// Derived from a fetched case-details record
    CaseDetailsTags,
    /// Supplied by the hosting application
    PropTags,
}

impl TagSource {
    /// All sources, lowest precedence first
    pub const PRECEDENCE: [TagSource; 4] = [
        TagSource::PathTags,
        TagSource::DomTags,
        TagSource::CaseDetailsTags,
        TagSource::PropTags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagSource::PathTags => "pathTags",
            TagSource::DomTags => "domTags",
            TagSource::CaseDetailsTags => "caseDetailsTags",
            TagSource::PropTags => "propTags",
        }
    }

    /// True for sources that belong to the current context and are cleared
    /// on navigation.
    pub fn is_context_scoped(&self) -> bool {
        matches!(self, TagSource::PathTags | TagSource::DomTags)
    }
}

// =============================================================================
// Merge
// =============================================================================

/// Overlay `top` onto `base`. Keys missing from `top` are left alone.
pub fn overlay(base: &mut Tags, top: &Tags) {
    for (key, value) in top {
        base.insert(key.clone(), value.clone());
    }
}

/// Merge the four sources in precedence order.
///
/// `source` returns the current tags of a source, or `None` when that source
/// has not produced anything yet. Absent sources count as empty. Empty string
/// values are real values and do overwrite.
pub fn merge<'a, F>(source: F) -> Tags
where
    F: Fn(TagSource) -> Option<&'a Tags>,
{
    let mut merged = Tags::new();
    for kind in TagSource::PRECEDENCE {
        if let Some(tags) = source(kind) {
            overlay(&mut merged, tags);
        }
    }
    merged
}

/// Build a `Tags` map from string pairs
pub fn tags_from<K, V, I>(pairs: I) -> Tags
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
