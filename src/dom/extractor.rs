//! DOM Tag Extractor: named captures from matching elements' markup
//!
//! Each rule pairs a CSS selector with a pattern. Every element matching the
//! selector has the pattern run against its outer markup; named groups become
//! tags. Later rules and later elements overwrite earlier ones.
//!
//! # Passes
//! - **Scan**: one-shot over a whole subtree, once per context activation
//! - **Observe**: incremental, over the nodes touched by a mutation batch
//!
//! The observe pass runs inside a mutation callback, so it must not re-process
//! elements it already handled. Each (rule, element) pair carries a marker
//! holding the hash of the markup last processed and the tags it produced;
//! unchanged elements are skipped. When an element stops producing a tag it
//! used to (its markup changed, it no longer matches the selector, or it left
//! the document) the pass reports it so the caller can rebuild from a scan.

use regex::Regex;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use thiserror::Error;

use super::document::{Document, MutationRecord, NodeId};
use super::selector::{Selector, SelectorError};
use crate::context::definition::DomTagRule;
use crate::context::pattern::{compile, named_captures, PatternError};
use crate::tags::{overlay, Tags};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error(transparent)]
    Selector(#[from] SelectorError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// A DOM tag rule with its selector and pattern compiled
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: DomTagRule,
    selector: Selector,
    pattern: Regex,
}

impl CompiledRule {
    pub fn compile(rule: &DomTagRule) -> Result<Self, RuleError> {
        Ok(Self {
            rule: rule.clone(),
            selector: Selector::parse(&rule.css_selector)?,
            pattern: compile(&rule.regex)?,
        })
    }

    /// Captures of this rule for one element, if its markup matches
    fn capture(&self, doc: &Document, element: NodeId) -> Option<Tags> {
        named_captures(&self.pattern, &doc.outer_html(element))
    }
}

/// How a rebind changed the active rule set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDiff {
    pub added: Vec<DomTagRule>,
    pub removed: Vec<DomTagRule>,
    pub kept: usize,
    /// Rules that could not be compiled and were left unbound
    pub rejected: Vec<DomTagRule>,
}

impl RuleDiff {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Result of an incremental pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observed {
    /// Tags from the elements this batch (re)processed
    pub tags: Tags,
    /// Some element lost a tag it contributed earlier
    pub dropped: bool,
}

#[derive(Debug, Clone)]
struct Marker {
    hash: u64,
    captured: Option<Tags>,
}

impl Marker {
    /// Whether moving from this marker's captures to `next` loses a key
    fn loses_keys(&self, next: Option<&Tags>) -> bool {
        self.captured.as_ref().is_some_and(|before| {
            before
                .keys()
                .any(|key| !next.is_some_and(|next| next.contains_key(key)))
        })
    }
}

/// Node ids whose subtrees a mutation touched
pub fn affected_nodes(doc: &Document, record: &MutationRecord) -> Vec<NodeId> {
    match record {
        MutationRecord::ChildList { added, .. } => added.clone(),
        MutationRecord::Attributes { target, .. } => vec![*target],
        MutationRecord::CharacterData { target } => {
            doc.parent_element(*target).into_iter().collect()
        }
    }
}

// =============================================================================
// Pure extraction
// =============================================================================

/// Run every rule over `root` and the elements below it
pub fn extract(doc: &Document, root: NodeId, rules: &[CompiledRule]) -> Tags {
    let mut tags = Tags::new();
    for rule in rules {
        for element in rule.selector.select_inclusive(doc, root) {
            if let Some(found) = rule.capture(doc, element) {
                overlay(&mut tags, &found);
            }
        }
    }
    tags
}

/// Run every rule over the nodes touched by `records`
pub fn extract_mutations(doc: &Document, records: &[MutationRecord], rules: &[CompiledRule]) -> Tags {
    let mut tags = Tags::new();
    for record in records {
        for node in affected_nodes(doc, record) {
            overlay(&mut tags, &extract(doc, node, rules));
        }
    }
    tags
}

// =============================================================================
// DomTagExtractor
// =============================================================================

/// Extractor with a bound rule set and processed-element markers
#[derive(Debug, Default)]
pub struct DomTagExtractor {
    rules: Vec<CompiledRule>,
    /// (rule index, element) → markup last processed and its captures
    processed: HashMap<(usize, NodeId), Marker>,
}

impl DomTagExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> impl Iterator<Item = &DomTagRule> {
        self.rules.iter().map(|r| &r.rule)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_bound(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Replace the active rules with `rules`.
    ///
    /// Rules already bound are kept (their compiled form is reused), rules
    /// no longer listed are dropped, new rules are compiled. Rules that fail
    /// to compile are logged and left out. The bound order follows `rules`.
    pub fn bind(&mut self, rules: &[DomTagRule]) -> RuleDiff {
        let mut diff = RuleDiff::default();
        let mut previous: Vec<Option<CompiledRule>> = self.rules.drain(..).map(Some).collect();
        let mut next = Vec::with_capacity(rules.len());

        for rule in rules {
            if next.iter().any(|c: &CompiledRule| c.rule == *rule) {
                continue;
            }
            let reused = previous
                .iter_mut()
                .find(|slot| matches!(slot, Some(c) if c.rule == *rule))
                .and_then(Option::take);
            match reused {
                Some(compiled) => {
                    diff.kept += 1;
                    next.push(compiled);
                }
                None => match CompiledRule::compile(rule) {
                    Ok(compiled) => {
                        diff.added.push(rule.clone());
                        next.push(compiled);
                    }
                    Err(err) => {
                        log::warn!(
                            "DOM tag rule `{}` disabled: {err}",
                            rule.css_selector
                        );
                        diff.rejected.push(rule.clone());
                    }
                },
            }
        }

        diff.removed = previous.into_iter().flatten().map(|c| c.rule).collect();
        self.rules = next;
        // rule indices may have shifted
        self.processed.clear();
        diff
    }

    /// Drop all rules and markers
    pub fn unbind(&mut self) -> RuleDiff {
        self.bind(&[])
    }

    /// One-shot pass over `root`. Every matching element is processed and
    /// marked, whether or not it was seen before.
    pub fn scan(&mut self, doc: &Document, root: NodeId) -> Tags {
        self.process(doc, &[root], true).tags
    }

    /// Incremental pass over a mutation batch. Elements whose markup is
    /// unchanged since they were last processed are skipped.
    pub fn observe(&mut self, doc: &Document, records: &[MutationRecord]) -> Observed {
        if self.rules.is_empty() {
            return Observed::default();
        }

        let mut dropped = false;
        self.processed.retain(|(_, element), marker| {
            let attached = doc.is_connected(*element);
            if !attached {
                dropped |= marker.loses_keys(None);
            }
            attached
        });

        let mut roots: Vec<NodeId> = Vec::new();
        for record in records {
            for node in affected_nodes(doc, record) {
                if !roots.contains(&node) {
                    roots.push(node);
                }
            }
        }

        let mut observed = self.process(doc, &roots, false);
        observed.dropped |= dropped;
        observed
    }

    fn process(&mut self, doc: &Document, roots: &[NodeId], force: bool) -> Observed {
        let mut observed = Observed::default();

        for (index, rule) in self.rules.iter().enumerate() {
            for root in roots {
                let matched = rule.selector.select_inclusive(doc, *root);

                let matching: HashSet<NodeId> = matched.iter().copied().collect();
                for element in doc.elements_inclusive(*root) {
                    if matching.contains(&element) {
                        continue;
                    }
                    if let Some(marker) = self.processed.remove(&(index, element)) {
                        observed.dropped |= marker.loses_keys(None);
                    }
                }

                for element in matched {
                    let key = (index, element);
                    let markup = doc.outer_html(element);
                    let hash = hash_markup(&markup);
                    if !force && self.processed.get(&key).is_some_and(|m| m.hash == hash) {
                        continue;
                    }

                    let captured = named_captures(&rule.pattern, &markup);
                    if let Some(found) = &captured {
                        overlay(&mut observed.tags, found);
                    }
                    let marker = Marker {
                        hash,
                        captured: captured.clone(),
                    };
                    if let Some(previous) = self.processed.insert(key, marker) {
                        observed.dropped |= previous.loses_keys(captured.as_ref());
                    }
                }
            }
        }
        observed
    }

    /// Forget processed markers so the next observe re-processes everything
    pub fn clear_marks(&mut self) {
        self.processed.clear();
    }

    pub fn marked_count(&self) -> usize {
        self.processed.len()
    }
}

fn hash_markup(markup: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    markup.hash(&mut hasher);
    hasher.finish()
}

// =============================================================================
// Tests
// =============================================================================
