//! CSS selector subset for DOM tag rules
//!
//! Supported:
//! - type (`a`), universal (`*`), id (`#main`), class (`.case-link`)
//! - attributes: `[href]`, `=`, `~=`, `|=`, `^=`, `$=`, `*=`, optional ` i` flag
//! - compound selectors (`a.link[href^='/cases']`)
//! - descendant (`nav a`) and child (`nav > a`) combinators
//! - selector lists (`a, button`)
//!
//! Pseudo-classes, pseudo-elements and sibling combinators are rejected with
//! `SelectorError::Unsupported`, so a rule using them degrades to "never
//! matches" instead of matching the wrong thing.

use thiserror::Error;

use super::document::{Document, NodeId};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unsupported selector syntax `{found}` in `{selector}`")]
    Unsupported { selector: String, found: String },
    #[error("malformed selector `{selector}` at byte {position}")]
    Malformed { selector: String, position: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
    value: String,
    case_insensitive: bool,
}

impl AttrSelector {
    fn matches(&self, actual: &str) -> bool {
        let (actual, expected) = if self.case_insensitive {
            (actual.to_lowercase(), self.value.to_lowercase())
        } else {
            (actual.to_string(), self.value.clone())
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => {
                !expected.is_empty() && actual.split_whitespace().any(|w| w == expected)
            }
            AttrOp::DashMatch => {
                actual == expected || actual.starts_with(&format!("{expected}-"))
            }
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(&expected),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if expected != "*" && !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = doc.attribute(node, "class").unwrap_or("");
            let has_all = self
                .classes
                .iter()
                .all(|c| class_attr.split_whitespace().any(|have| have == c));
            if !has_all {
                return false;
            }
        }
        self.attrs.iter().all(|a| match doc.attribute(node, &a.name) {
            Some(actual) => a.matches(actual),
            None => false,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// One selector of a list: compounds joined by combinators, left to right.
/// `parts[i].0` is the combinator linking `parts[i - 1]` to `parts[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.parts.len() - 1)
    }

    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => doc
                .parent_element(node)
                .map(|p| self.matches_at(doc, p, index - 1))
                .unwrap_or(false),
            Combinator::Descendant => {
                let mut ancestor = doc.parent_element(node);
                while let Some(a) = ancestor {
                    if self.matches_at(doc, a, index - 1) {
                        return true;
                    }
                    ancestor = doc.parent_element(a);
                }
                false
            }
        }
    }
}

/// A parsed, comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

// =============================================================================
// Matching
// =============================================================================

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let alternatives = Parser::new(source).parse_list()?;
        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether element `node` matches. Ancestors anywhere in the document
    /// count for combinators, as with `Element.matches`.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.alternatives.iter().any(|c| c.matches(doc, node))
    }

    /// `root` (if it matches) and every matching element below it,
    /// in document order
    pub fn select_inclusive(&self, doc: &Document, root: NodeId) -> Vec<NodeId> {
        doc.elements_inclusive(root)
            .into_iter()
            .filter(|id| self.matches(doc, *id))
            .collect()
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    fn malformed(&self) -> SelectorError {
        SelectorError::Malformed {
            selector: self.source.to_string(),
            position: self.pos,
        }
    }

    fn unsupported(&self, found: &str) -> SelectorError {
        SelectorError::Unsupported {
            selector: self.source.to_string(),
            found: found.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>, SelectorError> {
        if self.source.trim().is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut list = Vec::new();
        loop {
            list.push(self.parse_complex()?);
            match self.peek() {
                Some(b',') => self.pos += 1,
                None => return Ok(list),
                Some(_) => return Err(self.malformed()),
            }
        }
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_whitespace();
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;

        loop {
            let compound = self.parse_compound()?;
            if compound.is_empty() {
                return Err(self.malformed());
            }
            parts.push((combinator, compound));

            let had_space = self.skip_whitespace();
            match self.peek() {
                None | Some(b',') => return Ok(Complex { parts }),
                Some(b'>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinator = Combinator::Child;
                }
                Some(b'+') => return Err(self.unsupported("+")),
                Some(b'~') => return Err(self.unsupported("~")),
                Some(_) if had_space => combinator = Combinator::Descendant,
                Some(_) => return Err(self.malformed()),
            }
        }
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();

        if self.peek() == Some(b'*') {
            self.pos += 1;
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_start) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some(b'#') => {
                    self.pos += 1;
                    compound.id = Some(self.parse_ident()?);
                }
                Some(b'.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some(b'[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(b':') => return Err(self.unsupported(&self.source[self.pos..])),
                _ => return Ok(compound),
            }
        }
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| is_ident_start(b) || b.is_ascii_digit() || b == b'-')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.malformed());
        }
        Ok(self.source[start..self.pos].to_string())
    }

    fn parse_attr(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let op = match self.peek() {
            Some(b']') => {
                self.pos += 1;
                return Ok(AttrSelector {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                    case_insensitive: false,
                });
            }
            Some(b'=') => {
                self.pos += 1;
                AttrOp::Equals
            }
            Some(prefix) => {
                let op = match prefix {
                    b'~' => AttrOp::Includes,
                    b'|' => AttrOp::DashMatch,
                    b'^' => AttrOp::Prefix,
                    b'$' => AttrOp::Suffix,
                    b'*' => AttrOp::Substring,
                    _ => return Err(self.malformed()),
                };
                self.pos += 1;
                if self.peek() != Some(b'=') {
                    return Err(self.malformed());
                }
                self.pos += 1;
                op
            }
            None => return Err(self.malformed()),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|b| b != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(self.malformed());
                }
                let value = self.source[start..self.pos].to_string();
                self.pos += 1;
                value
            }
            _ => self.parse_ident()?,
        };

        self.skip_whitespace();
        let mut case_insensitive = false;
        if matches!(self.peek(), Some(b'i' | b'I')) {
            self.pos += 1;
            case_insensitive = true;
            self.skip_whitespace();
        } else if matches!(self.peek(), Some(b's' | b'S')) {
            self.pos += 1;
            self.skip_whitespace();
        }

        if self.peek() != Some(b']') {
            return Err(self.malformed());
        }
        self.pos += 1;

        Ok(AttrSelector {
            name,
            op,
            value,
            case_insensitive,
        })
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'-' || b >= 0x80
}

// =============================================================================
// Tests
// =============================================================================
