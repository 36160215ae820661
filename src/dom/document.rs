//! Document: arena DOM with mutation records
//!
//! A small model of the host page DOM: elements, text and comments stored in
//! an arena and addressed by `NodeId`. Removed nodes give their slot back to
//! the arena; a reused slot gets a new generation, so a stale `NodeId` never
//! aliases a live node and ids work as element identity for the extractor's
//! processed markers.
//!
//! Every mutation made through the public API is queued as a
//! `MutationRecord`, the same contract a browser `MutationObserver` offers:
//! - `append_html` → `ChildList` with the inserted nodes
//! - `set_attribute` / `remove_attribute` → `Attributes`
//! - `set_text` on a text node → `CharacterData`
//! - `sync_outer_html` → the records of whatever it had to change
//!
//! Serialization follows `outerHTML`: attribute values escape `&` and `"`,
//! text escapes `&`, `<` and `>`, raw-text elements are written verbatim.

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    generation: u32,
}

/// A change observed in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children of `target` were inserted or removed; `added` lists the
    /// inserted ones
    ChildList { target: NodeId, added: Vec<NodeId> },
    /// Attribute `name` of `target` was set or removed
    Attributes { target: NodeId, name: String },
    /// Text node `target` changed its data
    CharacterData { target: NodeId },
}

/// Elements without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose content is not parsed as markup
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

// =============================================================================
// Document
// =============================================================================

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    /// Slots of removed nodes, ready for reuse
    free: Vec<usize>,
    records: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
                generation: 0,
            }],
            free: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Parse `html` into a fresh document. Parsing does not queue records.
    pub fn parse(html: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        doc.parse_into(root, html);
        doc
    }

    pub fn root(&self) -> NodeId {
        NodeId {
            index: 0,
            generation: 0,
        }
    }

    /// Number of live nodes, the root included
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Arena slots in use or free
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.index)
            .filter(|n| n.generation == id.generation)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.index)
            .filter(|n| n.generation == id.generation)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element { .. }))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// Nearest ancestor that is an element
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        if self.is_element(parent) {
            Some(parent)
        } else {
            None
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Element children of `id`, skipping text and comments
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
    }

    /// Follow element-child indices down from the root. `[0, 2]` is the
    /// third element child of the first top-level element.
    pub fn element_at_path(&self, path: &[usize]) -> Option<NodeId> {
        path.iter().try_fold(self.root(), |node, index| {
            self.element_children(node).nth(*index)
        })
    }

    /// Whether `id` is live and attached under the root
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// `id` and every element below it, in document order
    pub fn elements_inclusive(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.is_element(current) {
                out.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Comment(_)) | None => {}
            Some(_) => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    /// Serialized markup of the node itself plus its descendants
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_node(id, &mut out, false);
        out
    }

    /// Serialized markup of the node's descendants
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.is_raw_text(id);
        for child in self.children(id) {
            self.serialize_node(*child, &mut out, raw);
        }
        out
    }

    fn is_raw_text(&self, id: NodeId) -> bool {
        self.tag_name(id)
            .map(|t| RAW_TEXT_ELEMENTS.contains(&t))
            .unwrap_or(false)
    }

    fn serialize_node(&self, id: NodeId, out: &mut String, raw: bool) {
        let Some(kind) = self.kind(id) else {
            return;
        };
        match kind {
            NodeKind::Document => {
                for child in self.children(id) {
                    self.serialize_node(*child, out, false);
                }
            }
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_attr(value, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                let child_raw = RAW_TEXT_ELEMENTS.contains(&tag.as_str());
                for child in self.children(id) {
                    self.serialize_node(*child, out, child_raw);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeKind::Text(text) => {
                if raw {
                    out.push_str(text);
                } else {
                    escape_text(text, out);
                }
            }
            NodeKind::Comment(content) => {
                out.push_str("<!--");
                out.push_str(content);
                out.push_str("-->");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Parse `html` and append the result to `parent`
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        if self.node(parent).is_none() {
            return Vec::new();
        }
        let added = self.parse_into(parent, html);
        if !added.is_empty() {
            self.records.push(MutationRecord::ChildList {
                target: parent,
                added: added.clone(),
            });
        }
        added
    }

    /// Set an attribute. Returns false if `id` is not an element.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        let Some(Node {
            kind: NodeKind::Element { attrs, .. },
            ..
        }) = self.node_mut(id)
        else {
            return false;
        };
        let name = name.to_ascii_lowercase();
        match attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attrs.push((name.clone(), value.to_string())),
        }
        self.records
            .push(MutationRecord::Attributes { target: id, name });
        true
    }

    /// Remove an attribute. Returns false if nothing was removed.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        let Some(Node {
            kind: NodeKind::Element { attrs, .. },
            ..
        }) = self.node_mut(id)
        else {
            return false;
        };
        let before = attrs.len();
        attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        if attrs.len() == before {
            return false;
        }
        self.records.push(MutationRecord::Attributes {
            target: id,
            name: name.to_ascii_lowercase(),
        });
        true
    }

    /// Change text. A text node gets new data; an element has its children
    /// replaced by a single text node (the `textContent` setter).
    pub fn set_text(&mut self, id: NodeId, text: &str) -> bool {
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Text(data)) => {
                *data = text.to_string();
                self.records
                    .push(MutationRecord::CharacterData { target: id });
                true
            }
            Some(NodeKind::Element { .. }) => {
                self.detach_children(id);
                let child = self.push_node(NodeKind::Text(text.to_string()), Some(id));
                self.records.push(MutationRecord::ChildList {
                    target: id,
                    added: vec![child],
                });
                true
            }
            _ => false,
        }
    }

    /// Remove every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        if self.children(id).is_empty() {
            return;
        }
        self.detach_children(id);
        self.records.push(MutationRecord::ChildList {
            target: id,
            added: Vec::new(),
        });
    }

    fn detach_children(&mut self, id: NodeId) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let children = std::mem::take(&mut node.children);
        for child in children {
            self.release(child);
        }
    }

    /// Return `id` and its subtree to the arena. The caller unlinks it from
    /// its parent.
    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node_mut(current) else {
                continue;
            };
            stack.append(&mut node.children);
            node.generation = node.generation.wrapping_add(1);
            node.parent = None;
            node.kind = NodeKind::Comment(String::new());
            self.free.push(current.index);
        }
    }

    /// Drain queued mutation records (`MutationObserver.takeRecords`)
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    fn push_node(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = self.alloc(kind, parent);
        if let Some(parent) = parent {
            if let Some(node) = self.node_mut(parent) {
                node.children.push(id);
            }
        }
        id
    }

    /// New node pointing at `parent` but not yet in its child list
    fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        if let Some(index) = self.free.pop() {
            let node = &mut self.nodes[index];
            node.kind = kind;
            node.parent = parent;
            return NodeId {
                index,
                generation: node.generation,
            };
        }
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
            generation: 0,
        });
        NodeId {
            index: self.nodes.len() - 1,
            generation: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Sync
    // -------------------------------------------------------------------------

    /// Bring element `target` in line with `html`, its new outer markup.
    ///
    /// Nodes that survive keep their ids. Only real differences are applied,
    /// each queuing the record the matching DOM call would. A different tag
    /// replaces `target` in its parent. Returns false if `target` is not an
    /// element or `html` holds no element.
    pub fn sync_outer_html(&mut self, target: NodeId, html: &str) -> bool {
        let source = Document::parse(html);
        let Some(src) = source.element_children(source.root()).next() else {
            return false;
        };
        if !self.is_element(target) {
            return false;
        }

        if self.tag_name(target) == source.tag_name(src) {
            self.sync_element(target, &source, src);
            return true;
        }

        let Some(parent) = self.parent(target) else {
            return false;
        };
        let fresh = self.import(&source, src, parent);
        if let Some(node) = self.node_mut(parent) {
            for child in node.children.iter_mut() {
                if *child == target {
                    *child = fresh;
                }
            }
        }
        self.release(target);
        self.records.push(MutationRecord::ChildList {
            target: parent,
            added: vec![fresh],
        });
        true
    }

    fn sync_element(&mut self, target: NodeId, source: &Document, src: NodeId) {
        let wanted: Vec<(String, String)> = match source.kind(src) {
            Some(NodeKind::Element { attrs, .. }) => attrs.clone(),
            _ => Vec::new(),
        };
        let present: Vec<String> = match self.kind(target) {
            Some(NodeKind::Element { attrs, .. }) => attrs.iter().map(|(k, _)| k.clone()).collect(),
            _ => Vec::new(),
        };
        for name in present {
            if !wanted.iter().any(|(k, _)| *k == name) {
                self.remove_attribute(target, &name);
            }
        }
        for (name, value) in &wanted {
            if self.attribute(target, name) != Some(value.as_str()) {
                self.set_attribute(target, name, value);
            }
        }

        let old = self.children(target).to_vec();
        let new = source.children(src).to_vec();
        let mut added = Vec::new();
        let mut changed = false;

        for (position, src_child) in new.iter().enumerate() {
            match old.get(position) {
                Some(child) if self.same_shape(*child, source, *src_child) => {
                    self.sync_node(*child, source, *src_child);
                }
                Some(child) => {
                    let fresh = self.import(source, *src_child, target);
                    if let Some(node) = self.node_mut(target) {
                        node.children[position] = fresh;
                    }
                    self.release(*child);
                    added.push(fresh);
                }
                None => {
                    let fresh = self.import(source, *src_child, target);
                    if let Some(node) = self.node_mut(target) {
                        node.children.push(fresh);
                    }
                    added.push(fresh);
                }
            }
        }
        if old.len() > new.len() {
            if let Some(node) = self.node_mut(target) {
                node.children.truncate(new.len());
            }
            for child in &old[new.len()..] {
                self.release(*child);
            }
            changed = true;
        }

        if changed || !added.is_empty() {
            self.records.push(MutationRecord::ChildList { target, added });
        }
    }

    fn same_shape(&self, id: NodeId, source: &Document, src: NodeId) -> bool {
        match (self.kind(id), source.kind(src)) {
            (Some(NodeKind::Element { tag: a, .. }), Some(NodeKind::Element { tag: b, .. })) => a == b,
            (Some(NodeKind::Text(_)), Some(NodeKind::Text(_))) => true,
            (Some(NodeKind::Comment(_)), Some(NodeKind::Comment(_))) => true,
            _ => false,
        }
    }

    fn sync_node(&mut self, id: NodeId, source: &Document, src: NodeId) {
        match source.kind(src) {
            Some(NodeKind::Element { .. }) => self.sync_element(id, source, src),
            Some(NodeKind::Text(data)) | Some(NodeKind::Comment(data)) => {
                let changed = match self.node_mut(id).map(|n| &mut n.kind) {
                    Some(NodeKind::Text(current)) | Some(NodeKind::Comment(current)) if *current != *data => {
                        *current = data.clone();
                        true
                    }
                    _ => false,
                };
                if changed {
                    self.records.push(MutationRecord::CharacterData { target: id });
                }
            }
            _ => {}
        }
    }

    /// Copy `src` and its subtree from `source` under `parent`, unlinked
    fn import(&mut self, source: &Document, src: NodeId, parent: NodeId) -> NodeId {
        let kind = source.kind(src).cloned().unwrap_or(NodeKind::Comment(String::new()));
        let id = self.alloc(kind, Some(parent));
        for child in source.children(src) {
            let copied = self.import(source, *child, id);
            if let Some(node) = self.node_mut(id) {
                node.children.push(copied);
            }
        }
        id
    }

    // -------------------------------------------------------------------------
    // Parsing
    // -------------------------------------------------------------------------

    /// Parse `html` as children of `parent`; returns the top-level new nodes
    fn parse_into(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let bytes = html.as_bytes();
        let mut pos = 0;
        let mut stack = vec![parent];
        let mut top_level = Vec::new();

        while pos < bytes.len() {
            let current = *stack.last().unwrap_or(&parent);
            let is_top = stack.len() == 1;

            if bytes[pos] != b'<' {
                let start = pos;
                pos = next_tag_start(bytes, pos + 1);
                let id = self.push_node(NodeKind::Text(decode_entities(&html[start..pos])), Some(current));
                if is_top {
                    top_level.push(id);
                }
                continue;
            }

            if bytes[pos..].starts_with(b"<!--") {
                let body_start = pos + 4;
                let (content_end, next) = match html[body_start..].find("-->") {
                    Some(off) => (body_start + off, body_start + off + 3),
                    None => (bytes.len(), bytes.len()),
                };
                let id = self.push_node(
                    NodeKind::Comment(html[body_start..content_end].to_string()),
                    Some(current),
                );
                if is_top {
                    top_level.push(id);
                }
                pos = next;
                continue;
            }

            if bytes[pos..].starts_with(b"<!") || bytes[pos..].starts_with(b"<?") {
                // doctype / processing instruction
                pos = skip_past(bytes, pos, b'>');
                continue;
            }

            if bytes[pos..].starts_with(b"</") {
                let name_start = pos + 2;
                let name_end = scan_name(bytes, name_start);
                let name = html[name_start..name_end].to_ascii_lowercase();
                pos = skip_past(bytes, name_end, b'>');
                // pop up to the matching open element, ignore stray closers
                if let Some(depth) = stack
                    .iter()
                    .skip(1)
                    .rposition(|id| self.tag_name(*id) == Some(name.as_str()))
                {
                    stack.truncate(depth + 1);
                }
                continue;
            }

            let name_start = pos + 1;
            let name_end = scan_name(bytes, name_start);
            if name_end == name_start {
                // a lone '<' is text
                let start = pos;
                pos = next_tag_start(bytes, pos + 1);
                let id = self.push_node(NodeKind::Text(html[start..pos].to_string()), Some(current));
                if is_top {
                    top_level.push(id);
                }
                continue;
            }

            let tag = html[name_start..name_end].to_ascii_lowercase();
            let (attrs, self_closing, next) = parse_attributes(html, name_end);
            pos = next;

            let id = self.push_node(
                NodeKind::Element {
                    tag: tag.clone(),
                    attrs,
                },
                Some(current),
            );
            if is_top {
                top_level.push(id);
            }

            if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
                continue;
            }

            if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
                let closer = format!("</{tag}");
                let lower = html[pos..].to_ascii_lowercase();
                let end = lower.find(&closer).map(|off| pos + off).unwrap_or(bytes.len());
                if end > pos {
                    self.push_node(NodeKind::Text(html[pos..end].to_string()), Some(id));
                }
                pos = skip_past(bytes, end, b'>');
                continue;
            }

            stack.push(id);
        }

        top_level
    }
}

// =============================================================================
// Parsing helpers
// =============================================================================

fn next_tag_start(bytes: &[u8], from: usize) -> usize {
    bytes[from.min(bytes.len())..]
        .iter()
        .position(|b| *b == b'<')
        .map(|off| from + off)
        .unwrap_or(bytes.len())
}

fn skip_past(bytes: &[u8], from: usize, needle: u8) -> usize {
    bytes[from.min(bytes.len())..]
        .iter()
        .position(|b| *b == needle)
        .map(|off| from + off + 1)
        .unwrap_or(bytes.len())
}

fn scan_name(bytes: &[u8], from: usize) -> usize {
    let mut pos = from;
    while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'-' || bytes[pos] == b'_' || bytes[pos] == b':') {
        pos += 1;
    }
    pos
}

/// Parse attributes starting right after the tag name.
/// Returns (attributes, self-closing, position after '>').
fn parse_attributes(html: &str, from: usize) -> (Vec<(String, String)>, bool, usize) {
    let bytes = html.as_bytes();
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut pos = from;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            return (attrs, false, pos);
        }
        match bytes[pos] {
            b'>' => return (attrs, false, pos + 1),
            b'/' if bytes.get(pos + 1) == Some(&b'>') => return (attrs, true, pos + 2),
            b'/' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let name_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        let name = html[name_start..pos].to_ascii_lowercase();

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let mut value = String::new();
        if pos < bytes.len() && bytes[pos] == b'=' {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos < bytes.len() && (bytes[pos] == b'"' || bytes[pos] == b'\'') {
                let quote = bytes[pos];
                let start = pos + 1;
                let end = bytes[start..]
                    .iter()
                    .position(|b| *b == quote)
                    .map(|off| start + off)
                    .unwrap_or(bytes.len());
                value = decode_entities(&html[start..end]);
                pos = (end + 1).min(bytes.len());
            } else {
                let start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' {
                    pos += 1;
                }
                value = decode_entities(&html[start..pos]);
            }
        }

        if !name.is_empty() && !attrs.iter().any(|(k, _)| *k == name) {
            attrs.push((name, value));
        }
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
