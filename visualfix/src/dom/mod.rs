// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! In-memory rendered tree the page runtime operates on.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. Detached nodes stay in the arena; they simply have no parent.
//! Every structural or text change is appended to a mutation queue that the
//! observation loop drains, which plays the part of a mutation observer.

pub mod entities;
mod parse;
pub mod selector;
mod serialize;

pub use entities::{decode_entities, escape_attribute, escape_text};
pub use selector::{Selector, SelectorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|value| value.split_ascii_whitespace().any(|item| item == class))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
    Doctype(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    CharacterData,
    Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Input,
    KeyDown {
        key: String,
        code: String,
        key_code: u32,
    },
    Change,
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub target: NodeId,
    pub kind: EventKind,
    pub bubbles: bool,
    pub cancelable: bool,
}

/// Arena-backed page tree.
///
/// Nodes are never freed: removed or replaced subtrees stay in the arena,
/// detached, so a `NodeId` never dangles. A document lives for one page
/// load. Dispatched events queue up until the bridge to the host drains
/// them with [`Document::take_events`].
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    mutations: Vec<MutationRecord>,
    events: Vec<DispatchedEvent>,
    focused: Option<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            mutations: Vec::new(),
            events: Vec::new(),
            focused: None,
        }
    }

    /// Parse a whole page. Parsing does not produce mutation records.
    pub fn parse(html: &str) -> Self {
        let mut document = Self::new();
        let root = document.root();
        parse::parse_into(&mut document, root, html);
        document.mutations.clear();
        document
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0].data
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes[node.0].data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[node.0].data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| element.name.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// True when `node` is `ancestor` or sits below it.
    pub fn is_inclusive_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.parent(candidate);
        }
        false
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.is_inclusive_descendant(node, self.root())
    }

    /// Descendants of `node` in document order, `node` excluded.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut ordered = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            ordered.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        ordered
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push_node(NodeData::Element(ElementData::new(name)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeData::Text(text.to_string()))
    }

    pub(crate) fn create_node(&mut self, data: NodeData) -> NodeId {
        self.push_node(data)
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        NodeId(self.nodes.len() - 1)
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
            self.record(MutationKind::ChildList, parent);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.is_inclusive_descendant(parent, child) {
            log::warn!("VisualFix: refusing to append a node into its own subtree");
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.record(MutationKind::ChildList, parent);
    }

    /// Insert `child` before `reference`; appends when `reference` is not a
    /// child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        if self.is_inclusive_descendant(parent, child) {
            log::warn!("VisualFix: refusing to insert a node into its own subtree");
            return;
        }
        self.detach(child);
        let position = self.nodes[parent.0]
            .children
            .iter()
            .position(|existing| *existing == reference);
        self.nodes[child.0].parent = Some(parent);
        match position {
            Some(index) => self.nodes[parent.0].children.insert(index, child),
            None => self.nodes[parent.0].children.push(child),
        }
        self.record(MutationKind::ChildList, parent);
    }

    pub fn remove(&mut self, node: NodeId) {
        if self.focused.is_some_and(|focused| self.is_inclusive_descendant(focused, node)) {
            self.focused = None;
        }
        self.detach(node);
    }

    fn clear_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in &children {
            self.nodes[child.0].parent = None;
        }
        if !children.is_empty() {
            self.record(MutationKind::ChildList, node);
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|element| element.attr(name))
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(element) = self.element_mut(node) else {
            return;
        };
        let name = name.to_ascii_lowercase();
        match element.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) if existing == value => return,
            Some((_, existing)) => *existing = value.to_string(),
            None => element.attrs.push((name, value.to_string())),
        }
        self.record(MutationKind::Attributes, node);
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .map(|element| element.has_class(class))
            .unwrap_or(false)
    }

    /// Add or remove a class. Returns true when the class list changed.
    pub fn set_class(&mut self, node: NodeId, class: &str, present: bool) -> bool {
        if !self.is_element(node) || self.has_class(node, class) == present {
            return false;
        }
        let current = self.attr(node, "class").unwrap_or("").to_string();
        let mut classes: Vec<&str> = current.split_ascii_whitespace().collect();
        if present {
            classes.push(class);
        } else {
            classes.retain(|item| *item != class);
        }
        let updated = classes.join(" ");
        self.set_attr(node, "class", &updated);
        true
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> bool {
        self.set_class(node, class, true)
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) -> bool {
        self.set_class(node, class, false)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> String {
        match &self.nodes[node.0].data {
            NodeData::Text(text) | NodeData::Comment(text) => text.clone(),
            NodeData::Doctype(_) => String::new(),
            NodeData::Document | NodeData::Element(_) => {
                let mut text = String::new();
                for descendant in self.descendants(node) {
                    if let NodeData::Text(value) = &self.nodes[descendant.0].data {
                        text.push_str(value);
                    }
                }
                text
            }
        }
    }

    /// Replace the content of `node` with a single text node, or update the
    /// data of a text node in place.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        match &mut self.nodes[node.0].data {
            NodeData::Text(value) | NodeData::Comment(value) => {
                if value != text {
                    *value = text.to_string();
                    self.record(MutationKind::CharacterData, node);
                }
            }
            NodeData::Doctype(_) => {}
            NodeData::Document | NodeData::Element(_) => {
                self.clear_children(node);
                if !text.is_empty() {
                    let text_node = self.create_text(text);
                    self.append_child(node, text_node);
                }
            }
        }
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        serialize::inner_html(self, node)
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        serialize::outer_html(self, node)
    }

    /// Replace the children of `node` with the parsed fragment. Text nodes
    /// have no markup of their own; their data is set to the fragment's text.
    pub fn set_inner_html(&mut self, node: NodeId, html: &str) {
        match self.data(node) {
            NodeData::Element(_) | NodeData::Document => {
                self.clear_children(node);
                parse::parse_into(self, node, html);
            }
            NodeData::Text(_) | NodeData::Comment(_) => {
                let text = fragment_text(html);
                self.set_text_content(node, &text);
            }
            NodeData::Doctype(_) => {}
        }
    }

    /// Descendants of `scope` matching `selector`, in document order.
    pub fn select_with(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|node| selector.matches(self, *node))
            .collect()
    }

    /// Convenience wrapper parsing `selector`; an invalid selector matches
    /// nothing and is logged.
    pub fn select(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        match Selector::parse(selector) {
            Ok(parsed) => self.select_with(scope, &parsed),
            Err(error) => {
                log::error!("VisualFix: invalid selector '{}': {}", selector, error);
                Vec::new()
            }
        }
    }

    pub fn select_first(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
        self.select(scope, selector).into_iter().next()
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> bool {
        Selector::parse(selector)
            .map(|parsed| parsed.matches(self, node))
            .unwrap_or(false)
    }

    fn record(&mut self, kind: MutationKind, target: NodeId) {
        self.mutations.push(MutationRecord { kind, target });
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }

    pub fn pending_mutations(&self) -> &[MutationRecord] {
        &self.mutations
    }

    /// Drain the queued mutation records.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    pub fn focus(&mut self, node: NodeId) {
        self.focused = Some(node);
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn dispatch_event(&mut self, target: NodeId, kind: EventKind, bubbles: bool, cancelable: bool) {
        self.events.push(DispatchedEvent {
            target,
            kind,
            bubbles,
            cancelable,
        });
    }

    /// Drain synthetic events for whoever bridges them to the host.
    pub fn take_events(&mut self) -> Vec<DispatchedEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Text content of `html` once parsed as markup.
pub fn fragment_text(html: &str) -> String {
    let mut scratch = Document::new();
    let root = scratch.root();
    parse::parse_into(&mut scratch, root, html);
    scratch.text_content(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_serialize_preserve_structure() {
        let html = r#"<div class="a b" id="x"><span>one</span> two<br><i class="ti ti-tag"></i></div>"#;
        let document = Document::parse(html);
        assert_eq!(document.inner_html(document.root()), html);
    }

    #[test]
    fn class_toggling_reports_changes_once() {
        let mut document = Document::parse(r#"<div class="card"></div>"#);
        let card = document.select_first(document.root(), ".card").expect("card");
        assert!(document.add_class(card, "hidden"));
        assert!(!document.add_class(card, "hidden"));
        assert_eq!(document.attr(card, "class"), Some("card hidden"));
        assert!(document.remove_class(card, "hidden"));
        assert_eq!(document.attr(card, "class"), Some("card"));
    }

    #[test]
    fn structural_changes_are_recorded() {
        let mut document = Document::parse("<ul><li>a</li></ul>");
        assert!(!document.has_pending_mutations());
        let list = document.select_first(document.root(), "ul").expect("list");
        let item = document.create_element("li");
        document.append_child(list, item);
        let records = document.take_mutations();
        assert_eq!(
            records,
            vec![MutationRecord {
                kind: MutationKind::ChildList,
                target: list
            }]
        );
        assert!(document.take_mutations().is_empty());
    }

    #[test]
    fn insert_before_falls_back_to_append() {
        let mut document = Document::parse("<p><b>1</b></p><i></i>");
        let paragraph = document.select_first(document.root(), "p").expect("p");
        let outside = document.select_first(document.root(), "i").expect("i");
        let node = document.create_text("2");
        document.insert_before(paragraph, node, outside);
        assert_eq!(document.inner_html(paragraph), "<b>1</b>2");
    }

    #[test]
    fn set_inner_html_on_text_node_keeps_text_only() {
        let mut document = Document::parse("<p>x</p>");
        let paragraph = document.select_first(document.root(), "p").expect("p");
        let text = document.children(paragraph)[0];
        document.set_inner_html(text, "<b>bold</b> text");
        assert_eq!(document.text_content(paragraph), "bold text");
    }

    #[test]
    fn replaced_nodes_stay_detached_in_the_arena() {
        let mut document = Document::parse("<p><b>old</b></p>");
        let paragraph = document.select_first(document.root(), "p").expect("p");
        let old = document.select_first(paragraph, "b").expect("b");
        document.set_inner_html(paragraph, "<i>new</i>");
        assert!(!document.is_connected(old));
        assert_eq!(document.text_content(old), "old");
    }

    #[test]
    fn events_queue_until_drained() {
        let mut document = Document::parse("<input>");
        let input = document.select_first(document.root(), "input").expect("input");
        document.dispatch_event(input, EventKind::Input, true, false);
        document.dispatch_event(input, EventKind::Change, true, false);
        assert_eq!(document.take_events().len(), 2);
        assert!(document.take_events().is_empty());
    }

    #[test]
    fn removing_focused_subtree_clears_focus() {
        let mut document = Document::parse("<div><span></span></div>");
        let div = document.select_first(document.root(), "div").expect("div");
        let span = document.select_first(div, "span").expect("span");
        document.focus(span);
        document.remove(div);
        assert_eq!(document.focused(), None);
        assert!(!document.is_connected(span));
    }
}
