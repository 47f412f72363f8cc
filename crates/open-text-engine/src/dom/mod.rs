//! # Live Document Tree
//!
//! `EditableDocument` is the mutable tree behind the editing surface. Anything
//! may change it at any time: typing, pasted markup, structural table edits or
//! a host calling `set_markup`. Nodes live in a slab arena and refer to each
//! other by `NodeId`.
//!
//! Slab slots are reused after removal, so a bare `NodeId` held across
//! mutations can silently start pointing at an unrelated node. Long-lived
//! references (the selected node, the active cell, saved selection
//! boundaries) are therefore stored as [`NodeRef`], which carries the
//! generation of the node it was taken from. Every consumer re-validates a
//! `NodeRef` with [`EditableDocument::is_attached`] or
//! [`EditableDocument::attached`] before touching the node.

mod parse;
mod serialize;
mod style;

pub use style::InlineStyle;

use markup5ever::{LocalName, QualName, ns};
use slab::Slab;

pub type NodeId = usize;

/// Generation-checked handle to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    id: NodeId,
    generation: u64,
}

impl NodeRef {
    pub fn id(&self) -> NodeId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: html_name(name),
            value: value.to_string(),
        }
    }
}

/// Builds an HTML-namespace qualified name.
pub fn html_name(local: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(local.to_ascii_lowercase()))
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub name: QualName,
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    pub fn new(name: QualName, attrs: Vec<Attribute>) -> Self {
        Self { name, attrs }
    }

    /// Lowercase local tag name, e.g. `"td"`.
    pub fn tag(&self) -> &str {
        &self.name.local
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| &*attr.name.local == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self
            .attrs
            .iter_mut()
            .find(|attr| &*attr.name.local == name)
        {
            Some(attr) => attr.value = value.to_string(),
            None => self.attrs.push(Attribute::new(name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|attr| &*attr.name.local != name);
    }

    pub fn style(&self) -> InlineStyle {
        InlineStyle::parse(self.attr("style").unwrap_or_default())
    }

    pub fn set_style_property(&mut self, name: &str, value: &str) {
        let mut style = self.style();
        style.set(name, value);
        self.write_style(style);
    }

    pub fn remove_style_property(&mut self, name: &str) {
        let mut style = self.style();
        style.remove(name);
        self.write_style(style);
    }

    fn write_style(&mut self, style: InlineStyle) {
        if style.is_empty() {
            self.remove_attr("style");
        } else {
            self.set_attr("style", &style.to_css());
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    /// The editable container itself, or a detached scratch host while parsing.
    Root,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub generation: u64,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    pub fn is_text_node(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    pub fn element_data(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn element_data_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.element_data().map(ElementData::tag)
    }

    pub fn is_element_with_tag(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }
}

/// The live, externally-mutable tree rendered inside the editing surface.
#[derive(Debug, Clone)]
pub struct EditableDocument {
    nodes: Slab<Node>,
    root: NodeId,
    next_generation: u64,
}

impl Default for EditableDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl EditableDocument {
    /// An empty document holding the single `<p><br></p>` block that keeps
    /// the native caret positioned.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Slab::new(),
            root: 0,
            next_generation: 0,
        };
        doc.root = doc.create_node(NodeData::Root);
        doc.ensure_block();
        doc
    }

    pub fn from_markup(markup: &str) -> Self {
        let mut doc = Self::new();
        doc.set_markup(markup);
        doc
    }

    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let markup = std::str::from_utf8(bytes)?;
        Ok(Self::from_markup(markup))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ============ Handles ============

    pub fn node_ref(&self, id: NodeId) -> Option<NodeRef> {
        self.nodes.get(id).map(|node| NodeRef {
            id,
            generation: node.generation,
        })
    }

    /// Resolves a handle to its node id if the slot still holds the same node,
    /// attached or not.
    pub fn resolve(&self, node: NodeRef) -> Option<NodeId> {
        self.nodes
            .get(node.id)
            .filter(|n| n.generation == node.generation)
            .map(|n| n.id)
    }

    pub fn is_attached(&self, node: NodeRef) -> bool {
        self.attached(node).is_some()
    }

    /// Resolves a handle only if the node is still connected to the root.
    pub fn attached(&self, node: NodeRef) -> Option<NodeId> {
        self.resolve(node).filter(|&id| self.is_connected(id))
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.ancestors(id).any(|ancestor| ancestor == self.root)
    }

    // ============ Construction ============

    fn create_node(&mut self, data: NodeData) -> NodeId {
        let generation = self.next_generation;
        self.next_generation += 1;
        let entry = self.nodes.vacant_entry();
        let id = entry.key();
        entry.insert(Node {
            id,
            generation,
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    pub(crate) fn create_scratch_root(&mut self) -> NodeId {
        self.create_node(NodeData::Root)
    }

    pub fn create_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(name, value)| Attribute::new(name, value))
            .collect();
        self.create_element_with_name(html_name(tag), attrs)
    }

    pub fn create_element_with_name(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        self.create_node(NodeData::Element(ElementData::new(name, attrs)))
    }

    pub fn create_text_node(&mut self, text: &str) -> NodeId {
        self.create_node(NodeData::Text(text.to_string()))
    }

    pub fn create_comment_node(&mut self, text: &str) -> NodeId {
        self.create_node(NodeData::Comment(text.to_string()))
    }

    /// Copy of the element with its attributes but none of its children,
    /// like `cloneNode(false)`.
    pub fn shallow_clone(&mut self, id: NodeId) -> Option<NodeId> {
        let data = self.nodes.get(id)?.data.clone();
        Some(self.create_node(data))
    }

    // ============ Structure ============

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.nodes.contains(parent) || !self.nodes.contains(child) {
            return;
        }
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    pub fn insert_before(&mut self, anchor: NodeId, new_node: NodeId) {
        if anchor == new_node || !self.nodes.contains(new_node) {
            return;
        }
        let Some(parent) = self.nodes.get(anchor).and_then(|n| n.parent) else {
            return;
        };
        self.detach(new_node);
        let Some(index) = self.index_of_child(parent, anchor) else {
            return;
        };
        self.nodes[new_node].parent = Some(parent);
        self.nodes[parent].children.insert(index, new_node);
    }

    pub fn insert_after(&mut self, anchor: NodeId, new_node: NodeId) {
        if anchor == new_node || !self.nodes.contains(new_node) {
            return;
        }
        let Some(parent) = self.nodes.get(anchor).and_then(|n| n.parent) else {
            return;
        };
        self.detach(new_node);
        let Some(index) = self.index_of_child(parent, anchor) else {
            return;
        };
        self.nodes[new_node].parent = Some(parent);
        self.nodes[parent].children.insert(index + 1, new_node);
    }

    /// Unlinks a node from its parent but keeps it (and its subtree) alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get_mut(id).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.retain(|&child| child != id);
        }
    }

    /// Detaches a node and frees it together with its whole subtree.
    pub fn remove_node(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.try_remove(next) {
                stack.extend(node.children);
            }
        }
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let children = match self.nodes.get(id) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.remove_node(child);
        }
    }

    /// Moves every child of `from` to the end of `to`.
    pub fn reparent_children(&mut self, from: NodeId, to: NodeId) {
        let children = match self.nodes.get(from) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.append_child(to, child);
        }
    }

    /// Splits `parent` at child `index`, and each ancestor above it up to and
    /// including `until`, the way a block is split at the caret. Halves left
    /// without children are removed. Returns the position between the two
    /// halves of `until` as `(its parent, child index)`.
    pub fn split_up_to(
        &mut self,
        parent: NodeId,
        index: usize,
        until: NodeId,
    ) -> Option<(NodeId, usize)> {
        if !self.contains(until, parent) {
            return None;
        }
        let (mut parent, mut index) = (parent, index);
        loop {
            let grand = self.nodes.get(parent)?.parent?;
            let right = self.shallow_clone(parent)?;
            let moved: Vec<NodeId> = self.nodes[parent]
                .children
                .iter()
                .skip(index)
                .copied()
                .collect();
            for child in moved {
                self.append_child(right, child);
            }
            self.insert_after(parent, right);

            let mut position = self.index_of_child(grand, parent)? + 1;
            if self.nodes[right].children.is_empty() {
                self.remove_node(right);
            }
            if self.nodes[parent].children.is_empty() {
                self.remove_node(parent);
                position -= 1;
            }
            if parent == until {
                return Some((grand, position));
            }
            parent = grand;
            index = position;
        }
    }

    pub fn index_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes
            .get(parent)?
            .children
            .iter()
            .position(|&id| id == child)
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .map(|node| {
                node.children
                    .iter()
                    .copied()
                    .filter(|&child| self.nodes[child].is_element())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Follows child indices down from the root, e.g. `[0, 0, 1]`.
    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeId> {
        path.iter().try_fold(self.root, |current, &index| {
            self.nodes.get(current)?.children.get(index).copied()
        })
    }

    // ============ Queries ============

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id)?.tag()
    }

    pub fn is_element_with_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    /// The node itself followed by each of its ancestors.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(
            self.nodes.contains(id).then_some(id),
            move |&current| self.nodes.get(current).and_then(|node| node.parent),
        )
    }

    /// Nearest inclusive ancestor whose tag is one of `tags`, like
    /// `Element.closest("td, th")`.
    pub fn closest(&self, id: NodeId, tags: &[&str]) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&ancestor| self.tag(ancestor).is_some_and(|tag| tags.contains(&tag)))
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|id| id == ancestor)
    }

    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let chain: Vec<NodeId> = self.ancestors(a).collect();
        self.ancestors(b).find(|id| chain.contains(id))
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_text_content(id, &mut out);
        out
    }

    fn write_text_content(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(_) | NodeData::Root => {
                for &child in &node.children {
                    self.write_text_content(child, out);
                }
            }
            NodeData::Comment(_) => {}
        }
    }

    // ============ Styles ============

    pub fn style(&self, id: NodeId) -> InlineStyle {
        self.nodes
            .get(id)
            .and_then(Node::element_data)
            .map(ElementData::style)
            .unwrap_or_default()
    }

    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.nodes.get_mut(id).and_then(Node::element_data_mut) {
            el.set_style_property(name, value);
        }
    }

    pub fn remove_style_property(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.nodes.get_mut(id).and_then(Node::element_data_mut) {
            el.remove_style_property(name);
        }
    }

    /// Restores the "never truly empty" invariant. Returns true if a block
    /// had to be added.
    pub fn ensure_block(&mut self) -> bool {
        if !self.element_children(self.root).is_empty() {
            return false;
        }
        let root = self.root;
        let paragraph = self.create_element("p", &[]);
        if self.text_content(root).trim().is_empty() {
            self.clear_children(root);
            let br = self.create_element("br", &[]);
            self.append_child(paragraph, br);
        } else {
            // Bare text typed straight into the root gets wrapped, not lost.
            self.reparent_children(root, paragraph);
        }
        self.append_child(root, paragraph);
        true
    }
}
