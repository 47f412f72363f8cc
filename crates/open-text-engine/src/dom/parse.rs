//! html5ever tree sink that parses markup straight into the document arena.

use std::borrow::Cow;
use std::cell::{Cell, Ref, RefCell, RefMut};

use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tokenizer::TokenizerOpts;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeBuilderOpts, TreeSink};
use html5ever::{ParseOpts, QualName};

use super::{Attribute, EditableDocument, NodeData, NodeId};

fn html5ever_to_doc_attr(attr: html5ever::Attribute) -> Attribute {
    Attribute {
        name: attr.name,
        value: attr.value.to_string(),
    }
}

impl EditableDocument {
    /// Replaces the whole tree with the parsed markup.
    ///
    /// Handles taken before the call no longer resolve afterwards.
    pub fn set_markup(&mut self, markup: &str) {
        let root = self.root();
        self.clear_children(root);
        for node in self.parse_fragment(markup) {
            self.append_child(root, node);
        }
        self.ensure_block();
    }

    /// Parses markup into detached nodes owned by this document.
    ///
    /// The markup is parsed as the body of a full HTML document, so anything
    /// the HTML tree builder would hoist into `<head>` is dropped.
    pub fn parse_fragment(&mut self, markup: &str) -> Vec<NodeId> {
        let scratch = self.create_scratch_root();
        let sink = MarkupSink::new(self, scratch);
        let opts = ParseOpts {
            tokenizer: TokenizerOpts::default(),
            tree_builder: TreeBuilderOpts {
                exact_errors: false,
                scripting_enabled: false,
                iframe_srcdoc: false,
                drop_doctype: true,
                quirks_mode: QuirksMode::NoQuirks,
            },
        };
        html5ever::parse_document(sink, opts).one(markup);

        let body = self
            .element_children(scratch)
            .into_iter()
            .find(|&id| self.is_element_with_tag(id, "html"))
            .and_then(|html| {
                self.element_children(html)
                    .into_iter()
                    .find(|&id| self.is_element_with_tag(id, "body"))
            });

        let nodes = body
            .and_then(|body| self.get(body))
            .map(|body| body.children.clone())
            .unwrap_or_default();
        for &node in &nodes {
            self.detach(node);
        }
        self.remove_node(scratch);
        nodes
    }
}

struct MarkupSink<'doc> {
    doc: RefCell<&'doc mut EditableDocument>,
    document_id: NodeId,
    errors: RefCell<Vec<Cow<'static, str>>>,
    quirks_mode: Cell<QuirksMode>,
}

impl<'doc> MarkupSink<'doc> {
    fn new(doc: &'doc mut EditableDocument, document_id: NodeId) -> Self {
        Self {
            doc: RefCell::new(doc),
            document_id,
            errors: RefCell::new(Vec::new()),
            quirks_mode: Cell::new(QuirksMode::NoQuirks),
        }
    }

    #[track_caller]
    fn doc_mut(&self) -> RefMut<'_, &'doc mut EditableDocument> {
        self.doc.borrow_mut()
    }

    /// Appends text to `target` if it is a text node. Returns false otherwise.
    fn merge_text(&self, target: Option<NodeId>, text: &str) -> bool {
        let Some(target) = target else {
            return false;
        };
        let mut doc = self.doc_mut();
        match doc.get_mut(target).map(|node| &mut node.data) {
            Some(NodeData::Text(content)) => {
                content.push_str(text);
                true
            }
            _ => false,
        }
    }
}

impl<'doc> TreeSink for MarkupSink<'doc> {
    type Output = ();

    // Nodes are addressed by their arena id
    type Handle = NodeId;

    type ElemName<'a>
        = Ref<'a, QualName>
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        for error in self.errors.borrow().iter() {
            log::trace!("markup parse error: {error}");
        }
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.errors.borrow_mut().push(msg);
    }

    fn get_document(&self) -> Self::Handle {
        self.document_id
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        Ref::map(self.doc.borrow(), |doc| {
            &doc.get(*target)
                .and_then(|node| node.element_data())
                .expect("TreeSink::elem_name called on a node which is not an element!")
                .name
        })
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<html5ever::Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs = attrs.into_iter().map(html5ever_to_doc_attr).collect();
        self.doc_mut().create_element_with_name(name, attrs)
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.doc_mut().create_comment_node(&text)
    }

    fn create_pi(&self, _target: StrTendril, data: StrTendril) -> Self::Handle {
        self.doc_mut().create_comment_node(&data)
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendNode(id) => self.doc_mut().append_child(*parent, id),
            NodeOrText::AppendText(text) => {
                let last_child = self
                    .doc
                    .borrow()
                    .get(*parent)
                    .and_then(|node| node.children.last().copied());
                if !self.merge_text(last_child, &text) {
                    let mut doc = self.doc_mut();
                    let text_id = doc.create_text_node(&text);
                    doc.append_child(*parent, text_id);
                }
            }
        }
    }

    // The tree builder promises there is never a text node after the insertion point.
    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        match new_node {
            NodeOrText::AppendNode(id) => self.doc_mut().insert_before(*sibling, id),
            NodeOrText::AppendText(text) => {
                let previous = {
                    let doc = self.doc.borrow();
                    doc.get(*sibling).and_then(|node| node.parent).and_then(|parent| {
                        let index = doc.index_of_child(parent, *sibling)?;
                        index
                            .checked_sub(1)
                            .and_then(|prev| doc.get(parent)?.children.get(prev).copied())
                    })
                };
                if !self.merge_text(previous, &text) {
                    let mut doc = self.doc_mut();
                    let text_id = doc.create_text_node(&text);
                    doc.insert_before(*sibling, text_id);
                }
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self
            .doc
            .borrow()
            .get(*element)
            .is_some_and(|node| node.parent.is_some());
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        self.quirks_mode.set(mode);
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<html5ever::Attribute>) {
        let mut doc = self.doc_mut();
        let Some(element) = doc.get_mut(*target).and_then(|node| node.element_data_mut()) else {
            return;
        };
        for attr in attrs {
            if element.attr(&attr.name.local).is_none() {
                element.attrs.push(html5ever_to_doc_attr(attr));
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.doc_mut().detach(*target);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        self.doc_mut().reparent_children(*node, *new_parent);
    }
}
