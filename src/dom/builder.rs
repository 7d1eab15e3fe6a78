//! Tree Builder
//!
//! Incremental arena construction shared by the XML parser and the HTML
//! tree builder:
//! - Open/close elements against a stack of open element ids
//! - Allocate attribute nodes directly after their element
//! - Resolve namespaces (XML documents only)
//! - Merge adjacent text and apply the blank-text filter

use super::document::{Document, DocumentKind};
use super::namespace::NamespaceResolver;
use super::node::{NamespaceDecl, NodeId, NodeKind, XmlNode, DOCUMENT_NODE, FLAG_NO_VALUE, FLAG_SELF_CLOSED};
use crate::core::attributes::{split_qname, Attribute};
use crate::core::scanner::is_blank;
use crate::error::{Error, Result};
use log::{debug, warn};

pub(crate) struct TreeBuilder {
    doc: Document,
    /// Open elements; the document node sits at the bottom
    stack: Vec<NodeId>,
    /// Namespace scopes, absent for HTML where `xmlns` is a plain attribute
    resolver: Option<NamespaceResolver>,
    no_blanks: bool,
}

impl TreeBuilder {
    pub fn new(kind: DocumentKind, no_blanks: bool) -> Self {
        let mut doc = Document::empty(kind);
        let resolver = match kind {
            DocumentKind::Xml => Some(NamespaceResolver::new(&mut doc.strings)),
            DocumentKind::Html => None,
        };
        TreeBuilder {
            doc,
            stack: vec![DOCUMENT_NODE],
            resolver,
            no_blanks,
        }
    }

    /// Innermost open element, or the document node
    #[inline]
    pub fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(DOCUMENT_NODE)
    }

    /// Number of open elements
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn has_root(&self) -> bool {
        self.doc.root_element.is_some()
    }

    /// Open element ids from outermost to innermost
    pub fn open_elements(&self) -> &[NodeId] {
        &self.stack[1..]
    }

    pub fn element_name(&self, id: NodeId) -> &str {
        self.doc
            .nodes
            .get(id as usize)
            .map(|node| self.doc.strings.get(node.name_id))
            .unwrap_or("")
    }

    /// Name of the innermost open element
    pub fn current_name(&self) -> Option<&str> {
        if self.depth() == 0 {
            None
        } else {
            Some(self.element_name(self.current()))
        }
    }

    /// Whether an element with this name is open
    pub fn is_open(&self, name: &str) -> bool {
        self.open_elements().iter().any(|&id| self.element_name(id) == name)
    }

    pub fn set_declaration(&mut self, version: Option<String>, encoding: Option<String>) {
        self.doc.version = version;
        self.doc.encoding = encoding;
    }

    pub fn set_doctype(&mut self, content: &str) {
        if self.doc.doctype.is_none() {
            self.doc.doctype = Some(content.to_string());
        }
    }

    /// Open an element under the current node and make it current
    pub fn open_element(&mut self, name: &str, attrs: &[Attribute<'_>], self_closed: bool) -> NodeId {
        let parent = self.current();
        let id = self.doc.nodes.len() as NodeId;

        let mut node = XmlNode::new(NodeKind::Element, Some(parent));
        node.name_id = self.doc.strings.intern(name);
        if self_closed {
            node.flags |= FLAG_SELF_CLOSED;
        }

        match self.resolver.as_mut() {
            Some(resolver) => {
                resolver.push_scope();
                node.ns_start = self.doc.ns_decls.len() as u32;
                for attr in attrs.iter().filter(|a| a.is_namespace_decl()) {
                    let prefix_id = match attr.name.strip_prefix("xmlns:") {
                        Some(prefix) => self.doc.strings.intern(prefix),
                        None => 0,
                    };
                    let uri_id = self.doc.strings.intern(&attr.value);
                    if prefix_id != 0 && uri_id == 0 {
                        warn!("empty namespace URI for prefix '{}' on <{}>", &attr.name[6..], name);
                        continue;
                    }
                    if resolver.declare(prefix_id, uri_id) {
                        self.doc.ns_decls.push(NamespaceDecl { prefix_id, uri_id });
                    }
                }
                node.ns_count = self.doc.ns_decls.len() as u32 - node.ns_start;

                let (prefix, local) = split_qname(name);
                node.local_id = self.doc.strings.intern(local);
                node.namespace_id = match prefix {
                    Some(prefix) => {
                        node.prefix_id = self.doc.strings.intern(prefix);
                        resolver.resolve(node.prefix_id).unwrap_or_else(|| {
                            warn!("namespace prefix '{}' on <{}> is not defined", prefix, name);
                            0
                        })
                    }
                    None => resolver.resolve_default(),
                };
            }
            None => node.local_id = node.name_id,
        }
        self.doc.nodes.push(node);

        let attr_start = id + 1;
        for attr in attrs {
            if self.resolver.is_some() && attr.is_namespace_decl() {
                continue;
            }
            let mut attr_node = XmlNode::new(NodeKind::Attribute, Some(id));
            attr_node.name_id = self.doc.strings.intern(attr.name);
            attr_node.local_id = attr_node.name_id;
            if let Some(resolver) = self.resolver.as_ref() {
                if let (Some(prefix), local) = split_qname(attr.name) {
                    attr_node.prefix_id = self.doc.strings.intern(prefix);
                    attr_node.local_id = self.doc.strings.intern(local);
                    match resolver.resolve(attr_node.prefix_id) {
                        Some(uri) => attr_node.namespace_id = uri,
                        None => warn!("namespace prefix '{}' on attribute {} is not defined", prefix, attr.name),
                    }
                }
            }
            attr_node.value_id = self.doc.strings.push(&attr.value);
            if attr.is_boolean {
                attr_node.flags |= FLAG_NO_VALUE;
            }
            self.doc.nodes.push(attr_node);
        }
        let attr_count = self.doc.nodes.len() as u32 - attr_start;
        let element = &mut self.doc.nodes[id as usize];
        element.attr_start = attr_start;
        element.attr_count = attr_count;

        self.link_child(parent, id);
        self.stack.push(id);
        if parent == DOCUMENT_NODE && self.doc.root_element.is_none() {
            self.doc.root_element = Some(id);
        }
        id
    }

    /// Close the innermost open element
    pub fn close_element(&mut self) -> Option<NodeId> {
        if self.stack.len() <= 1 {
            return None;
        }
        if let Some(resolver) = self.resolver.as_mut() {
            resolver.pop_scope();
        }
        self.stack.pop()
    }

    /// Close open elements up to and including the innermost one named
    /// `name`. Returns false, closing nothing, when no such element is open.
    pub fn close_until(&mut self, name: &str) -> bool {
        if !self.is_open(name) {
            return false;
        }
        while let Some(id) = self.close_element() {
            if self.element_name(id) == name {
                break;
            }
        }
        true
    }

    pub fn close_all(&mut self) {
        while self.close_element().is_some() {}
    }

    /// Append character data to the current element, merging with a
    /// preceding text node. Text at document level is discarded.
    /// `before_end_tag` tells the blank filter that the parent's end tag
    /// follows immediately.
    pub fn append_text(&mut self, text: &str, before_end_tag: bool) {
        let parent = self.current();
        if text.is_empty() || parent == DOCUMENT_NODE {
            return;
        }
        if self.no_blanks && is_blank(text.as_bytes()) && !self.keeps_blank(parent, before_end_tag) {
            return;
        }

        if let Some(last) = self.doc.nodes[parent as usize].last_child {
            if self.doc.nodes[last as usize].kind == NodeKind::Text {
                let value_id = self.doc.nodes[last as usize].value_id;
                let merged = format!("{}{}", self.doc.strings.get(value_id), text);
                self.doc.nodes[last as usize].value_id = self.doc.strings.push(&merged);
                return;
            }
        }
        let value_id = self.doc.strings.push(text);
        self.push_leaf(NodeKind::Text, 0, value_id);
    }

    /// Blank text survives when it is the whole content of an element or
    /// sits in mixed content.
    fn keeps_blank(&self, parent: NodeId, before_end_tag: bool) -> bool {
        let node = &self.doc.nodes[parent as usize];
        match node.last_child {
            None => before_end_tag,
            Some(last) => {
                self.doc.nodes[last as usize].kind == NodeKind::Text
                    || node
                        .first_child
                        .is_some_and(|first| self.doc.nodes[first as usize].kind == NodeKind::Text)
            }
        }
    }

    pub fn append_cdata(&mut self, text: &str) {
        let value_id = self.doc.strings.push(text);
        self.push_leaf(NodeKind::CData, 0, value_id);
    }

    pub fn append_comment(&mut self, text: &str) {
        let value_id = self.doc.strings.push(text);
        self.push_leaf(NodeKind::Comment, 0, value_id);
    }

    pub fn append_pi(&mut self, target: &str, data: &str) {
        let name_id = self.doc.strings.intern(target);
        let value_id = self.doc.strings.push(data);
        self.push_leaf(NodeKind::ProcessingInstruction, name_id, value_id);
    }

    fn push_leaf(&mut self, kind: NodeKind, name_id: u32, value_id: u32) -> NodeId {
        let parent = self.current();
        let id = self.doc.nodes.len() as NodeId;
        let mut node = XmlNode::new(kind, Some(parent));
        node.name_id = name_id;
        node.local_id = name_id;
        node.value_id = value_id;
        self.doc.nodes.push(node);
        self.link_child(parent, id);
        id
    }

    /// Link a child node to its parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let prev_last = self.doc.nodes[parent_id as usize].last_child;
        if let Some(last_id) = prev_last {
            self.doc.nodes[last_id as usize].next_sibling = Some(child_id);
            self.doc.nodes[child_id as usize].prev_sibling = Some(last_id);
        } else {
            self.doc.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.doc.nodes[parent_id as usize].last_child = Some(child_id);
    }

    /// Finish building. A tree without any element is rejected.
    pub fn finish(mut self) -> Result<Document> {
        self.close_all();
        if self.doc.root_element.is_none() {
            return Err(Error::NoRoot);
        }
        debug!(
            "built {:?} document: {} nodes, {} namespace declarations",
            self.doc.kind,
            self.doc.nodes.len(),
            self.doc.ns_decls.len()
        );
        Ok(self.doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn attr<'a>(name: &'a str, value: &'a str) -> Attribute<'a> {
        Attribute {
            name,
            value: Cow::Borrowed(value),
            is_boolean: false,
        }
    }

    #[test]
    fn test_attributes_follow_element() {
        let mut builder = TreeBuilder::new(DocumentKind::Xml, false);
        let root = builder.open_element("root", &[attr("a", "1"), attr("b", "2")], false);
        let child = builder.open_element("child", &[], true);
        builder.close_element();
        builder.close_element();
        let doc = builder.finish().unwrap();

        assert_eq!(root, 1);
        assert_eq!(doc.attributes(root).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(child, 4);
        assert_eq!(doc.children(root).collect::<Vec<_>>(), vec![child]);
    }

    #[test]
    fn test_text_merging() {
        let mut builder = TreeBuilder::new(DocumentKind::Xml, false);
        let root = builder.open_element("r", &[], false);
        builder.append_text("a", false);
        builder.append_text("b", true);
        let doc = builder.finish().unwrap();
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.text_content(root), "ab");
    }

    #[test]
    fn test_blank_filter() {
        let mut builder = TreeBuilder::new(DocumentKind::Xml, true);
        let root = builder.open_element("r", &[], false);
        builder.append_text("\n  ", false);
        builder.open_element("a", &[], false);
        builder.append_text(" ", true);
        builder.close_element();
        builder.append_text("\n", false);
        let doc = builder.finish().unwrap();

        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 1);
        // whole-content blank is kept
        assert_eq!(doc.text_content(children[0]), " ");
    }

    #[test]
    fn test_close_until() {
        let mut builder = TreeBuilder::new(DocumentKind::Html, false);
        builder.open_element("div", &[], false);
        builder.open_element("p", &[], false);
        builder.open_element("b", &[], false);
        assert!(!builder.close_until("span"));
        assert_eq!(builder.depth(), 3);
        assert!(builder.close_until("p"));
        assert_eq!(builder.current_name(), Some("div"));
    }

    #[test]
    fn test_finish_without_root() {
        let mut builder = TreeBuilder::new(DocumentKind::Xml, false);
        builder.append_comment("only a comment");
        assert!(matches!(builder.finish(), Err(Error::NoRoot)));
    }
}
