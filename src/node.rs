//! High-level node handle
//!
//! `Node` pairs a document with a node id and offers tree navigation, raw
//! markup dumps and XPath queries relative to the node. Queries register
//! every namespace the document declares plus those added with
//! [`Document::register_namespace`], and the root element's default
//! namespace applies to unprefixed element names, so
//! `doc.root()?.select("//item")` works on namespaced feeds as written.

use crate::core::scanner::is_blank;
use crate::dom::{self, Document, DocumentKind, NodeId, NodeKind};
use crate::error::{Error, Result};
use crate::html;
use crate::xpath::{XPathContext, XPathObject, XPathValue};
use std::fmt;

/// Scalar result of [`Node::eval`]
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    Bool(bool),
    Double(f64),
    String(String),
}

/// A node of a borrowed document
#[derive(Clone, Copy)]
pub struct Node<'d> {
    doc: &'d Document,
    id: NodeId,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("name", &self.doc.node_name(self.id))
            .finish()
    }
}

impl Document {
    /// The root element
    pub fn root(&self) -> Result<Node<'_>> {
        let id = self.root_element().ok_or(Error::NoRoot)?;
        Ok(Node::new(self, id))
    }
}

impl<'d> Node<'d> {
    pub fn new(doc: &'d Document, id: NodeId) -> Self {
        Node { doc, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    pub fn kind(&self) -> Option<NodeKind> {
        self.doc.node_kind(self.id)
    }

    fn wrap(&self, id: Option<NodeId>) -> Option<Node<'d>> {
        id.map(|id| Node::new(self.doc, id))
    }

    // ----------------------------------------------------------------
    // Node info
    // ----------------------------------------------------------------

    /// Local name of an element, attribute or PI target; `None` otherwise
    pub fn tag(&self) -> Option<&'d str> {
        match self.kind()? {
            NodeKind::Element | NodeKind::Attribute | NodeKind::ProcessingInstruction => {
                self.doc.local_name(self.id)
            }
            _ => None,
        }
    }

    /// Text content: descendant text for elements, the value otherwise
    pub fn content(&self) -> Option<String> {
        self.kind()?;
        Some(self.doc.text_content(self.id))
    }

    /// Markup of the node itself, dumped as XML or HTML by document kind.
    /// Text nodes yield their unescaped content.
    pub fn raw_content(&self) -> Option<String> {
        match self.kind()? {
            NodeKind::Text | NodeKind::CData => self.content(),
            _ => Some(match self.doc.kind() {
                DocumentKind::Xml => dom::serialize_node(self.doc, self.id),
                DocumentKind::Html => html::serialize_node(self.doc, self.id),
            }),
        }
    }

    /// Markup of the children joined together, trimmed
    pub fn inner_raw_content(&self) -> Option<String> {
        self.kind()?;
        let joined: String = self
            .child_nodes()
            .iter()
            .filter_map(Node::raw_content)
            .collect();
        Some(joined.trim().to_string())
    }

    /// Attributes as (qualified name, value), namespace declarations excluded
    pub fn attributes(&self) -> Vec<(&'d str, &'d str)> {
        self.doc
            .attributes(self.id)
            .filter_map(|attr| Some((self.doc.node_name(attr)?, self.doc.node_value(attr).unwrap_or(""))))
            .collect()
    }

    /// Attribute value by name; a `prefix:local` name resolves the prefix
    /// against the namespaces in scope at this node
    pub fn value_for_attribute(&self, name: &str) -> Option<&'d str> {
        match name.split_once(':') {
            Some((prefix, local)) => {
                let uri = self.doc.lookup_namespace(self.id, Some(prefix))?;
                self.doc.attribute_value_ns(self.id, Some(uri), local)
            }
            None => self.doc.attribute_value(self.id, name),
        }
    }

    // ----------------------------------------------------------------
    // Hierarchy
    // ----------------------------------------------------------------

    pub fn parent(&self) -> Option<Node<'d>> {
        self.wrap(self.doc.parent(self.id))
    }

    /// Children, skipping blank text between elements
    pub fn child_nodes(&self) -> Vec<Node<'d>> {
        self.children().collect()
    }

    pub fn first_node(&self) -> Option<Node<'d>> {
        self.children().next()
    }

    pub fn child_node(&self, index: usize) -> Option<Node<'d>> {
        self.children().nth(index)
    }

    pub fn prev(&self) -> Option<Node<'d>> {
        let mut id = self.doc.prev_sibling(self.id);
        while let Some(sibling) = id.filter(|&s| is_ignorable_blank(self.doc, s)) {
            id = self.doc.prev_sibling(sibling);
        }
        self.wrap(id)
    }

    pub fn next(&self) -> Option<Node<'d>> {
        let mut id = self.doc.next_sibling(self.id);
        while let Some(sibling) = id.filter(|&s| is_ignorable_blank(self.doc, s)) {
            id = self.doc.next_sibling(sibling);
        }
        self.wrap(id)
    }

    fn children(&self) -> impl Iterator<Item = Node<'d>> + 'd {
        let doc = self.doc;
        doc.children(self.id)
            .filter(move |&id| !is_ignorable_blank(doc, id))
            .map(move |id| Node::new(doc, id))
    }

    // ----------------------------------------------------------------
    // XPath
    // ----------------------------------------------------------------

    fn context(&self) -> Result<XPathContext<'d>> {
        let mut ctx = XPathContext::new(self.doc);
        ctx.register_namespaces_from_document();
        ctx.set_default_element_namespace(self.doc.default_namespace());
        ctx.set_context_node(self.id)?;
        Ok(ctx)
    }

    fn query(&self, xpath: &str) -> Result<XPathObject<'d>> {
        self.context()?.eval(xpath)
    }

    /// Element nodes selected by `xpath`, evaluated with this node as the
    /// context node. Non-element results are dropped.
    pub fn select(&self, xpath: &str) -> Result<Vec<Node<'d>>> {
        let result = self.query(xpath)?;
        Ok(result
            .nodes()
            .iter()
            .filter(|&&id| self.doc.node_kind(id) == Some(NodeKind::Element))
            .map(|&id| Node::new(self.doc, id))
            .collect())
    }

    /// First element selected by `xpath`
    pub fn first(&self, xpath: &str) -> Result<Option<Node<'d>>> {
        Ok(self.select(xpath)?.into_iter().next())
    }

    /// Evaluate a scalar expression. Node-set results are an
    /// `Error::XPathType`; wrap them in `string()` or `count()`.
    pub fn eval(&self, expr: &str) -> Result<EvalResult> {
        match self.query(expr)?.into_value() {
            XPathValue::Boolean(b) => Ok(EvalResult::Bool(b)),
            XPathValue::Number(n) => Ok(EvalResult::Double(n)),
            XPathValue::String(s) => Ok(EvalResult::String(s)),
            XPathValue::NodeSet(_) => Err(Error::XPathType(format!("'{}' evaluates to a node-set", expr))),
        }
    }
}

/// Whitespace-only text whose siblings hold no other text: indentation
/// between elements, which navigation skips. Blank text that is the whole
/// content of an element, or part of mixed content, stays visible.
fn is_ignorable_blank(doc: &Document, id: NodeId) -> bool {
    if doc.node_kind(id) != Some(NodeKind::Text) || !is_blank_value(doc, id) {
        return false;
    }
    let Some(parent) = doc.parent(id) else {
        return false;
    };
    let mut has_siblings = false;
    for sibling in doc.children(parent).filter(|&s| s != id) {
        has_siblings = true;
        let is_text = matches!(doc.node_kind(sibling), Some(NodeKind::Text | NodeKind::CData));
        if is_text && !is_blank_value(doc, sibling) {
            return false;
        }
    }
    has_siblings
}

fn is_blank_value(doc: &Document, id: NodeId) -> bool {
    is_blank(doc.node_value(id).unwrap_or("").as_bytes())
}
