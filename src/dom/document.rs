//! Document - Arena-based tree for XML and HTML
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes (attributes included)
//! - NodeId indices for traversal, assigned in document order
//! - String interning for names and namespace URIs
//! - Namespace declarations kept per element for serialization and lookup

use super::builder::TreeBuilder;
use super::node::{NamespaceDecl, NodeId, NodeKind, XmlNode, DOCUMENT_NODE};
use super::strings::StringPool;
use super::DocumentAccess;
use crate::config::ParseOptions;
use crate::core::attributes::parse_attributes;
use crate::core::encoding::{decode_input, pseudo_attribute};
use crate::core::entities::{decode_text, decode_text_strict};
use crate::core::scanner::is_blank;
use crate::core::tokenizer::{Dialect, TokenKind, Tokenizer};
use crate::error::{Error, Result};
use log::debug;

/// Markup language a document was parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Xml,
    Html,
}

/// A parsed document stored in arena format
///
/// Owns all of its data, so it is `Send + Sync` and can be queried from
/// several threads at once.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) kind: DocumentKind,
    /// Arena of nodes; index 0 is the document node
    pub(crate) nodes: Vec<XmlNode>,
    /// Interned strings
    pub(crate) strings: StringPool,
    /// Namespace declarations, sliced per element by `ns_start`/`ns_count`
    pub(crate) ns_decls: Vec<NamespaceDecl>,
    /// Root element node ID (not document node)
    pub(crate) root_element: Option<NodeId>,
    /// Prefix bindings registered by the caller as (prefix, uri)
    registered: Vec<(String, String)>,
    pub(crate) version: Option<String>,
    pub(crate) encoding: Option<String>,
    pub(crate) doctype: Option<String>,
}

impl Document {
    /// Document holding only the document node
    pub(crate) fn empty(kind: DocumentKind) -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(XmlNode::document());
        Document {
            kind,
            nodes,
            strings: StringPool::new(),
            ns_decls: Vec::new(),
            root_element: None,
            registered: Vec::new(),
            version: None,
            encoding: None,
            doctype: None,
        }
    }

    /// Parse an XML document in strict mode
    pub fn parse(input: &[u8]) -> Result<Self> {
        Self::parse_with_options(input, &ParseOptions::default())
    }

    pub fn parse_str(input: &str) -> Result<Self> {
        Self::parse(input.as_bytes())
    }

    /// Parse an XML document
    ///
    /// Strict mode (the default) rejects documents that are not well-formed
    /// with `Error::Parse`; `recover` closes unbalanced elements and skips
    /// garbage instead. Empty input is `Error::InvalidSourceData` and a
    /// document without an element is `Error::NoRoot`.
    pub fn parse_with_options(input: &[u8], options: &ParseOptions) -> Result<Self> {
        if is_blank(input) {
            return Err(Error::InvalidSourceData);
        }
        let source = decode_input(input, options.encoding.as_deref(), Dialect::Xml, options.recover)?;
        let strict = !options.recover;

        let mut builder = TreeBuilder::new(DocumentKind::Xml, options.no_blanks);
        let mut tokenizer = Tokenizer::new(&source, Dialect::Xml, strict);

        loop {
            let token = tokenizer.next_token()?;
            match token.kind {
                TokenKind::Eof => break,

                TokenKind::XmlDeclaration => {
                    let decl = token.content_str().as_bytes();
                    builder.set_declaration(pseudo_attribute(decl, b"version"), pseudo_attribute(decl, b"encoding"));
                }

                TokenKind::DocType => {
                    if strict && builder.has_root() {
                        return Err(Error::parse("DOCTYPE must come before the root element", token.span.0));
                    }
                    builder.set_doctype(token.content_str());
                }

                TokenKind::StartTag | TokenKind::EmptyTag => {
                    let name = token.name_str();
                    if strict && builder.depth() == 0 && builder.has_root() {
                        return Err(Error::parse("extra content at the end of the document", token.span.0));
                    }
                    let attrs = parse_attributes(token.content_str(), token.span.0 + 1 + name.len(), Dialect::Xml, strict)?;
                    let self_closed = token.kind == TokenKind::EmptyTag;
                    builder.open_element(name, &attrs, self_closed);
                    if self_closed {
                        builder.close_element();
                    }
                }

                TokenKind::EndTag => {
                    let name = token.name_str();
                    if builder.current_name() == Some(name) {
                        builder.close_element();
                    } else if strict {
                        let message = match builder.current_name() {
                            Some(open) => format!("opening and ending tag mismatch: {} and {}", open, name),
                            None => format!("unexpected end tag </{}>", name),
                        };
                        return Err(Error::parse(message, token.span.0));
                    } else if !builder.close_until(name) {
                        debug!("ignoring stray end tag </{}>", name);
                    }
                }

                TokenKind::Text => {
                    let raw = token.content_str();
                    if builder.depth() == 0 {
                        if strict && !is_blank(raw.as_bytes()) {
                            return Err(Error::parse("content is not allowed outside the root element", token.span.0));
                        }
                        continue;
                    }
                    let before_end_tag = source[token.span.1..].starts_with("</");
                    let text = if strict {
                        decode_text_strict(raw, token.span.0)?
                    } else {
                        decode_text(raw, Dialect::Xml)
                    };
                    builder.append_text(&text, before_end_tag);
                }

                TokenKind::CData => {
                    if builder.depth() == 0 {
                        if strict {
                            return Err(Error::parse("CDATA section outside the root element", token.span.0));
                        }
                        continue;
                    }
                    builder.append_cdata(token.content_str());
                }

                TokenKind::Comment => builder.append_comment(token.content_str()),

                TokenKind::ProcessingInstruction => builder.append_pi(token.name_str(), token.content_str()),
            }
        }

        if strict {
            if let Some(open) = builder.current_name() {
                return Err(Error::parse(format!("premature end of data in tag {}", open), source.len()));
            }
        }
        builder.finish()
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn is_html(&self) -> bool {
        self.kind == DocumentKind::Html
    }

    /// The document node (always 0)
    pub fn document_node(&self) -> NodeId {
        DOCUMENT_NODE
    }

    /// Root element node ID
    pub fn root_element(&self) -> Option<NodeId> {
        self.root_element
    }

    /// Number of nodes, attribute nodes and the document node included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Version from the XML declaration
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Encoding named by the XML declaration
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Body of the DOCTYPE declaration, without `<!DOCTYPE` and `>`
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    pub fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    /// Qualified name of an element or attribute, target of a PI
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.name_of(id)
    }

    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.local_name_of(id)
    }

    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        (node.prefix_id != 0).then(|| self.strings.get(node.prefix_id))
    }

    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        self.namespace_uri_of(id)
    }

    /// Raw value of a text, CDATA, comment, PI or attribute node
    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        self.value_of(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent_of(id)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.first_child_of(id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.next_sibling_of(id)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.prev_sibling_of(id)
    }

    /// Iterate over children
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        ChildIter {
            doc: self,
            current: self.first_child_of(id),
        }
    }

    /// Iterate over descendants in document order (attributes excluded)
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        if let Some(first) = self.first_child_of(id) {
            stack.push(first);
        }
        DescendantIter { doc: self, stack }
    }

    /// Attribute node IDs of an element
    pub fn attributes(&self, id: NodeId) -> std::ops::Range<NodeId> {
        self.attribute_ids(id)
    }

    /// Attribute value by qualified name as written
    pub fn attribute_value(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .find(|&attr| self.name_of(attr) == Some(name))
            .and_then(|attr| self.value_of(attr))
    }

    /// Attribute value by namespace URI and local name. `None` matches
    /// attributes without a namespace.
    pub fn attribute_value_ns(&self, id: NodeId, namespace_uri: Option<&str>, local: &str) -> Option<&str> {
        self.attributes(id)
            .find(|&attr| self.local_name_of(attr) == Some(local) && self.namespace_uri_of(attr) == namespace_uri)
            .and_then(|attr| self.value_of(attr))
    }

    /// String value: concatenated descendant text for elements and the
    /// document, the raw value otherwise
    pub fn text_content(&self, id: NodeId) -> String {
        self.string_value_of(id)
    }

    /// Namespace declarations carried by one element as (prefix, uri)
    pub fn namespace_declarations(&self, id: NodeId) -> Vec<(Option<&str>, &str)> {
        let Some(node) = self.get_node(id) else {
            return Vec::new();
        };
        let start = node.ns_start as usize;
        let end = start + node.ns_count as usize;
        self.ns_decls[start..end].iter().map(|decl| self.decl_pair(decl)).collect()
    }

    /// Every namespace declaration in the document, in document order
    pub fn declared_namespaces(&self) -> Vec<(Option<&str>, &str)> {
        self.ns_decls.iter().map(|decl| self.decl_pair(decl)).collect()
    }

    fn decl_pair(&self, decl: &NamespaceDecl) -> (Option<&str>, &str) {
        let prefix = (decl.prefix_id != 0).then(|| self.strings.get(decl.prefix_id));
        (prefix, self.strings.get(decl.uri_id))
    }

    /// Default namespace declared on the root element
    pub fn default_namespace(&self) -> Option<&str> {
        let root = self.root_element?;
        self.namespace_declarations(root)
            .into_iter()
            .find(|(prefix, uri)| prefix.is_none() && !uri.is_empty())
            .map(|(_, uri)| uri)
    }

    /// Resolve a prefix (None for the default namespace) in scope at a node
    pub fn lookup_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(super::namespace::ns::XML);
        }
        let mut current = Some(id);
        while let Some(node_id) = current {
            let found = self
                .namespace_declarations(node_id)
                .into_iter()
                .find(|(p, _)| *p == prefix)
                .map(|(_, uri)| uri);
            if let Some(uri) = found {
                return (!uri.is_empty()).then_some(uri);
            }
            current = self.parent_of(node_id);
        }
        None
    }

    /// Register a prefix for queries made through `Node`. Registering an
    /// existing prefix replaces its URI.
    pub fn register_namespace(&mut self, uri: &str, prefix: &str) {
        match self.registered.iter_mut().find(|(p, _)| p == prefix) {
            Some(entry) => entry.1 = uri.to_string(),
            None => self.registered.push((prefix.to_string(), uri.to_string())),
        }
    }

    /// Registered bindings as (prefix, uri)
    pub fn registered_namespaces(&self) -> &[(String, String)] {
        &self.registered
    }
}

impl DocumentAccess for Document {
    fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    fn strings(&self) -> &StringPool {
        &self.strings
    }

    fn is_html_document(&self) -> bool {
        self.kind == DocumentKind::Html
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d Document,
    current: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.doc.next_sibling_of(id);
        Some(id)
    }
}

/// Pre-order iterator over descendant nodes
pub struct DescendantIter<'d> {
    doc: &'d Document,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        if let Some(next) = self.doc.next_sibling_of(id) {
            self.stack.push(next);
        }
        if let Some(child) = self.doc.first_child_of(id) {
            self.stack.push(child);
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let doc = Document::parse_str("<root><child/></root>").unwrap();
        assert_eq!(doc.kind(), DocumentKind::Xml);
        let root = doc.root_element().unwrap();
        assert_eq!(doc.node_name(root), Some("root"));
        assert_eq!(doc.node_count(), 3);
    }

    #[test]
    fn test_document_order_ids() {
        let doc = Document::parse_str(r#"<a x="1"><b y="2">t</b><c/></a>"#).unwrap();
        let names: Vec<_> = (0..doc.node_count() as NodeId)
            .map(|id| (doc.node_kind(id).unwrap(), doc.node_name(id).unwrap_or("#")))
            .collect();
        assert_eq!(
            names,
            vec![
                (NodeKind::Document, "#"),
                (NodeKind::Element, "a"),
                (NodeKind::Attribute, "x"),
                (NodeKind::Element, "b"),
                (NodeKind::Attribute, "y"),
                (NodeKind::Text, "#"),
                (NodeKind::Element, "c"),
            ]
        );
    }

    #[test]
    fn test_children_and_siblings() {
        let doc = Document::parse_str("<note><to>T</to><from>F</from><heading>H</heading><body>B</body></note>").unwrap();
        let root = doc.root_element().unwrap();
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 4);
        assert_eq!(doc.first_child(root), Some(children[0]));
        assert_eq!(doc.next_sibling(children[0]), Some(children[1]));
        assert_eq!(doc.prev_sibling(children[1]), Some(children[0]));
        assert_eq!(doc.prev_sibling(children[0]), None);
        assert_eq!(doc.parent(children[3]), Some(root));
        assert_eq!(doc.text_content(root), "TFHB");
    }

    #[test]
    fn test_descendants() {
        let doc = Document::parse_str("<a><b><c/></b><d/></a>").unwrap();
        let root = doc.root_element().unwrap();
        let names: Vec<_> = doc.descendants(root).filter_map(|id| doc.node_name(id)).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_namespaces_resolved() {
        let doc = Document::parse_str(r#"<r xmlns="urn:a" xmlns:b="urn:b"><b:x b:at="1" plain="2"/><y/></r>"#).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.namespace_uri(root), Some("urn:a"));
        let x = doc.first_child(root).unwrap();
        assert_eq!(doc.prefix(x), Some("b"));
        assert_eq!(doc.local_name(x), Some("x"));
        assert_eq!(doc.namespace_uri(x), Some("urn:b"));

        let attrs: Vec<_> = doc.attributes(x).collect();
        assert_eq!(doc.namespace_uri(attrs[0]), Some("urn:b"));
        // unprefixed attributes are in no namespace
        assert_eq!(doc.namespace_uri(attrs[1]), None);
        assert_eq!(doc.attribute_value_ns(x, Some("urn:b"), "at"), Some("1"));
        assert_eq!(doc.attribute_value(x, "b:at"), Some("1"));

        let y = doc.next_sibling(x).unwrap();
        assert_eq!(doc.namespace_uri(y), Some("urn:a"));
        assert_eq!(doc.default_namespace(), Some("urn:a"));
        assert_eq!(doc.declared_namespaces(), vec![(None, "urn:a"), (Some("b"), "urn:b")]);
        assert_eq!(doc.lookup_namespace(y, Some("b")), Some("urn:b"));
    }

    #[test]
    fn test_namespace_decls_are_not_attributes() {
        let doc = Document::parse_str(r#"<r xmlns:p="urn:p" id="1"/>"#).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.attributes(root).len(), 1);
    }

    #[test]
    fn test_declaration_and_doctype() {
        let doc = Document::parse_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE note>\n<note/>").unwrap();
        assert_eq!(doc.version(), Some("1.0"));
        assert_eq!(doc.encoding(), Some("UTF-8"));
        assert_eq!(doc.doctype(), Some("note"));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(Document::parse(b""), Err(Error::InvalidSourceData)));
        assert!(matches!(Document::parse(b"  \n"), Err(Error::InvalidSourceData)));
    }

    #[test]
    fn test_no_root() {
        assert!(matches!(Document::parse_str("<!-- nothing -->"), Err(Error::NoRoot)));
    }

    #[test]
    fn test_strict_mismatch() {
        let err = Document::parse_str("<a><b></a>").unwrap_err();
        assert!(matches!(err, Error::Parse { position: 6, .. }));
    }

    #[test]
    fn test_strict_unclosed() {
        assert!(matches!(Document::parse_str("<a><b></b>"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_strict_multiple_roots() {
        assert!(Document::parse_str("<a/><b/>").is_err());
        assert!(Document::parse_str("<a/>text").is_err());
    }

    #[test]
    fn test_strict_rejects_malformed_text() {
        assert!(matches!(Document::parse_str("<a>&bogus;</a>"), Err(Error::Parse { position: 3, .. })));
        assert!(matches!(Document::parse_str("<a>a & b</a>"), Err(Error::Parse { position: 5, .. })));
        assert!(matches!(Document::parse_str("<a>x\u{0}</a>"), Err(Error::Parse { position: 4, .. })));
        assert!(matches!(Document::parse_str("<a>&#1;</a>"), Err(Error::Parse { .. })));
        assert!(matches!(Document::parse_str("<a b=\"&bogus;\"/>"), Err(Error::Parse { position: 6, .. })));
    }

    #[test]
    fn test_recover_keeps_malformed_text() {
        let options = ParseOptions::new().with_recover(true);
        let doc = Document::parse_with_options(b"<a t=\"&bogus;\">&bogus; a & b</a>", &options).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.text_content(root), "&bogus; a & b");
        assert_eq!(doc.attribute_value(root, "t"), Some("&bogus;"));
    }

    #[test]
    fn test_recover_mode() {
        let options = ParseOptions::new().with_recover(true);
        let doc = Document::parse_with_options(b"<a><b>text</a>", &options).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.text_content(root), "text");

        let doc = Document::parse_with_options(b"<a>x</c>y</a>", &options).unwrap();
        assert_eq!(doc.text_content(doc.root_element().unwrap()), "xy");
    }

    #[test]
    fn test_no_blanks() {
        let input = b"<r>\n  <a> </a>\n  <b>x <i>y</i> z</b>\n</r>";
        let doc = Document::parse_with_options(input, &ParseOptions::new().with_no_blanks(true)).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.children(root).count(), 2);

        let doc = Document::parse(input).unwrap();
        assert_eq!(doc.children(doc.root_element().unwrap()).count(), 5);
    }

    #[test]
    fn test_entities_and_cdata() {
        let doc = Document::parse_str("<r>a &amp; b<![CDATA[<raw>]]></r>").unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.text_content(root), "a & b<raw>");
        let kinds: Vec<_> = doc.children(root).filter_map(|id| doc.node_kind(id)).collect();
        assert_eq!(kinds, vec![NodeKind::Text, NodeKind::CData]);
    }

    #[test]
    fn test_register_namespace() {
        let mut doc = Document::parse_str("<r/>").unwrap();
        doc.register_namespace("urn:one", "p");
        doc.register_namespace("urn:two", "p");
        doc.register_namespace("urn:q", "q");
        assert_eq!(
            doc.registered_namespaces(),
            &[("p".to_string(), "urn:two".to_string()), ("q".to_string(), "urn:q".to_string())]
        );
    }

    #[test]
    fn test_processing_instruction() {
        let doc = Document::parse_str("<?style href=\"a.css\"?><r/>").unwrap();
        let pi = doc.first_child(DOCUMENT_NODE).unwrap();
        assert_eq!(doc.node_kind(pi), Some(NodeKind::ProcessingInstruction));
        assert_eq!(doc.node_name(pi), Some("style"));
        assert_eq!(doc.node_value(pi), Some("href=\"a.css\""));
    }
}
