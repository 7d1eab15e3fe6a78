//! Streaming XML Reader
//!
//! A pull reader in the style of libxml2's `xmlTextReader`: each `read()`
//! advances to the next node and the accessors describe it. No tree is built;
//! only the stack of open element names and their namespace scopes is kept.
//!
//! ```
//! use xpaver::reader::{XmlNodeType, XmlReader};
//!
//! let mut reader = XmlReader::from_str("<a><b/></a>").unwrap();
//! let mut names = Vec::new();
//! while reader.read().unwrap() {
//!     names.push(reader.name().to_string());
//! }
//! assert_eq!(names, ["a", "b", "a"]);
//! assert_eq!(reader.node_type(), XmlNodeType::EndDocument);
//! ```

pub mod events;

pub use events::{ReaderAttribute, XmlNodeType};

use crate::config::ReaderOptions;
use crate::core::attributes::{parse_attributes, split_qname};
use crate::core::encoding::decode_input;
use crate::core::entities::{decode_text, decode_text_strict};
use crate::core::scanner::is_blank;
use crate::core::tokenizer::{Dialect, TokenKind, Tokenizer};
use crate::dom::namespace::{ns, NamespaceResolver};
use crate::dom::StringPool;
use crate::error::{Error, Result};
use log::{debug, trace, warn};
use std::io::Read;

/// Token copied out of the source so the reader can update itself
struct RawToken {
    kind: TokenKind,
    start: usize,
    name: String,
    content: String,
}

/// The node the reader is positioned on
#[derive(Debug, Clone, Default)]
struct CurrentNode {
    node_type: XmlNodeType,
    name: String,
    prefix: Option<String>,
    local_name: String,
    namespace_uri: Option<String>,
    value: Option<String>,
    depth: usize,
    is_empty_element: bool,
    attributes: Vec<ReaderAttribute>,
}

/// Pull reader over an owned, decoded input buffer
pub struct XmlReader {
    source: String,
    pos: usize,
    options: ReaderOptions,
    strings: StringPool,
    resolver: NamespaceResolver,
    open: Vec<String>,
    current: CurrentNode,
    /// The last element was self-closing; its scope goes on the next read
    pending_pop: bool,
    seen_root: bool,
    finished: bool,
    closed: bool,
}

impl XmlReader {
    /// Reader over raw bytes; the encoding is detected from the BOM or the
    /// XML declaration unless `options.encoding` forces one
    pub fn from_bytes(input: &[u8], options: ReaderOptions) -> Result<Self> {
        let source = decode_input(input, options.encoding.as_deref(), Dialect::Xml, options.recover)?;
        let mut strings = StringPool::new();
        let resolver = NamespaceResolver::new(&mut strings);
        debug!("XmlReader opened over {} bytes", source.len());
        Ok(XmlReader {
            source,
            pos: 0,
            options,
            strings,
            resolver,
            open: Vec::new(),
            current: CurrentNode::default(),
            pending_pop: false,
            seen_root: false,
            finished: false,
            closed: false,
        })
    }

    /// Reader over everything `input` yields
    pub fn from_read<R: Read>(mut input: R, options: ReaderOptions) -> Result<Self> {
        let mut buf = Vec::new();
        input.read_to_end(&mut buf)?;
        Self::from_bytes(&buf, options)
    }

    /// Reader over a string with default options
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &str) -> Result<Self> {
        Self::from_bytes(input.as_bytes(), ReaderOptions::default())
    }

    fn strict(&self) -> bool {
        !self.options.recover
    }

    /// Advance to the next node. Returns false once the input is exhausted,
    /// after which the reader sits on `EndDocument`.
    pub fn read(&mut self) -> Result<bool> {
        if self.closed {
            return Err(Error::ReaderClosed);
        }
        if self.finished {
            return Ok(false);
        }
        if self.pending_pop {
            self.resolver.pop_scope();
            self.pending_pop = false;
        }

        loop {
            let token = self.next_raw()?;
            trace!("reader token {:?} at {}", token.kind, token.start);
            match token.kind {
                TokenKind::Eof => return self.finish(),

                TokenKind::XmlDeclaration => {
                    self.set_simple(XmlNodeType::XmlDeclaration, "xml", Some(token.content));
                    return Ok(true);
                }

                TokenKind::DocType => {
                    if self.strict() && self.seen_root {
                        return Err(Error::parse("DOCTYPE must come before the root element", token.start));
                    }
                    let name = token.content.split_whitespace().next().unwrap_or("").to_string();
                    self.set_simple(XmlNodeType::DocumentType, &name, None);
                    return Ok(true);
                }

                TokenKind::StartTag | TokenKind::EmptyTag => {
                    if self.strict() && self.open.is_empty() && self.seen_root {
                        return Err(Error::parse("extra content at the end of the document", token.start));
                    }
                    self.start_element(&token, token.kind == TokenKind::EmptyTag)?;
                    return Ok(true);
                }

                TokenKind::EndTag => {
                    if self.end_element(&token)? {
                        return Ok(true);
                    }
                }

                TokenKind::Text => {
                    let blank = is_blank(token.content.as_bytes());
                    if self.open.is_empty() {
                        if self.strict() && !blank {
                            return Err(Error::parse("content is not allowed outside the root element", token.start));
                        }
                        continue;
                    }
                    if blank {
                        if self.options.no_blanks {
                            continue;
                        }
                        self.set_simple(XmlNodeType::Whitespace, "#text", Some(token.content));
                    } else {
                        let text = if self.strict() {
                            decode_text_strict(&token.content, token.start)?.into_owned()
                        } else {
                            decode_text(&token.content, Dialect::Xml).into_owned()
                        };
                        self.set_simple(XmlNodeType::Text, "#text", Some(text));
                    }
                    return Ok(true);
                }

                TokenKind::CData => {
                    if self.open.is_empty() {
                        if self.strict() {
                            return Err(Error::parse("CDATA section outside the root element", token.start));
                        }
                        continue;
                    }
                    self.set_simple(XmlNodeType::CData, "#cdata-section", Some(token.content));
                    return Ok(true);
                }

                TokenKind::Comment => {
                    self.set_simple(XmlNodeType::Comment, "#comment", Some(token.content));
                    return Ok(true);
                }

                TokenKind::ProcessingInstruction => {
                    let target = token.name;
                    self.set_simple(XmlNodeType::ProcessingInstruction, &target, Some(token.content));
                    return Ok(true);
                }
            }
        }
    }

    fn next_raw(&mut self) -> Result<RawToken> {
        let mut tokenizer = Tokenizer::at(&self.source, self.pos, Dialect::Xml, self.strict());
        let token = tokenizer.next_token()?;
        self.pos = tokenizer.position();
        Ok(RawToken {
            kind: token.kind,
            start: token.span.0,
            name: token.name_str().to_string(),
            content: token.content_str().to_string(),
        })
    }

    fn finish(&mut self) -> Result<bool> {
        if self.strict() {
            if let Some(open) = self.open.last() {
                return Err(Error::parse(format!("premature end of data in tag {}", open), self.source.len()));
            }
            if !self.seen_root {
                return Err(Error::NoRoot);
            }
        }
        self.finished = true;
        self.current = CurrentNode {
            node_type: XmlNodeType::EndDocument,
            ..CurrentNode::default()
        };
        debug!("XmlReader reached end of input");
        Ok(false)
    }

    fn set_simple(&mut self, node_type: XmlNodeType, name: &str, value: Option<String>) {
        self.current = CurrentNode {
            node_type,
            name: name.to_string(),
            prefix: None,
            local_name: name.to_string(),
            namespace_uri: None,
            value,
            depth: self.open.len(),
            is_empty_element: false,
            attributes: Vec::new(),
        };
    }

    fn start_element(&mut self, token: &RawToken, self_closed: bool) -> Result<()> {
        let offset = token.start + 1 + token.name.len();
        let attrs = parse_attributes(&token.content, offset, Dialect::Xml, self.strict())?;

        self.resolver.push_scope();
        for attr in attrs.iter().filter(|a| a.is_namespace_decl()) {
            let prefix_id = match attr.name.strip_prefix("xmlns:") {
                Some(prefix) => self.strings.intern(prefix),
                None => 0,
            };
            let uri_id = self.strings.intern(&attr.value);
            if prefix_id != 0 && uri_id == 0 {
                warn!("empty namespace URI for prefix '{}' on <{}>", &attr.name[6..], token.name);
                continue;
            }
            self.resolver.declare(prefix_id, uri_id);
        }

        let attributes = attrs
            .iter()
            .map(|attr| {
                let (prefix, local) = split_qname(attr.name);
                let namespace_uri = if attr.is_namespace_decl() {
                    Some(ns::XMLNS.to_string())
                } else {
                    prefix.and_then(|p| self.resolve_prefix(p))
                };
                ReaderAttribute {
                    name: attr.name.to_string(),
                    prefix: prefix.map(str::to_string),
                    local_name: local.to_string(),
                    namespace_uri,
                    value: attr.value.to_string(),
                }
            })
            .collect();

        let (prefix, local) = split_qname(&token.name);
        let namespace_uri = match prefix {
            Some(p) => {
                let uri = self.resolve_prefix(p);
                if uri.is_none() {
                    warn!("namespace prefix '{}' on <{}> is not defined", p, token.name);
                }
                uri
            }
            None => self.default_namespace(),
        };

        self.current = CurrentNode {
            node_type: XmlNodeType::Element,
            name: token.name.clone(),
            prefix: prefix.map(str::to_string),
            local_name: local.to_string(),
            namespace_uri,
            value: None,
            depth: self.open.len(),
            is_empty_element: self_closed,
            attributes,
        };
        self.seen_root = true;
        if self_closed {
            self.pending_pop = true;
        } else {
            self.open.push(token.name.clone());
        }
        Ok(())
    }

    /// Returns false when a stray end tag was skipped in recover mode
    fn end_element(&mut self, token: &RawToken) -> Result<bool> {
        let name = token.name.as_str();
        if self.open.last().map(String::as_str) != Some(name) {
            if self.strict() {
                let message = match self.open.last() {
                    Some(open) => format!("opening and ending tag mismatch: {} and {}", open, name),
                    None => format!("unexpected end tag </{}>", name),
                };
                return Err(Error::parse(message, token.start));
            }
            match self.open.iter().rposition(|open| open == name) {
                Some(index) => {
                    // Implicitly close everything opened inside it
                    while self.open.len() > index + 1 {
                        self.open.pop();
                        self.resolver.pop_scope();
                    }
                }
                None => {
                    debug!("ignoring stray end tag </{}>", name);
                    return Ok(false);
                }
            }
        }

        let (prefix, local) = split_qname(name);
        let namespace_uri = match prefix {
            Some(p) => self.resolve_prefix(p),
            None => self.default_namespace(),
        };
        self.open.pop();
        self.resolver.pop_scope();
        self.current = CurrentNode {
            node_type: XmlNodeType::EndElement,
            name: name.to_string(),
            prefix: prefix.map(str::to_string),
            local_name: local.to_string(),
            namespace_uri,
            value: None,
            depth: self.open.len(),
            is_empty_element: false,
            attributes: Vec::new(),
        };
        Ok(true)
    }

    fn resolve_prefix(&self, prefix: &str) -> Option<String> {
        let prefix_id = self.strings.lookup(prefix)?;
        let uri_id = self.resolver.resolve(prefix_id)?;
        (uri_id != 0).then(|| self.strings.get(uri_id).to_string())
    }

    fn default_namespace(&self) -> Option<String> {
        match self.resolver.resolve_default() {
            0 => None,
            uri_id => Some(self.strings.get(uri_id).to_string()),
        }
    }

    /// Release the input buffer; later reads fail with `Error::ReaderClosed`
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.source = String::new();
        self.open.clear();
        self.current = CurrentNode::default();
        debug!("XmlReader closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn node_type(&self) -> XmlNodeType {
        self.current.node_type
    }

    /// Qualified name; `#text`, `#comment` and similar for unnamed nodes
    pub fn name(&self) -> &str {
        &self.current.name
    }

    pub fn local_name(&self) -> &str {
        &self.current.local_name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.current.prefix.as_deref()
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        self.current.namespace_uri.as_deref()
    }

    /// Text of text-like nodes: decoded text, comment body, PI data
    pub fn value(&self) -> Option<&str> {
        self.current.value.as_deref()
    }

    pub fn has_value(&self) -> bool {
        self.current.node_type.has_value()
    }

    /// Nesting depth; the root element is at 0
    pub fn depth(&self) -> usize {
        self.current.depth
    }

    /// Whether the current element was written self-closing. Such elements
    /// produce no `EndElement`.
    pub fn is_empty_element(&self) -> bool {
        self.current.is_empty_element
    }

    pub fn attribute_count(&self) -> usize {
        self.current.attributes.len()
    }

    /// Attribute value by qualified name
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.current
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Attribute value by local name and namespace URI
    pub fn get_attribute_ns(&self, local_name: &str, namespace_uri: &str) -> Option<&str> {
        self.current
            .attributes
            .iter()
            .find(|a| a.local_name == local_name && a.namespace_uri.as_deref() == Some(namespace_uri))
            .map(|a| a.value.as_str())
    }

    pub fn attributes(&self) -> &[ReaderAttribute] {
        &self.current.attributes
    }
}

impl Drop for XmlReader {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str, options: ReaderOptions) -> Vec<(XmlNodeType, String, usize)> {
        let mut reader = XmlReader::from_bytes(input.as_bytes(), options).unwrap();
        let mut out = Vec::new();
        while reader.read().unwrap() {
            out.push((reader.node_type(), reader.name().to_string(), reader.depth()));
        }
        out
    }

    #[test]
    fn test_self_closing_child() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut reader = XmlReader::from_str("<a><b/></a>").unwrap();

        assert!(reader.read().unwrap());
        assert_eq!((reader.node_type(), reader.name()), (XmlNodeType::Element, "a"));
        assert!(!reader.is_empty_element());

        assert!(reader.read().unwrap());
        assert_eq!((reader.node_type(), reader.name()), (XmlNodeType::Element, "b"));
        assert!(reader.is_empty_element());
        assert_eq!(reader.depth(), 1);

        assert!(reader.read().unwrap());
        assert_eq!((reader.node_type(), reader.name()), (XmlNodeType::EndElement, "a"));
        assert_eq!(reader.depth(), 0);

        assert!(!reader.read().unwrap());
        assert_eq!(reader.node_type(), XmlNodeType::EndDocument);
        assert!(!reader.read().unwrap());
    }

    #[test]
    fn test_text_and_whitespace() {
        let nodes = collect("<r>\n  <x>a &amp; b</x>\n</r>", ReaderOptions::default());
        let types: Vec<XmlNodeType> = nodes.iter().map(|n| n.0).collect();
        assert_eq!(
            types,
            vec![
                XmlNodeType::Element,
                XmlNodeType::Whitespace,
                XmlNodeType::Element,
                XmlNodeType::Text,
                XmlNodeType::EndElement,
                XmlNodeType::Whitespace,
                XmlNodeType::EndElement,
            ]
        );
        assert_eq!(nodes[3].2, 2);

        let mut reader = XmlReader::from_str("<x>a &amp; b</x>").unwrap();
        reader.read().unwrap();
        reader.read().unwrap();
        assert_eq!(reader.value(), Some("a & b"));
        assert!(reader.has_value());
    }

    #[test]
    fn test_no_blanks_skips_whitespace() {
        let nodes = collect("<r>\n  <x/>\n</r>", ReaderOptions::new().with_no_blanks(true));
        let names: Vec<&str> = nodes.iter().map(|n| n.1.as_str()).collect();
        assert_eq!(names, vec!["r", "x", "r"]);
    }

    #[test]
    fn test_other_node_types() {
        let input = "<?xml version=\"1.0\"?><!DOCTYPE r><r><!--c--><?pi data?><![CDATA[<raw>]]></r>";
        let mut reader = XmlReader::from_str(input).unwrap();
        let mut seen = Vec::new();
        while reader.read().unwrap() {
            seen.push((reader.node_type(), reader.value().map(str::to_string)));
        }
        assert_eq!(seen[0].0, XmlNodeType::XmlDeclaration);
        assert_eq!(seen[1].0, XmlNodeType::DocumentType);
        assert_eq!(seen[3], (XmlNodeType::Comment, Some("c".to_string())));
        assert_eq!(seen[4].0, XmlNodeType::ProcessingInstruction);
        assert_eq!(seen[5], (XmlNodeType::CData, Some("<raw>".to_string())));
    }

    #[test]
    fn test_namespaces_and_attributes() {
        let input = r#"<r xmlns="urn:d" xmlns:p="urn:p"><p:e p:k="1" plain="2"/></r>"#;
        let mut reader = XmlReader::from_str(input).unwrap();

        reader.read().unwrap();
        assert_eq!(reader.namespace_uri(), Some("urn:d"));
        assert_eq!(reader.attribute_count(), 2);
        assert_eq!(reader.get_attribute_ns("p", ns::XMLNS), Some("urn:p"));

        reader.read().unwrap();
        assert_eq!(reader.local_name(), "e");
        assert_eq!(reader.prefix(), Some("p"));
        assert_eq!(reader.namespace_uri(), Some("urn:p"));
        assert_eq!(reader.get_attribute("p:k"), Some("1"));
        assert_eq!(reader.get_attribute_ns("k", "urn:p"), Some("1"));
        assert_eq!(reader.get_attribute("plain"), Some("2"));
        // Unprefixed attributes are in no namespace
        assert_eq!(reader.attributes()[1].namespace_uri, None);

        reader.read().unwrap();
        assert_eq!(reader.node_type(), XmlNodeType::EndElement);
        assert_eq!(reader.namespace_uri(), Some("urn:d"));
    }

    #[test]
    fn test_scopes_end_with_element() {
        let mut reader = XmlReader::from_str(r#"<r><a xmlns="urn:a"/><b/></r>"#).unwrap();
        reader.read().unwrap();
        reader.read().unwrap();
        assert_eq!(reader.namespace_uri(), Some("urn:a"));
        reader.read().unwrap();
        assert_eq!(reader.name(), "b");
        assert_eq!(reader.namespace_uri(), None);
    }

    #[test]
    fn test_strict_errors() {
        let mut reader = XmlReader::from_str("<a><b></a>").unwrap();
        reader.read().unwrap();
        reader.read().unwrap();
        assert!(matches!(reader.read(), Err(Error::Parse { .. })));

        let mut reader = XmlReader::from_str("<a>").unwrap();
        reader.read().unwrap();
        assert!(matches!(reader.read(), Err(Error::Parse { .. })));

        let mut reader = XmlReader::from_str("").unwrap();
        assert!(matches!(reader.read(), Err(Error::NoRoot)));
    }

    #[test]
    fn test_strict_rejects_malformed_text() {
        let mut reader = XmlReader::from_str("<a>&bogus;</a>").unwrap();
        assert!(reader.read().unwrap());
        assert!(matches!(reader.read(), Err(Error::Parse { position: 3, .. })));

        let mut reader = XmlReader::from_str("<a>x\u{0}</a>").unwrap();
        reader.read().unwrap();
        assert!(matches!(reader.read(), Err(Error::Parse { position: 4, .. })));

        let mut reader = XmlReader::from_str("<a b='Q&A'/>").unwrap();
        assert!(matches!(reader.read(), Err(Error::Parse { .. })));

        let options = ReaderOptions::new().with_recover(true);
        let mut reader = XmlReader::from_bytes(b"<a>&bogus; & more</a>", options).unwrap();
        reader.read().unwrap();
        assert!(reader.read().unwrap());
        assert_eq!(reader.node_type(), XmlNodeType::Text);
        assert_eq!(reader.value(), Some("&bogus; & more"));
    }

    #[test]
    fn test_recover_closes_open_elements() {
        let nodes = collect("<a><b><c></a></z>", ReaderOptions::new().with_recover(true));
        let names: Vec<(XmlNodeType, &str)> = nodes.iter().map(|n| (n.0, n.1.as_str())).collect();
        assert_eq!(
            names,
            vec![
                (XmlNodeType::Element, "a"),
                (XmlNodeType::Element, "b"),
                (XmlNodeType::Element, "c"),
                (XmlNodeType::EndElement, "a"),
            ]
        );
    }

    #[test]
    fn test_from_read_and_close() {
        let mut reader = XmlReader::from_read(&b"<a/>"[..], ReaderOptions::default()).unwrap();
        assert!(reader.read().unwrap());
        reader.close();
        assert!(reader.is_closed());
        assert!(matches!(reader.read(), Err(Error::ReaderClosed)));
    }
}
