//! XML serialization
//!
//! Dumps a node and its subtree as XML text without added formatting:
//! empty elements collapse to `<name/>`, namespace declarations are written
//! back where they were declared, text and attribute values are escaped.

use super::document::Document;
use super::node::{NodeId, NodeKind, DOCUMENT_NODE};
use super::DocumentAccess;
use crate::core::entities::{encode_attribute, encode_text};

/// Serialize a node (and its subtree) as XML.
///
/// The document node yields the full document with an XML declaration;
/// an attribute node yields `name="value"`.
pub fn serialize_node(doc: &Document, id: NodeId) -> String {
    let mut out = String::with_capacity(256);
    if id == DOCUMENT_NODE {
        write_document(doc, &mut out);
    } else {
        write_node(doc, id, &mut out);
    }
    out
}

fn write_document(doc: &Document, out: &mut String) {
    out.push_str("<?xml version=\"");
    out.push_str(doc.version().unwrap_or("1.0"));
    out.push('"');
    if let Some(encoding) = doc.encoding() {
        out.push_str(" encoding=\"");
        out.push_str(encoding);
        out.push('"');
    }
    out.push_str("?>\n");
    if let Some(doctype) = doc.doctype() {
        out.push_str("<!DOCTYPE ");
        out.push_str(doctype);
        out.push_str(">\n");
    }
    for child in doc.children(DOCUMENT_NODE) {
        write_node(doc, child, out);
        out.push('\n');
    }
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    let Some(kind) = doc.node_kind_of(id) else {
        return;
    };
    match kind {
        NodeKind::Document => write_document(doc, out),
        NodeKind::Element => {
            let name = doc.name_of(id).unwrap_or("");
            out.push('<');
            out.push_str(name);
            for (prefix, uri) in doc.namespace_declarations(id) {
                match prefix {
                    Some(prefix) => {
                        out.push_str(" xmlns:");
                        out.push_str(prefix);
                    }
                    None => out.push_str(" xmlns"),
                }
                out.push_str("=\"");
                out.push_str(&encode_attribute(uri));
                out.push('"');
            }
            for attr in doc.attribute_ids(id) {
                out.push(' ');
                write_attribute(doc, attr, out);
            }
            if doc.first_child_of(id).is_none() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in doc.children(id) {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        NodeKind::Attribute => write_attribute(doc, id, out),
        NodeKind::Text => {
            let text = encode_text(doc.value_of(id).unwrap_or(""));
            out.push_str(&text.replace('\r', "&#13;"));
        }
        NodeKind::CData => {
            out.push_str("<![CDATA[");
            out.push_str(doc.value_of(id).unwrap_or(""));
            out.push_str("]]>");
        }
        NodeKind::Comment => {
            out.push_str("<!--");
            out.push_str(doc.value_of(id).unwrap_or(""));
            out.push_str("-->");
        }
        NodeKind::ProcessingInstruction => {
            out.push_str("<?");
            out.push_str(doc.name_of(id).unwrap_or(""));
            let data = doc.value_of(id).unwrap_or("");
            if !data.is_empty() {
                out.push(' ');
                out.push_str(data);
            }
            out.push_str("?>");
        }
    }
}

fn write_attribute(doc: &Document, id: NodeId, out: &mut String) {
    out.push_str(doc.name_of(id).unwrap_or(""));
    out.push_str("=\"");
    out.push_str(&encode_attribute(doc.value_of(id).unwrap_or("")));
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_element() {
        let doc = Document::parse_str(r#"<p class="foo" id="bar"><span>Hello, World</span></p>"#).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(serialize_node(&doc, root), r#"<p class="foo" id="bar"><span>Hello, World</span></p>"#);
    }

    #[test]
    fn test_serialize_empty_and_escaped() {
        let doc = Document::parse_str(r#"<r a="x &quot;y&quot;"><e></e>1 &lt; 2</r>"#).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(serialize_node(&doc, root), r#"<r a="x &quot;y&quot;"><e/>1 &lt; 2</r>"#);
    }

    #[test]
    fn test_serialize_namespaces() {
        let doc = Document::parse_str(r#"<r xmlns="urn:a" xmlns:b="urn:b"><b:x/></r>"#).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(serialize_node(&doc, root), r#"<r xmlns="urn:a" xmlns:b="urn:b"><b:x/></r>"#);
        // declarations stay on the declaring element
        let x = doc.first_child(root).unwrap();
        assert_eq!(serialize_node(&doc, x), "<b:x/>");
    }

    #[test]
    fn test_serialize_document() {
        let doc = Document::parse_str("<?xml version=\"1.0\"?><!--c--><r><![CDATA[a<b]]><?pi data?></r>").unwrap();
        assert_eq!(
            serialize_node(&doc, DOCUMENT_NODE),
            "<?xml version=\"1.0\"?>\n<!--c-->\n<r><![CDATA[a<b]]><?pi data?></r>\n"
        );
    }

    #[test]
    fn test_serialize_attribute_node() {
        let doc = Document::parse_str(r#"<r id="7"/>"#).unwrap();
        let attr = doc.attributes(doc.root_element().unwrap()).next().unwrap();
        assert_eq!(serialize_node(&doc, attr), r#"id="7""#);
    }
}
