//! HTML serializer
//!
//! Differences from XML serialization:
//! - No XML declaration
//! - Void elements are written as `<br>` with no end tag
//! - Other empty elements keep both tags (`<p></p>`)
//! - `script`/`style` content is written unescaped
//! - Attributes written without a value stay bare (`checked`)

use super::{is_raw_text_element, is_void_element};
use crate::core::entities::{encode_attribute, encode_text};
use crate::dom::node::FLAG_NO_VALUE;
use crate::dom::{Document, DocumentAccess, NodeId, NodeKind, DOCUMENT_NODE};

/// Serialize a whole document as HTML
pub fn serialize_document(doc: &Document) -> String {
    let mut out = String::with_capacity(512);
    write_document(doc, &mut out);
    out
}

/// Serialize one node and its subtree as HTML
pub fn serialize_node(doc: &Document, id: NodeId) -> String {
    let mut out = String::with_capacity(128);
    write_node(doc, id, &mut out);
    out
}

fn write_document(doc: &Document, out: &mut String) {
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
    let Some(node) = doc.get_node(id) else {
        return;
    };
    match node.kind {
        NodeKind::Document => write_document(doc, out),
        NodeKind::Element => {
            let name = doc.name_of(id).unwrap_or("");
            out.push('<');
            out.push_str(name);
            for attr in doc.attribute_ids(id) {
                out.push(' ');
                write_attribute(doc, attr, out);
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            for child in doc.children(id) {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        NodeKind::Attribute => write_attribute(doc, id, out),
        NodeKind::Text => {
            let text = doc.value_of(id).unwrap_or("");
            let raw = node
                .parent
                .and_then(|parent| doc.name_of(parent))
                .is_some_and(is_raw_text_element);
            if raw {
                out.push_str(text);
            } else {
                out.push_str(&encode_text(text));
            }
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
            out.push('>');
        }
    }
}

fn write_attribute(doc: &Document, id: NodeId, out: &mut String) {
    out.push_str(doc.name_of(id).unwrap_or(""));
    let bare = doc.get_node(id).is_some_and(|n| n.has_flag(FLAG_NO_VALUE));
    if !bare {
        out.push_str("=\"");
        out.push_str(&encode_attribute(doc.value_of(id).unwrap_or("")));
        out.push('"');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_str;

    fn find(doc: &Document, name: &str) -> NodeId {
        doc.descendants(DOCUMENT_NODE)
            .find(|&id| doc.node_name(id) == Some(name))
            .unwrap()
    }

    #[test]
    fn test_serialize_paragraph() {
        let doc = parse_str(r#"<p class="foo" id="bar"><span>Hello, World</span></p>"#).unwrap();
        let p = find(&doc, "p");
        assert_eq!(serialize_node(&doc, p), r#"<p class="foo" id="bar"><span>Hello, World</span></p>"#);
    }

    #[test]
    fn test_void_and_empty_elements() {
        let doc = parse_str("<div><br/><p></p><img src=\"a.png\"></div>").unwrap();
        let div = find(&doc, "div");
        assert_eq!(serialize_node(&doc, div), r#"<div><br><p></p><img src="a.png"></div>"#);
    }

    #[test]
    fn test_raw_text_not_escaped() {
        let doc = parse_str("<script>a < b && c</script><p>1 &lt; 2</p>").unwrap();
        assert_eq!(serialize_node(&doc, find(&doc, "script")), "<script>a < b && c</script>");
        assert_eq!(serialize_node(&doc, find(&doc, "p")), "<p>1 &lt; 2</p>");
    }

    #[test]
    fn test_boolean_attribute() {
        let doc = parse_str(r#"<input checked value="a&quot;b">"#).unwrap();
        assert_eq!(serialize_node(&doc, find(&doc, "input")), r#"<input checked value="a&quot;b">"#);
    }

    #[test]
    fn test_serialize_document() {
        let doc = parse_str("<!DOCTYPE html><html><head><title>T</title></head><body><p>hi</p></body></html>").unwrap();
        assert_eq!(
            serialize_document(&doc),
            "<!DOCTYPE html>\n<html><head><title>T</title></head><body><p>hi</p></body></html>\n"
        );
    }
}
