//! HTML Module - Lenient HTML parsing and serialization
//!
//! Parses real-world HTML into the same arena `Document` the XML parser
//! produces, so XPath queries work on both:
//! - Lowercased tag and attribute names
//! - Void elements, raw-text `script`/`style`
//! - Optional end tags closed implicitly (`p`, `li`, `td`, `option`, ...)
//! - Implied `html`/`head`/`body` unless `no_implied` is set
//!
//! Serialization writes HTML syntax back out: no XML declaration, void
//! elements without end tags, unescaped script/style content.

mod serialize;
mod tree;

pub use serialize::{serialize_document, serialize_node};

use crate::config::HtmlParseOptions;
use crate::core::encoding::decode_input;
use crate::core::scanner::is_blank;
use crate::core::tokenizer::Dialect;
use crate::dom::Document;
use crate::error::{Error, Result};
use tree::HtmlTreeBuilder;

/// Parse an HTML document with the default lenient options
pub fn parse(input: &[u8]) -> Result<Document> {
    parse_with_options(input, &HtmlParseOptions::default())
}

pub fn parse_str(input: &str) -> Result<Document> {
    parse(input.as_bytes())
}

/// Parse an HTML document
///
/// The charset comes from `options.encoding`, a BOM or a `<meta charset>`
/// in the first bytes, falling back to UTF-8. Empty input is
/// `Error::InvalidSourceData`; input without any element is `Error::NoRoot`.
/// With `recover` off, stray or mismatched end tags fail with
/// `Error::Parse` instead of being skipped.
pub fn parse_with_options(input: &[u8], options: &HtmlParseOptions) -> Result<Document> {
    if is_blank(input) {
        return Err(Error::InvalidSourceData);
    }
    let source = decode_input(input, options.encoding.as_deref(), Dialect::Html, true)?;
    HtmlTreeBuilder::new(&source, options).build()
}

/// Elements that never have content or an end tag
pub(crate) fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "basefont"
            | "br"
            | "col"
            | "embed"
            | "frame"
            | "hr"
            | "img"
            | "input"
            | "isindex"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose content is not parsed as markup
pub(crate) fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

/// Elements that belong in `<head>` when they appear before the body
fn is_head_element(tag: &str) -> bool {
    matches!(tag, "title" | "meta" | "link" | "base" | "style" | "script" | "noscript")
}

/// Whether opening `tag` implicitly ends an open `open_tag`
fn auto_closes(open_tag: &str, tag: &str) -> bool {
    match open_tag {
        "p" => matches!(
            tag,
            "p" | "div"
                | "ul"
                | "ol"
                | "dl"
                | "pre"
                | "table"
                | "blockquote"
                | "address"
                | "h1"
                | "h2"
                | "h3"
                | "h4"
                | "h5"
                | "h6"
                | "hr"
                | "form"
                | "fieldset"
                | "section"
                | "article"
                | "aside"
                | "header"
                | "footer"
                | "nav"
                | "figure"
                | "main"
        ),
        "li" => tag == "li",
        "dt" | "dd" => matches!(tag, "dt" | "dd"),
        "tr" => tag == "tr",
        "td" | "th" => matches!(tag, "td" | "th" | "tr"),
        "thead" | "tbody" => matches!(tag, "tbody" | "tfoot"),
        "tfoot" => tag == "tbody",
        "option" => matches!(tag, "option" | "optgroup"),
        "optgroup" => tag == "optgroup",
        "colgroup" => matches!(tag, "thead" | "tbody" | "tfoot" | "tr" | "colgroup"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HtmlParseOptions;
    use crate::dom::{DocumentKind, NodeKind, DOCUMENT_NODE};

    fn element_names(doc: &Document, id: u32) -> Vec<String> {
        doc.children(id)
            .filter(|&c| doc.node_kind(c) == Some(NodeKind::Element))
            .filter_map(|c| doc.node_name(c).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_parse_simple_html() {
        let doc = parse_str("<html><body><p>hi</p></body></html>").unwrap();
        assert_eq!(doc.kind(), DocumentKind::Html);
        let html = doc.root_element().unwrap();
        assert_eq!(doc.node_name(html), Some("html"));
        assert_eq!(element_names(&doc, html), vec!["body"]);
        assert_eq!(doc.text_content(html), "hi");
    }

    #[test]
    fn test_implied_structure() {
        let doc = parse_str("<title>T</title><p>text").unwrap();
        let html = doc.root_element().unwrap();
        assert_eq!(doc.node_name(html), Some("html"));
        assert_eq!(element_names(&doc, html), vec!["head", "body"]);
        let head = doc.first_child(html).unwrap();
        assert_eq!(element_names(&doc, head), vec!["title"]);
    }

    #[test]
    fn test_no_implied() {
        let options = HtmlParseOptions::new().with_no_implied(true);
        let doc = parse_with_options(b"<p>a</p>", &options).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.node_name(root), Some("p"));
        assert_eq!(doc.parent(root), Some(DOCUMENT_NODE));
    }

    #[test]
    fn test_head_and_body_with_whitespace() {
        let src = "<!DOCTYPE html>\n<html>\n<head>\n<title>x</title>\n</head>\n<body>\n<p>a</p>\n</body>\n</html>\n";
        let doc = parse_str(src).unwrap();
        let html = doc.root_element().unwrap();
        assert_eq!(doc.children(html).count(), 2);
        assert_eq!(element_names(&doc, html), vec!["head", "body"]);
        assert_eq!(doc.doctype(), Some("html"));
    }

    #[test]
    fn test_case_insensitive_names() {
        let doc = parse_str("<DIV CLASS=\"x\"><P>t</p></Div>").unwrap();
        let body = doc.descendants(DOCUMENT_NODE).find(|&id| doc.node_name(id) == Some("body")).unwrap();
        let div = doc.first_child(body).unwrap();
        assert_eq!(doc.node_name(div), Some("div"));
        assert_eq!(doc.attribute_value(div, "class"), Some("x"));
        assert_eq!(element_names(&doc, div), vec!["p"]);
    }

    #[test]
    fn test_void_elements() {
        let doc = parse_str("<p>a<br>b<img src=x.png>c</p>").unwrap();
        let p = doc.descendants(DOCUMENT_NODE).find(|&id| doc.node_name(id) == Some("p")).unwrap();
        assert_eq!(doc.children(p).count(), 5);
        assert_eq!(doc.text_content(p), "abc");
    }

    #[test]
    fn test_auto_close() {
        let doc = parse_str("<ul><li>one<li>two</ul><p>a<p>b<div>c</div>").unwrap();
        let body = doc.descendants(DOCUMENT_NODE).find(|&id| doc.node_name(id) == Some("body")).unwrap();
        assert_eq!(element_names(&doc, body), vec!["ul", "p", "p", "div"]);
        let ul = doc.first_child(body).unwrap();
        assert_eq!(element_names(&doc, ul), vec!["li", "li"]);
    }

    #[test]
    fn test_raw_text_script() {
        let doc = parse_str("<script>if (a < b && c) {}</script><p>x</p>").unwrap();
        let script = doc.descendants(DOCUMENT_NODE).find(|&id| doc.node_name(id) == Some("script")).unwrap();
        assert_eq!(doc.text_content(script), "if (a < b && c) {}");
        let head = doc.parent(script).unwrap();
        assert_eq!(doc.node_name(head), Some("head"));
    }

    #[test]
    fn test_entities() {
        let doc = parse_str("<p>a&nbsp;b &amp; &copy; &bogus;</p>").unwrap();
        let html = doc.root_element().unwrap();
        assert_eq!(doc.text_content(html), "a\u{a0}b & \u{a9} &bogus;");
    }

    #[test]
    fn test_boolean_attribute() {
        let doc = parse_str("<input type=checkbox checked>").unwrap();
        let input = doc.descendants(DOCUMENT_NODE).find(|&id| doc.node_name(id) == Some("input")).unwrap();
        assert_eq!(doc.attribute_value(input, "type"), Some("checkbox"));
        assert_eq!(doc.attribute_value(input, "checked"), Some(""));
    }

    #[test]
    fn test_stray_end_tag() {
        let doc = parse_str("<div>a</span>b</div>").unwrap();
        let div = doc.descendants(DOCUMENT_NODE).find(|&id| doc.node_name(id) == Some("div")).unwrap();
        assert_eq!(doc.text_content(div), "ab");

        let strict = HtmlParseOptions::new().with_recover(false);
        assert!(matches!(parse_with_options(b"<div>a</span>b</div>", &strict), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_content_after_body_end() {
        let doc = parse_str("<html><body><p>a</p></body></html><p>b</p>").unwrap();
        let body = doc.descendants(DOCUMENT_NODE).find(|&id| doc.node_name(id) == Some("body")).unwrap();
        assert_eq!(element_names(&doc, body), vec!["p", "p"]);
    }

    #[test]
    fn test_meta_charset_latin1() {
        let mut input = b"<meta charset=\"iso-8859-1\"><p>caf".to_vec();
        input.push(0xE9);
        input.extend_from_slice(b"</p>");
        let doc = parse(&input).unwrap();
        assert_eq!(doc.text_content(doc.root_element().unwrap()), "caf\u{e9}");
    }

    #[test]
    fn test_empty_and_rootless() {
        assert!(matches!(parse(b""), Err(Error::InvalidSourceData)));
        assert!(matches!(parse_str("<!-- only -->"), Err(Error::NoRoot)));
    }
}
