//! HTML tree construction
//!
//! Drives the shared tokenizer in HTML dialect and applies the HTML 4
//! content rules on top of the arena `TreeBuilder`. The arena only appends,
//! so implied elements are created the moment content needs them and never
//! inserted retroactively.

use super::{auto_closes, is_head_element, is_raw_text_element, is_void_element};
use crate::config::HtmlParseOptions;
use crate::core::attributes::{parse_attributes, Attribute};
use crate::core::entities::decode_text;
use crate::core::scanner::is_blank;
use crate::core::tokenizer::{Dialect, TokenKind, Tokenizer};
use crate::dom::{Document, DocumentKind, NodeId, TreeBuilder};
use crate::error::{Error, Result};
use log::{debug, warn};

pub(super) struct HtmlTreeBuilder<'a> {
    source: &'a str,
    tokenizer: Tokenizer<'a>,
    tree: TreeBuilder,
    options: &'a HtmlParseOptions,
    html: Option<NodeId>,
    head: Option<NodeId>,
    body: Option<NodeId>,
}

impl<'a> HtmlTreeBuilder<'a> {
    pub fn new(source: &'a str, options: &'a HtmlParseOptions) -> Self {
        HtmlTreeBuilder {
            source,
            tokenizer: Tokenizer::new(source, Dialect::Html, false),
            tree: TreeBuilder::new(DocumentKind::Html, options.no_blanks),
            options,
            html: None,
            head: None,
            body: None,
        }
    }

    pub fn build(mut self) -> Result<Document> {
        loop {
            let token = self.tokenizer.next_token()?;
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::DocType => self.tree.set_doctype(token.content_str()),
                TokenKind::XmlDeclaration => debug!("ignoring XML declaration in HTML input"),
                TokenKind::Comment => self.tree.append_comment(token.content_str()),
                TokenKind::ProcessingInstruction => self.tree.append_pi(token.name_str(), token.content_str()),
                TokenKind::CData => self.text(token.content_str(), token.span.1),
                TokenKind::Text => {
                    let decoded = decode_text(token.content_str(), Dialect::Html);
                    self.text(&decoded, token.span.1);
                }
                TokenKind::StartTag | TokenKind::EmptyTag => {
                    let name = token.name_str().to_ascii_lowercase();
                    let offset = token.span.0 + 1 + token.name_str().len();
                    let parsed = parse_attributes(token.content_str(), offset, Dialect::Html, false)?;
                    let lowered: Vec<String> = parsed.iter().map(|a| a.name.to_ascii_lowercase()).collect();
                    let attrs: Vec<Attribute<'_>> = parsed
                        .into_iter()
                        .zip(&lowered)
                        .map(|(attr, name)| Attribute { name: name.as_str(), ..attr })
                        .collect();
                    self.start_tag(&name, &attrs, token.kind == TokenKind::EmptyTag);
                }
                TokenKind::EndTag => {
                    let name = token.name_str().to_ascii_lowercase();
                    self.end_tag(&name, token.span.0)?;
                }
            }
        }

        for &id in self.tree.open_elements() {
            let name = self.tree.element_name(id);
            if !matches!(name, "html" | "head" | "body") {
                self.warning(&format!("unclosed element <{}> at end of document", name));
            }
        }
        self.tree.finish()
    }

    fn start_tag(&mut self, name: &str, attrs: &[Attribute<'_>], self_closed: bool) {
        if !self.options.no_implied {
            match name {
                "html" => {
                    if self.html.is_some() {
                        self.warning("misplaced <html> tag");
                    } else {
                        self.html = Some(self.tree.open_element("html", attrs, false));
                    }
                    return;
                }
                "head" => {
                    if self.head.is_some() || self.body.is_some() {
                        self.warning("misplaced <head> tag");
                    } else {
                        self.open_head(attrs);
                    }
                    return;
                }
                "body" => {
                    if self.body.is_some() {
                        self.warning("misplaced <body> tag");
                    } else {
                        self.ensure_html();
                        self.close_head_if_open();
                        self.body = Some(self.tree.open_element("body", attrs, false));
                    }
                    return;
                }
                _ => {}
            }
        }

        self.auto_close(name);

        if !self.options.no_implied {
            if name == "frameset" {
                self.ensure_html();
                self.close_head_if_open();
            } else if is_head_element(name) && self.body.is_none() {
                if self.head.is_none() {
                    self.open_head(&[]);
                }
            } else if !self.tree.is_open("frameset") {
                self.ensure_body();
            }
        }

        self.tree.open_element(name, attrs, self_closed);
        if is_void_element(name) || self_closed {
            self.tree.close_element();
        } else if is_raw_text_element(name) {
            let raw = self.tokenizer.raw_text(name);
            let content = raw.content_str();
            if !content.is_empty() {
                self.tree.append_text(content, true);
            }
        }
    }

    fn end_tag(&mut self, name: &str, position: usize) -> Result<()> {
        if is_void_element(name) {
            self.warning(&format!("end tag for void element </{}> ignored", name));
            return Ok(());
        }
        // Trailing content after </body> or </html> still belongs to the body
        if !self.options.no_implied && matches!(name, "html" | "body") {
            return Ok(());
        }
        if self.tree.current_name() != Some(name) && !self.options.recover {
            return Err(Error::parse(format!("unexpected end tag </{}>", name), position));
        }
        if !self.tree.close_until(name) {
            self.warning(&format!("stray end tag </{}>", name));
        }
        Ok(())
    }

    fn text(&mut self, text: &str, end: usize) {
        if text.is_empty() {
            return;
        }
        let at_structure = match self.tree.current_name() {
            None => true,
            Some(current) => matches!(current, "html" | "head"),
        };
        if is_blank(text.as_bytes()) {
            // Whitespace between structural tags is not content
            if !at_structure {
                let before_end_tag = self.source[end..].starts_with("</");
                self.tree.append_text(text, before_end_tag);
            }
            return;
        }
        if at_structure && !self.options.no_implied {
            self.ensure_body();
        }
        let before_end_tag = self.source[end..].starts_with("</");
        self.tree.append_text(text, before_end_tag);
    }

    /// Close optional-end-tag elements the new tag implies the end of
    fn auto_close(&mut self, name: &str) {
        while let Some(open) = self.tree.current_name() {
            if !auto_closes(open, name) {
                break;
            }
            self.tree.close_element();
        }
    }

    fn ensure_html(&mut self) {
        if self.html.is_none() {
            self.html = Some(self.tree.open_element("html", &[], false));
        }
    }

    fn open_head(&mut self, attrs: &[Attribute<'_>]) {
        self.ensure_html();
        self.head = Some(self.tree.open_element("head", attrs, false));
    }

    fn close_head_if_open(&mut self) {
        if self.head.is_some() && self.tree.is_open("head") {
            self.tree.close_until("head");
        }
    }

    fn ensure_body(&mut self) {
        if self.body.is_some() {
            return;
        }
        self.ensure_html();
        self.close_head_if_open();
        self.body = Some(self.tree.open_element("body", &[], false));
    }

    fn warning(&self, message: &str) {
        if !self.options.no_warnings {
            warn!("HTML parser: {}", message);
        }
    }
}
