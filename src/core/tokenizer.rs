//! Markup Tokenizer - State machine for XML and HTML token extraction
//!
//! Implements a pull-parser style tokenizer that extracts tokens:
//! - Element start/end/empty tags (attributes left raw for `attributes`)
//! - Text content (entities left encoded for `entities`)
//! - CDATA sections
//! - Comments
//! - Processing instructions and the XML declaration
//! - DOCTYPE declarations
//!
//! In strict mode malformed constructs are errors. In recover mode (and
//! always for the HTML dialect) they degrade to text or bogus comments the
//! way browsers and libxml2's recovering parser do.

use super::scanner::{is_name_start_char, is_whitespace, Scanner};
use crate::error::{Error, Result};

/// Markup flavour being tokenized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Xml,
    Html,
}

/// Type of markup token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Element end tag: </element>
    EndTag,
    /// Empty element: <element/>
    EmptyTag,
    /// Text content
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType,
    /// End of input
    Eof,
}

/// A markup token borrowing from the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
    /// Element name or PI target
    pub name: Option<&'a str>,
    /// Raw attributes for tags, body for everything else
    pub content: Option<&'a str>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
        }
    }

    fn with_name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: &'a str) -> Self {
        self.content = Some(content);
        self
    }

    /// Name or empty string
    pub fn name_str(&self) -> &'a str {
        self.name.unwrap_or("")
    }

    /// Content or empty string
    pub fn content_str(&self) -> &'a str {
        self.content.unwrap_or("")
    }
}

/// Pull tokenizer over UTF-8 markup
pub struct Tokenizer<'a> {
    src: &'a str,
    scanner: Scanner<'a>,
    strict: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str, dialect: Dialect, strict: bool) -> Self {
        Self::at(src, 0, dialect, strict)
    }

    /// Resume tokenizing at a byte offset previously returned by `position()`
    pub fn at(src: &'a str, pos: usize, dialect: Dialect, strict: bool) -> Self {
        Tokenizer {
            src,
            scanner: Scanner::at(src.as_bytes(), pos),
            // HTML is never strict
            strict: strict && dialect == Dialect::Xml,
        }
    }

    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    fn text(&self, start: usize, end: usize) -> &'a str {
        &self.src[start..end]
    }

    fn fail<T>(&self, message: &str, position: usize) -> Result<T> {
        Err(Error::parse(message, position))
    }

    /// Get the next token; returns `TokenKind::Eof` repeatedly at the end
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let start = self.scanner.position();
        if self.scanner.is_eof() {
            return Ok(Token::new(TokenKind::Eof, (start, start)));
        }
        if self.scanner.peek() == Some(b'<') {
            self.parse_markup(start)
        } else {
            Ok(self.parse_text(start))
        }
    }

    /// Read raw text up to the matching end tag of a raw-text element
    /// (`script`, `style`). The end tag itself is left for `next_token`.
    pub fn raw_text(&mut self, element: &str) -> Token<'a> {
        let start = self.scanner.position();
        let needle = format!("</{}", element);
        let end = self
            .scanner
            .find_seq_ignore_case(needle.as_bytes())
            .unwrap_or(self.scanner.len());
        self.scanner.set_position(end);
        Token::new(TokenKind::Text, (start, end)).with_content(self.text(start, end))
    }

    /// Text runs until a '<' that opens markup
    fn parse_text(&mut self, start: usize) -> Token<'a> {
        let mut search_from = start;
        let end = loop {
            self.scanner.set_position(search_from);
            match self.scanner.find_tag_start() {
                None => break self.scanner.len(),
                Some(lt) => {
                    self.scanner.set_position(lt);
                    if self.strict || self.opens_markup() {
                        break lt;
                    }
                    search_from = lt + 1;
                }
            }
        };
        self.scanner.set_position(end);
        Token::new(TokenKind::Text, (start, end)).with_content(self.text(start, end))
    }

    /// Whether the '<' at the current position starts a markup construct
    fn opens_markup(&self) -> bool {
        match self.scanner.peek_at(1) {
            Some(b'/') => matches!(self.scanner.peek_at(2), Some(b) if is_name_start_char(b) || b == b'>'),
            Some(b'!') | Some(b'?') => true,
            Some(b) => is_name_start_char(b),
            None => false,
        }
    }

    fn parse_markup(&mut self, start: usize) -> Result<Token<'a>> {
        if !self.strict && !self.opens_markup() {
            // Stray '<' becomes part of the text run
            self.scanner.set_position(start + 1);
            let rest = self.parse_text(start + 1);
            return Ok(Token::new(TokenKind::Text, (start, rest.span.1)).with_content(self.text(start, rest.span.1)));
        }

        self.scanner.advance(1);
        match self.scanner.peek() {
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            _ => self.parse_start_tag(start),
        }
    }

    fn parse_start_tag(&mut self, start: usize) -> Result<Token<'a>> {
        let name_start = self.scanner.position();
        if self.scanner.read_name().is_none() {
            return self.fail("invalid element name", name_start);
        }
        let name_end = self.scanner.position();

        let end = match self.scanner.find_tag_end_quoted() {
            Some(end) => end,
            None if self.strict => return self.fail("unterminated start tag", start),
            None => match self.scanner.find_byte(b'>') {
                Some(end) => end,
                // Truncated tag at end of input: take what is there
                None => self.scanner.len(),
            },
        };

        let is_empty = end > name_end && self.src.as_bytes()[end - 1] == b'/';
        let attrs_end = if is_empty { end - 1 } else { end };
        self.scanner.set_position(end + 1);

        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        Ok(Token::new(kind, (start, self.scanner.position()))
            .with_name(self.text(name_start, name_end))
            .with_content(self.text(name_end, attrs_end.max(name_end))))
    }

    fn parse_end_tag(&mut self, start: usize) -> Result<Token<'a>> {
        self.scanner.advance(1);
        let name_start = self.scanner.position();
        let name = self.scanner.read_name();
        let name_end = self.scanner.position();

        let end = match self.scanner.find_byte(b'>') {
            Some(end) => end,
            None if self.strict => return self.fail("unterminated end tag", start),
            None => self.scanner.len(),
        };

        if self.strict {
            if name.is_none() {
                return self.fail("invalid element name in end tag", name_start);
            }
            if !self.src.as_bytes()[name_end..end].iter().all(|&b| is_whitespace(b)) {
                return self.fail("end tag cannot have attributes", name_end);
            }
        }
        self.scanner.set_position(end + 1);

        match name {
            Some(_) => Ok(Token::new(TokenKind::EndTag, (start, self.scanner.position()))
                .with_name(self.text(name_start, name_end))),
            // `</>` or `</ junk>`: dropped as an empty comment
            None => Ok(Token::new(TokenKind::Comment, (start, self.scanner.position())).with_content("")),
        }
    }

    fn parse_bang_markup(&mut self, start: usize) -> Result<Token<'a>> {
        self.scanner.advance(1);

        if self.scanner.starts_with(b"--") {
            self.scanner.advance(2);
            return self.parse_delimited(start, b"-->", TokenKind::Comment, "unterminated comment");
        }
        if self.scanner.starts_with(b"[CDATA[") {
            self.scanner.advance(7);
            return self.parse_delimited(start, b"]]>", TokenKind::CData, "unterminated CDATA section");
        }
        let doctype = if self.strict {
            self.scanner.starts_with(b"DOCTYPE")
        } else {
            self.scanner.starts_with_ignore_case(b"DOCTYPE")
        };
        if doctype {
            self.scanner.advance(7);
            return self.parse_doctype(start);
        }
        if self.strict {
            return self.fail("invalid declaration, expected comment, CDATA or DOCTYPE", start);
        }

        // Bogus comment up to the next '>'
        let body_start = self.scanner.position();
        let end = self.scanner.find_byte(b'>').unwrap_or(self.scanner.len());
        self.scanner.set_position(end + 1);
        Ok(Token::new(TokenKind::Comment, (start, self.scanner.position())).with_content(self.text(body_start, end)))
    }

    /// Comment or CDATA body up to a terminator
    fn parse_delimited(&mut self, start: usize, terminator: &[u8], kind: TokenKind, message: &str) -> Result<Token<'a>> {
        let body_start = self.scanner.position();
        let body_end = match self.scanner.find_seq(terminator) {
            Some(end) => end,
            None if self.strict => return self.fail(message, start),
            None => self.scanner.len(),
        };
        let body = self.text(body_start, body_end);

        if self.strict && kind == TokenKind::Comment && (body.contains("--") || body.ends_with('-')) {
            return self.fail("'--' is not allowed inside a comment", body_start);
        }

        self.scanner.set_position(body_end + terminator.len());
        Ok(Token::new(kind, (start, self.scanner.position())).with_content(body))
    }

    fn parse_doctype(&mut self, start: usize) -> Result<Token<'a>> {
        let body_start = self.scanner.position();
        if self.strict && !self.scanner.peek().is_some_and(is_whitespace) {
            return self.fail("whitespace required after DOCTYPE", body_start);
        }

        // Skip quoted literals and the internal subset when looking for '>'
        let bytes = self.src.as_bytes();
        let mut pos = body_start;
        let mut quote = None;
        let mut subset_depth = 0usize;
        let end = loop {
            let Some(&b) = bytes.get(pos) else {
                if self.strict {
                    return self.fail("unterminated DOCTYPE", start);
                }
                break bytes.len();
            };
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"') | (None, b'\'') => quote = Some(b),
                (None, b'[') => subset_depth += 1,
                (None, b']') => subset_depth = subset_depth.saturating_sub(1),
                (None, b'>') if subset_depth == 0 => break pos,
                _ => {}
            }
            pos += 1;
        };

        self.scanner.set_position(end + 1);
        Ok(Token::new(TokenKind::DocType, (start, self.scanner.position()))
            .with_content(self.text(body_start, end).trim()))
    }

    fn parse_pi(&mut self, start: usize) -> Result<Token<'a>> {
        self.scanner.advance(1);
        let target_start = self.scanner.position();
        let target = self.scanner.read_name();
        let target_end = self.scanner.position();

        let (body_end, resume) = match self.scanner.find_seq(b"?>") {
            Some(end) => (end, end + 2),
            None if self.strict => return self.fail("unterminated processing instruction", start),
            // HTML/SGML style `<?target data>`
            None => match self.scanner.find_byte(b'>') {
                Some(end) => (end, end + 1),
                None => (self.scanner.len(), self.scanner.len()),
            },
        };

        let Some(target) = target else {
            if self.strict {
                return self.fail("processing instruction requires a target", target_start);
            }
            self.scanner.set_position(resume);
            return Ok(Token::new(TokenKind::Comment, (start, resume)).with_content(self.text(target_start, body_end)));
        };
        let target = &self.src[target_start..target_start + target.len()];
        let body = self.text(target_end.min(body_end), body_end).trim_start();
        self.scanner.set_position(resume);

        if target.eq_ignore_ascii_case("xml") {
            if self.strict && start != 0 {
                return self.fail("XML declaration allowed only at the start of the document", start);
            }
            return Ok(Token::new(TokenKind::XmlDeclaration, (start, resume)).with_content(body));
        }
        Ok(Token::new(TokenKind::ProcessingInstruction, (start, resume))
            .with_name(target)
            .with_content(body))
    }
}
