//! Attribute Parsing
//!
//! Parses the raw attribute run of a start tag (everything between the
//! element name and `>` / `/>`). Values are entity-decoded for the given
//! dialect. HTML additionally allows unquoted values and bare boolean
//! attributes.

use super::entities::{decode_text, decode_text_strict};
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use super::tokenizer::Dialect;
use crate::error::{Error, Result};
use std::borrow::Cow;

/// A parsed attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Qualified name as written (may include a prefix)
    pub name: &'a str,
    /// Decoded value; boolean HTML attributes get an empty value
    pub value: Cow<'a, str>,
    /// Written without `=value`
    pub is_boolean: bool,
}

impl<'a> Attribute<'a> {
    /// Prefix before the colon, if any
    pub fn prefix(&self) -> Option<&'a str> {
        split_qname(self.name).0
    }

    pub fn local_name(&self) -> &'a str {
        split_qname(self.name).1
    }

    /// `xmlns` or `xmlns:prefix` declaration
    pub fn is_namespace_decl(&self) -> bool {
        self.name == "xmlns" || self.name.starts_with("xmlns:")
    }
}

/// Split a qualified name into prefix and local name at the first colon
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (Some(prefix), local),
        _ => (None, name),
    }
}

/// Parse attributes from raw tag content
///
/// `offset` is the byte position of `input` in the document, used for error
/// positions. In strict mode missing quotes, missing values, `<` in values
/// and duplicate names are errors; otherwise the parser skips garbage and
/// keeps the first occurrence of a duplicate.
pub fn parse_attributes(input: &str, offset: usize, dialect: Dialect, strict: bool) -> Result<Vec<Attribute<'_>>> {
    let bytes = input.as_bytes();
    let mut attrs: Vec<Attribute<'_>> = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && (is_whitespace(bytes[pos]) || (!strict && bytes[pos] == b'/')) {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        if !is_name_start_char(bytes[pos]) && !(dialect == Dialect::Html && is_html_attr_char(bytes[pos])) {
            if strict {
                return Err(Error::parse("attribute name must start with a letter, underscore or colon", offset + pos));
            }
            pos += 1;
            continue;
        }

        let name_start = pos;
        while pos < bytes.len() && (is_name_char(bytes[pos]) || (dialect == Dialect::Html && is_html_attr_char(bytes[pos]))) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        let mut look = pos;
        while look < bytes.len() && is_whitespace(bytes[look]) {
            look += 1;
        }

        let (raw_value, value_start, is_boolean) = if bytes.get(look) == Some(&b'=') {
            pos = look + 1;
            while pos < bytes.len() && is_whitespace(bytes[pos]) {
                pos += 1;
            }
            match bytes.get(pos) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let value_start = pos + 1;
                    let close = bytes[value_start..].iter().position(|&b| b == quote);
                    let value_end = match close {
                        Some(rel) => value_start + rel,
                        None if strict => return Err(Error::parse("unterminated attribute value", offset + pos)),
                        None => bytes.len(),
                    };
                    pos = (value_end + 1).min(bytes.len());
                    (&input[value_start..value_end], value_start, false)
                }
                Some(_) if strict => {
                    return Err(Error::parse("attribute value must be quoted", offset + pos));
                }
                Some(_) => {
                    let value_start = pos;
                    while pos < bytes.len() && !is_whitespace(bytes[pos]) && bytes[pos] != b'>' {
                        pos += 1;
                    }
                    (&input[value_start..pos], value_start, false)
                }
                None if strict => return Err(Error::parse("missing attribute value", offset + pos)),
                None => ("", pos, false),
            }
        } else if strict {
            return Err(Error::parse(format!("attribute '{}' has no value", name), offset + look));
        } else {
            ("", look, true)
        };

        if strict && raw_value.contains('<') {
            return Err(Error::parse("'<' is not allowed in attribute values", offset + name_start));
        }

        if attrs.iter().any(|a| a.name == name) {
            if strict {
                return Err(Error::parse(format!("duplicate attribute '{}'", name), offset + name_start));
            }
            continue;
        }

        let value = if strict && dialect == Dialect::Xml {
            decode_text_strict(raw_value, offset + value_start)?
        } else {
            decode_text(raw_value, dialect)
        };
        attrs.push(Attribute {
            name,
            value,
            is_boolean,
        });
    }

    Ok(attrs)
}

/// Extra characters browsers accept in attribute names
#[inline]
fn is_html_attr_char(b: u8) -> bool {
    matches!(b, b'@' | b'#' | b'$' | b'[' | b']' | b'(' | b')' | b'*' | b'!' | b'+' | b'|')
}
