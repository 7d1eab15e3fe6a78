//! Entity Decoding and Escaping
//!
//! Handles decoding of entity references:
//! - Built-in XML entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//! - A table of common HTML named entities (HTML dialect only)
//!
//! Uses Cow for zero-copy when no entities are present.

use super::scanner::{is_name_char, is_name_start_char};
use super::tokenizer::Dialect;
use crate::error::{Error, Result};
use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded. Unknown or malformed references
/// are kept as literal text.
#[inline]
pub fn decode_text(input: &str, dialect: Dialect) -> Cow<'_, str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input, dialect))
}

fn decode_entities(input: &str, dialect: Dialect) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..]
            .find(';')
            .filter(|&semi| semi > 0 && semi <= 32)
            .and_then(|semi| decode_entity(&rest[1..1 + semi], dialect).map(|c| (c, semi + 2)));

        match decoded {
            Some((text, consumed)) => {
                result.push_str(&text);
                rest = &rest[consumed..];
            }
            None => {
                result.push('&');
                rest = &rest[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Decode well-formed XML character data. Undefined entities, a `&` that
/// does not start a reference and characters outside the XML `Char`
/// production are `Error::Parse`; `offset` is the byte position of `input`
/// in the document and positions in errors include it.
pub fn decode_text_strict(input: &str, offset: usize) -> Result<Cow<'_, str>> {
    if let Some((at, c)) = input.char_indices().find(|&(_, c)| !is_valid_xml_char(c as u32)) {
        return Err(Error::parse(format!("invalid character U+{:04X}", c as u32), offset + at));
    }
    if memchr(b'&', input.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(input));
    }

    let mut result = String::with_capacity(input.len());
    let mut pos = 0;
    while let Some(rel) = input[pos..].find('&') {
        let amp = pos + rel;
        result.push_str(&input[pos..amp]);

        let body = &input[amp + 1..];
        let name = body
            .find(';')
            .map(|semi| &body[..semi])
            .filter(|name| is_reference_name(name))
            .ok_or_else(|| Error::parse("'&' must start an entity or character reference", offset + amp))?;
        let decoded = decode_entity(name, Dialect::Xml).ok_or_else(|| {
            let message = if name.starts_with('#') {
                format!("invalid character reference '&{};'", name)
            } else {
                format!("undefined entity '&{};'", name)
            };
            Error::parse(message, offset + amp)
        })?;
        result.push_str(&decoded);
        pos = amp + name.len() + 2;
    }
    result.push_str(&input[pos..]);
    Ok(Cow::Owned(result))
}

/// `name` or `#digits` / `#xhex`, the text between `&` and `;`
fn is_reference_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    match bytes {
        [] => false,
        [b'#', b'x' | b'X', hex @ ..] => !hex.is_empty() && hex.iter().all(u8::is_ascii_hexdigit),
        [b'#', digits @ ..] => !digits.is_empty() && digits.iter().all(u8::is_ascii_digit),
        [first, rest @ ..] => is_name_start_char(*first) && rest.iter().all(|&b| is_name_char(b)),
    }
}

/// Decode a single entity name (without '&' and ';')
fn decode_entity(entity: &str, dialect: Dialect) -> Option<Cow<'static, str>> {
    if let Some(num) = entity.strip_prefix('#') {
        return decode_numeric_entity(num).map(|c| Cow::Owned(c.to_string()));
    }
    let builtin = match entity {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "quot" => "\"",
        "apos" => "'",
        _ if dialect == Dialect::Html => return html_entity(entity).map(|c| Cow::Owned(c.to_string())),
        _ => return None,
    };
    Some(Cow::Borrowed(builtin))
}

/// Decode numeric character reference (without '#')
fn decode_numeric_entity(entity: &str) -> Option<char> {
    let codepoint = match entity.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => entity.parse::<u32>().ok()?,
    };
    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a codepoint is a valid XML 1.0 character
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF)
}

/// HTML named entities beyond the XML built-ins
fn html_entity(name: &str) -> Option<char> {
    let c = match name {
        "nbsp" => '\u{A0}',
        "iexcl" => '\u{A1}',
        "cent" => '\u{A2}',
        "pound" => '\u{A3}',
        "curren" => '\u{A4}',
        "yen" => '\u{A5}',
        "brvbar" => '\u{A6}',
        "sect" => '\u{A7}',
        "uml" => '\u{A8}',
        "copy" => '\u{A9}',
        "ordf" => '\u{AA}',
        "laquo" => '\u{AB}',
        "not" => '\u{AC}',
        "shy" => '\u{AD}',
        "reg" => '\u{AE}',
        "macr" => '\u{AF}',
        "deg" => '\u{B0}',
        "plusmn" => '\u{B1}',
        "sup2" => '\u{B2}',
        "sup3" => '\u{B3}',
        "acute" => '\u{B4}',
        "micro" => '\u{B5}',
        "para" => '\u{B6}',
        "middot" => '\u{B7}',
        "cedil" => '\u{B8}',
        "sup1" => '\u{B9}',
        "ordm" => '\u{BA}',
        "raquo" => '\u{BB}',
        "frac14" => '\u{BC}',
        "frac12" => '\u{BD}',
        "frac34" => '\u{BE}',
        "iquest" => '\u{BF}',
        "Agrave" => '\u{C0}',
        "Aacute" => '\u{C1}',
        "Auml" => '\u{C4}',
        "Ccedil" => '\u{C7}',
        "Eacute" => '\u{C9}',
        "Ouml" => '\u{D6}',
        "times" => '\u{D7}',
        "Uuml" => '\u{DC}',
        "szlig" => '\u{DF}',
        "agrave" => '\u{E0}',
        "aacute" => '\u{E1}',
        "auml" => '\u{E4}',
        "ccedil" => '\u{E7}',
        "egrave" => '\u{E8}',
        "eacute" => '\u{E9}',
        "ouml" => '\u{F6}',
        "divide" => '\u{F7}',
        "uuml" => '\u{FC}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "sbquo" => '\u{201A}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "bdquo" => '\u{201E}',
        "dagger" => '\u{2020}',
        "bull" => '\u{2022}',
        "hellip" => '\u{2026}',
        "prime" => '\u{2032}',
        "lsaquo" => '\u{2039}',
        "rsaquo" => '\u{203A}',
        "euro" => '\u{20AC}',
        "trade" => '\u{2122}',
        "larr" => '\u{2190}',
        "uarr" => '\u{2191}',
        "rarr" => '\u{2192}',
        "darr" => '\u{2193}',
        "ne" => '\u{2260}',
        "le" => '\u{2264}',
        "ge" => '\u{2265}',
        _ => return None,
    };
    Some(c)
}

/// Escape text content for serialization (&, <, >)
pub fn encode_text(input: &str) -> Cow<'_, str> {
    if memchr3(b'&', b'<', b'>', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escape an attribute value for a double-quoted serialization
pub fn encode_attribute(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    if memchr3(b'&', b'<', b'"', bytes).is_none() && memchr(b'>', bytes).is_none() {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities() {
        let result = decode_text("hello world", Dialect::Xml);
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_basic_entities() {
        assert_eq!(decode_text("&lt;a&gt; &amp; &quot;b&apos;", Dialect::Xml), "<a> & \"b'");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode_text("&#65;&#x42;&#X43;", Dialect::Xml), "ABC");
        assert_eq!(decode_text("&#x1F600;", Dialect::Xml), "\u{1F600}");
    }

    #[test]
    fn test_invalid_char_reference_kept() {
        assert_eq!(decode_text("&#0;", Dialect::Xml), "&#0;");
    }

    #[test]
    fn test_unknown_entity() {
        assert_eq!(decode_text("&unknown; & done", Dialect::Xml), "&unknown; & done");
    }

    #[test]
    fn test_strict_decoding() {
        assert!(matches!(decode_text_strict("plain", 0), Ok(Cow::Borrowed("plain"))));
        assert_eq!(decode_text_strict("&lt;&#65;&#x42;&amp;", 0).unwrap(), "<AB&");
        assert_eq!(decode_text_strict("caf\u{E9} &apos;x&apos;", 0).unwrap(), "caf\u{E9} 'x'");
    }

    #[test]
    fn test_strict_rejects_bad_references() {
        let position = |input: &str| match decode_text_strict(input, 10) {
            Err(Error::Parse { position, .. }) => Some(position),
            _ => None,
        };
        assert_eq!(position("ab&bogus;"), Some(12));
        assert_eq!(position("a & b"), Some(12));
        assert_eq!(position("&amp"), Some(10));
        assert_eq!(position("&;"), Some(10));
        assert_eq!(position("&#0;"), Some(10));
        assert_eq!(position("&#xZZ;"), Some(10));
        assert_eq!(position("&nbsp;"), Some(10));
        assert_eq!(position("x\u{0}"), Some(11));
        assert_eq!(position("\u{1}"), Some(10));
        assert_eq!(position("tab\tok\r\n"), None);
    }

    #[test]
    fn test_html_entities_only_in_html() {
        assert_eq!(decode_text("a&nbsp;b", Dialect::Html), "a\u{A0}b");
        assert_eq!(decode_text("a&nbsp;b", Dialect::Xml), "a&nbsp;b");
        assert_eq!(decode_text("&copy; 2024", Dialect::Html), "\u{A9} 2024");
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(encode_text("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert!(matches!(encode_text("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_encode_attribute() {
        assert_eq!(encode_attribute("say \"hi\" & go"), "say &quot;hi&quot; &amp; go");
    }
}
