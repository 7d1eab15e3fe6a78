//! Input Encoding Detection and Conversion
//!
//! Everything downstream of this module works on UTF-8. The source encoding
//! is chosen in this order:
//! 1. an explicit encoding name from the caller's options
//! 2. a byte order mark (UTF-8, UTF-16 LE/BE)
//! 3. a UTF-16 byte pattern around the first '<'
//! 4. the `encoding` pseudo-attribute of the XML declaration, or an HTML
//!    `<meta charset>` / `http-equiv` declaration near the top of the file
//! 5. UTF-8

use super::tokenizer::Dialect;
use crate::error::{Error, Result};
use memchr::memmem;

/// Supported source encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
    Windows1252,
    Ascii,
}

impl XmlEncoding {
    /// Map an IANA-style label to an encoding
    pub fn from_label(label: &str) -> Result<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        let encoding = match normalized.as_str() {
            "utf-8" | "utf8" | "unicode-1-1-utf-8" => XmlEncoding::Utf8,
            "utf-16" | "utf-16le" | "utf16" | "utf16le" => XmlEncoding::Utf16Le,
            "utf-16be" | "utf16be" => XmlEncoding::Utf16Be,
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "l1" => XmlEncoding::Latin1,
            "windows-1252" | "cp1252" | "x-cp1252" => XmlEncoding::Windows1252,
            "us-ascii" | "ascii" | "iso646-us" => XmlEncoding::Ascii,
            _ => return Err(Error::UnsupportedEncoding(label.to_string())),
        };
        Ok(encoding)
    }

    /// Detect encoding from byte order mark or initial bytes
    pub fn detect_bom(input: &[u8]) -> Option<Self> {
        match input {
            [0xEF, 0xBB, 0xBF, ..] => Some(XmlEncoding::Utf8),
            [0xFF, 0xFE, ..] => Some(XmlEncoding::Utf16Le),
            [0xFE, 0xFF, ..] => Some(XmlEncoding::Utf16Be),
            [0x00, b'<', ..] => Some(XmlEncoding::Utf16Be),
            [b'<', 0x00, ..] => Some(XmlEncoding::Utf16Le),
            _ => None,
        }
    }
}

/// Decode raw input bytes into a UTF-8 string
///
/// `lossy` replaces invalid sequences with U+FFFD instead of failing, which
/// is what the recovering HTML parser wants.
pub fn decode_input(input: &[u8], forced: Option<&str>, dialect: Dialect, lossy: bool) -> Result<String> {
    let encoding = match forced {
        Some(label) => XmlEncoding::from_label(label)?,
        None => match XmlEncoding::detect_bom(input) {
            Some(enc) => enc,
            None => match sniff_declared(input, dialect) {
                Some(label) => XmlEncoding::from_label(&label)?,
                None => XmlEncoding::Utf8,
            },
        },
    };
    log::trace!("decoding {} input bytes as {:?}", input.len(), encoding);

    match encoding {
        XmlEncoding::Utf8 => {
            let body = input.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(input);
            match std::str::from_utf8(body) {
                Ok(s) => Ok(s.to_owned()),
                Err(_) if lossy => Ok(String::from_utf8_lossy(body).into_owned()),
                Err(_) => Err(Error::InvalidSourceData),
            }
        }
        XmlEncoding::Utf16Le => decode_utf16(input, true, lossy),
        XmlEncoding::Utf16Be => decode_utf16(input, false, lossy),
        XmlEncoding::Latin1 => Ok(input.iter().map(|&b| b as char).collect()),
        XmlEncoding::Windows1252 => Ok(input.iter().map(|&b| windows_1252_char(b)).collect()),
        XmlEncoding::Ascii => {
            if input.is_ascii() {
                Ok(input.iter().map(|&b| b as char).collect())
            } else if lossy {
                Ok(input.iter().map(|&b| if b.is_ascii() { b as char } else { '\u{FFFD}' }).collect())
            } else {
                Err(Error::InvalidSourceData)
            }
        }
    }
}

fn decode_utf16(input: &[u8], little_endian: bool, lossy: bool) -> Result<String> {
    let bom: &[u8] = if little_endian { &[0xFF, 0xFE] } else { &[0xFE, 0xFF] };
    let bytes = input.strip_prefix(bom).unwrap_or(input);

    if bytes.len() % 2 != 0 && !lossy {
        return Err(Error::InvalidSourceData);
    }

    let units = bytes.chunks_exact(2).map(|pair| {
        if little_endian {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        }
    });

    if lossy {
        Ok(char::decode_utf16(units)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect())
    } else {
        char::decode_utf16(units)
            .collect::<std::result::Result<String, _>>()
            .map_err(|_| Error::InvalidSourceData)
    }
}

/// Find an encoding declared in the document prologue
fn sniff_declared(input: &[u8], dialect: Dialect) -> Option<String> {
    let head = &input[..input.len().min(1024)];
    match dialect {
        Dialect::Xml => {
            if !head.starts_with(b"<?xml") {
                return None;
            }
            let end = memmem::find(head, b"?>")?;
            pseudo_attribute(&head[..end], b"encoding")
        }
        Dialect::Html => {
            let lower = head.to_ascii_lowercase();
            let at = memmem::find(&lower, b"charset=")?;
            let rest = &head[at + b"charset=".len()..];
            let rest = rest.strip_prefix(b"\"").or_else(|| rest.strip_prefix(b"'")).unwrap_or(rest);
            let len = rest
                .iter()
                .position(|&b| matches!(b, b'"' | b'\'' | b';' | b' ' | b'>' | b'/'))
                .unwrap_or(rest.len());
            let label = std::str::from_utf8(&rest[..len]).ok()?;
            (!label.is_empty()).then(|| label.to_string())
        }
    }
}

/// Extract `name="value"` from an XML declaration body
pub(crate) fn pseudo_attribute(decl: &[u8], name: &[u8]) -> Option<String> {
    let at = memmem::find(decl, name)?;
    let rest = &decl[at + name.len()..];
    let eq = rest.iter().position(|&b| b == b'=')?;
    let rest = rest[eq + 1..].trim_ascii_start();
    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let close = rest[1..].iter().position(|&b| b == quote)?;
    std::str::from_utf8(&rest[1..1 + close]).ok().map(str::to_string)
}

fn windows_1252_char(b: u8) -> char {
    const HIGH: [char; 32] = [
        '\u{20AC}', '\u{81}', '\u{201A}', '\u{192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
        '\u{2C6}', '\u{2030}', '\u{160}', '\u{2039}', '\u{152}', '\u{8D}', '\u{17D}', '\u{8F}',
        '\u{90}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
        '\u{2DC}', '\u{2122}', '\u{161}', '\u{203A}', '\u{153}', '\u{9D}', '\u{17E}', '\u{178}',
    ];
    match b {
        0x80..=0x9F => HIGH[(b - 0x80) as usize],
        _ => b as char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_bom() {
        assert_eq!(XmlEncoding::detect_bom(b"<root/>"), None);
        assert_eq!(XmlEncoding::detect_bom(&[0xEF, 0xBB, 0xBF, b'<']), Some(XmlEncoding::Utf8));
        assert_eq!(XmlEncoding::detect_bom(&[0xFF, 0xFE, b'<', 0x00]), Some(XmlEncoding::Utf16Le));
        assert_eq!(XmlEncoding::detect_bom(&[0xFE, 0xFF, 0x00, b'<']), Some(XmlEncoding::Utf16Be));
    }

    #[test]
    fn test_convert_utf16_le() {
        // "<r/>" in UTF-16 LE with BOM
        let utf16_le = [0xFF, 0xFE, b'<', 0x00, b'r', 0x00, b'/', 0x00, b'>', 0x00];
        let result = decode_input(&utf16_le, None, Dialect::Xml, false).unwrap();
        assert_eq!(result, "<r/>");
    }

    #[test]
    fn test_convert_utf16_be() {
        let utf16_be = [0xFE, 0xFF, 0x00, b'<', 0x00, b'r', 0x00, b'/', 0x00, b'>'];
        let result = decode_input(&utf16_be, None, Dialect::Xml, false).unwrap();
        assert_eq!(result, "<r/>");
    }

    #[test]
    fn test_declared_latin1() {
        let input = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><r>caf\xE9</r>";
        let result = decode_input(input, None, Dialect::Xml, false).unwrap();
        assert!(result.ends_with("<r>caf\u{E9}</r>"));
    }

    #[test]
    fn test_html_meta_charset() {
        let input = b"<html><head><meta charset=\"windows-1252\"></head><body>\x93q\x94</body></html>";
        let result = decode_input(input, None, Dialect::Html, true).unwrap();
        assert!(result.contains("\u{201C}q\u{201D}"));
    }

    #[test]
    fn test_forced_encoding_overrides_declaration() {
        let input = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><r>\xE9</r>";
        let result = decode_input(input, Some("latin1"), Dialect::Xml, false).unwrap();
        assert!(result.contains("\u{E9}"));
    }

    #[test]
    fn test_unsupported_encoding() {
        let err = decode_input(b"<r/>", Some("EBCDIC-US"), Dialect::Xml, false).unwrap_err();
        assert!(matches!(err, Error::UnsupportedEncoding(name) if name == "EBCDIC-US"));
    }

    #[test]
    fn test_invalid_utf8_strict_vs_lossy() {
        let input = b"<r>\xFF</r>";
        assert!(matches!(
            decode_input(input, None, Dialect::Xml, false),
            Err(Error::InvalidSourceData)
        ));
        let lossy = decode_input(input, None, Dialect::Html, true).unwrap();
        assert_eq!(lossy, "<r>\u{FFFD}</r>");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let input = [0xEF, 0xBB, 0xBF, b'<', b'a', b'/', b'>'];
        assert_eq!(decode_input(&input, None, Dialect::Xml, false).unwrap(), "<a/>");
    }
}
