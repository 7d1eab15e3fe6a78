//! Reader Node Types
//!
//! What the streaming reader is positioned on after each `read()`, plus the
//! owned attribute records it hands out.

use std::fmt;

/// Kind of node the reader is positioned on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum XmlNodeType {
    /// Before the first `read()`
    #[default]
    None,
    /// Start tag, or a self-closing tag (`is_empty_element` set)
    Element,
    EndElement,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
    /// `<?xml ...?>`; the value is the raw declaration body
    XmlDeclaration,
    DocumentType,
    /// Whitespace-only text
    Whitespace,
    /// Input exhausted; `read()` returned false
    EndDocument,
}

impl XmlNodeType {
    /// Whether nodes of this type carry a value
    pub fn has_value(self) -> bool {
        matches!(
            self,
            XmlNodeType::Text
                | XmlNodeType::CData
                | XmlNodeType::Comment
                | XmlNodeType::ProcessingInstruction
                | XmlNodeType::XmlDeclaration
                | XmlNodeType::Whitespace
        )
    }
}

impl fmt::Display for XmlNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            XmlNodeType::None => "None",
            XmlNodeType::Element => "Element",
            XmlNodeType::EndElement => "EndElement",
            XmlNodeType::Text => "Text",
            XmlNodeType::CData => "CDATA",
            XmlNodeType::Comment => "Comment",
            XmlNodeType::ProcessingInstruction => "ProcessingInstruction",
            XmlNodeType::XmlDeclaration => "XmlDeclaration",
            XmlNodeType::DocumentType => "DocumentType",
            XmlNodeType::Whitespace => "Whitespace",
            XmlNodeType::EndDocument => "EndDocument",
        };
        f.write_str(name)
    }
}

/// An attribute of the current element, names resolved and value decoded.
/// Namespace declarations are reported too, in the xmlns namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderAttribute {
    /// Qualified name as written
    pub name: String,
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespace_uri: Option<String>,
    pub value: String,
}
