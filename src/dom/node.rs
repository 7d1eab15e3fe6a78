//! Arena node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references. Ids are
//! handed out in document order: an element's attribute nodes directly
//! follow the element and precede its children, so sorting ids sorts by
//! document order.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Id of the document node in every arena
pub const DOCUMENT_NODE: NodeId = 0;

/// Type of node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Attribute of an element (not part of the child list)
    Attribute,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
}

/// Element was written as `<name/>` (HTML void or XML empty tag)
pub(crate) const FLAG_SELF_CLOSED: u8 = 0b01;
/// Attribute was written without a value (`<input checked>`)
pub(crate) const FLAG_NO_VALUE: u8 = 0b10;

/// A node in the arena
///
/// String fields are ids into the owning document's `StringPool`; id 0 is
/// the empty string.
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    /// Parent node (None for the document node). For attributes, the owner element.
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Qualified name for elements and attributes, target for PIs
    pub name_id: u32,
    pub local_id: u32,
    pub prefix_id: u32,
    pub namespace_id: u32,
    /// Character data for text-like nodes, value for attributes
    pub value_id: u32,
    /// First attribute node (elements only)
    pub attr_start: NodeId,
    pub attr_count: u32,
    /// Slice of the document's namespace declaration table
    pub ns_start: u32,
    pub ns_count: u32,
    pub(crate) flags: u8,
}

impl XmlNode {
    /// Create an unlinked node of the given kind
    pub fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            local_id: 0,
            prefix_id: 0,
            namespace_id: 0,
            value_id: 0,
            attr_start: 0,
            attr_count: 0,
            ns_start: 0,
            ns_count: 0,
            flags: 0,
        }
    }

    /// Create the document node
    pub fn document() -> Self {
        Self::new(NodeKind::Document, None)
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Text or CDATA
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    #[inline]
    pub fn has_attributes(&self) -> bool {
        self.attr_count > 0
    }

    /// Ids of this element's attribute nodes
    #[inline]
    pub fn attribute_ids(&self) -> std::ops::Range<NodeId> {
        self.attr_start..self.attr_start + self.attr_count
    }

    #[inline]
    pub(crate) fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

/// An `xmlns` / `xmlns:prefix` declaration carried by an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// Prefix id, 0 for the default namespace
    pub prefix_id: u32,
    pub uri_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let doc = XmlNode::document();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.parent.is_none());
        assert!(!doc.has_children());
    }

    #[test]
    fn test_attribute_range() {
        let mut elem = XmlNode::new(NodeKind::Element, Some(0));
        elem.attr_start = 5;
        elem.attr_count = 2;
        assert!(elem.has_attributes());
        assert_eq!(elem.attribute_ids().collect::<Vec<_>>(), vec![5, 6]);
    }

    #[test]
    fn test_flags() {
        let mut attr = XmlNode::new(NodeKind::Attribute, Some(1));
        assert!(!attr.has_flag(FLAG_NO_VALUE));
        attr.flags |= FLAG_NO_VALUE;
        assert!(attr.has_flag(FLAG_NO_VALUE));
        assert!(!attr.has_flag(FLAG_SELF_CLOSED));
    }
}
