//! DOM Module - Arena-based document tree
//!
//! Implements an efficient DOM representation shared by the XML and HTML
//! parsers:
//! - Arena allocation for nodes, attributes included
//! - NodeId (u32) indices in document order
//! - String interning for element/attribute names
//! - Namespace resolution stack while building

mod builder;
pub mod document;
pub mod namespace;
pub mod node;
pub mod serialize;
pub mod strings;

pub(crate) use builder::TreeBuilder;
pub use document::{ChildIter, DescendantIter, Document, DocumentKind};
pub use node::{NamespaceDecl, NodeId, NodeKind, XmlNode, DOCUMENT_NODE};
pub use serialize::serialize_node;
pub use strings::StringPool;

/// Read access to a document arena, consumed by the XPath engine.
///
/// Implementors supply node lookup and the string pool; navigation and
/// name accessors are derived from those.
pub trait DocumentAccess {
    /// Get root element ID
    fn root_element_id(&self) -> Option<NodeId>;

    /// Get a node by ID
    fn get_node(&self, id: NodeId) -> Option<&XmlNode>;

    /// Get the string pool for direct access
    fn strings(&self) -> &StringPool;

    /// HTML documents treat `id` and `lang` attributes as their XML
    /// counterparts
    fn is_html_document(&self) -> bool {
        false
    }

    fn document_node_id(&self) -> NodeId {
        DOCUMENT_NODE
    }

    fn node_kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.parent)
    }

    fn first_child_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.first_child)
    }

    fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.next_sibling)
    }

    fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.prev_sibling)
    }

    /// Qualified name of elements and attributes, target of PIs
    fn name_of(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::Attribute | NodeKind::ProcessingInstruction => {
                Some(self.strings().get(node.name_id))
            }
            _ => None,
        }
    }

    fn local_name_of(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::Attribute | NodeKind::ProcessingInstruction => {
                Some(self.strings().get(node.local_id))
            }
            _ => None,
        }
    }

    fn namespace_uri_of(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        (node.namespace_id != 0).then(|| self.strings().get(node.namespace_id))
    }

    /// Raw value of text-like, PI and attribute nodes
    fn value_of(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Document | NodeKind::Element => None,
            _ => Some(self.strings().get(node.value_id)),
        }
    }

    /// Attribute node IDs of an element (empty for other nodes)
    fn attribute_ids(&self, id: NodeId) -> std::ops::Range<NodeId> {
        match self.get_node(id) {
            Some(node) if node.kind == NodeKind::Element => node.attribute_ids(),
            _ => 0..0,
        }
    }

    /// Attribute value by qualified name
    fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attribute_ids(id)
            .find(|&attr| self.name_of(attr) == Some(name))
            .and_then(|attr| self.value_of(attr))
    }

    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.first_child_of(id);
        while let Some(child) = current {
            out.push(child);
            current = self.next_sibling_of(child);
        }
        out
    }

    /// Descendants in document order, attributes excluded
    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.first_child_of(id).into_iter().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(next) = self.next_sibling_of(current) {
                stack.push(next);
            }
            if let Some(child) = self.first_child_of(current) {
                stack.push(child);
            }
        }
        out
    }

    /// XPath string-value of a node
    fn string_value_of(&self, id: NodeId) -> String {
        match self.node_kind_of(id) {
            Some(NodeKind::Document) | Some(NodeKind::Element) => {
                let mut out = String::new();
                for desc in self.descendants_vec(id) {
                    if let Some(node) = self.get_node(desc) {
                        if node.is_text() {
                            out.push_str(self.strings().get(node.value_id));
                        }
                    }
                }
                out
            }
            Some(_) => self.value_of(id).unwrap_or("").to_string(),
            None => String::new(),
        }
    }
}
