//! XPath Axes Implementation
//!
//! All 13 XPath 1.0 axes:
//! - child, parent, self
//! - descendant, descendant-or-self
//! - ancestor, ancestor-or-self
//! - following, following-sibling
//! - preceding, preceding-sibling
//! - attribute, namespace
//!
//! Forward axes return nodes in document order, reverse axes nearest-first,
//! so an index into the result is the proximity position.

use super::parser::Axis;
use crate::dom::{DocumentAccess, NodeId, NodeKind};

/// Navigate along an axis from a context node
pub fn navigate<D: DocumentAccess>(doc: &D, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children_vec(context),
        Axis::Descendant => doc.descendants_vec(context),
        Axis::DescendantOrSelf => descendant_or_self_axis(doc, context),
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestor_axis(doc, context),
        Axis::AncestorOrSelf => ancestor_or_self_axis(doc, context),
        Axis::FollowingSibling => following_sibling_axis(doc, context),
        Axis::PrecedingSibling => preceding_sibling_axis(doc, context),
        Axis::Following => following_axis(doc, context),
        Axis::Preceding => preceding_axis(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute => doc.attribute_ids(context).collect(),
        // Namespace nodes are not materialized
        Axis::Namespace => Vec::new(),
    }
}

fn is_attribute<D: DocumentAccess>(doc: &D, id: NodeId) -> bool {
    doc.node_kind_of(id) == Some(NodeKind::Attribute)
}

/// descendant-or-self:: axis - context node plus all descendants
fn descendant_or_self_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let descendants = doc.descendants_vec(context);
    let mut result = Vec::with_capacity(1 + descendants.len());
    result.push(context);
    result.extend(descendants);
    result
}

/// ancestor:: axis - parent, grandparent, ... up to the document node
fn ancestor_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;
    while let Some(parent) = doc.parent_of(current) {
        result.push(parent);
        current = parent;
    }
    result
}

fn ancestor_or_self_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = vec![context];
    result.extend(ancestor_axis(doc, context));
    result
}

/// following-sibling:: axis, empty for attributes
fn following_sibling_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut sibling = doc.next_sibling_of(context);
    while let Some(sib_id) = sibling {
        result.push(sib_id);
        sibling = doc.next_sibling_of(sib_id);
    }
    result
}

/// preceding-sibling:: axis, nearest first
fn preceding_sibling_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut sibling = doc.prev_sibling_of(context);
    while let Some(sib_id) = sibling {
        result.push(sib_id);
        sibling = doc.prev_sibling_of(sib_id);
    }
    result
}

/// following:: axis - nodes after the context in document order, excluding
/// its descendants. For an attribute that starts with its owner's content.
fn following_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut start = context;
    if is_attribute(doc, context) {
        if let Some(owner) = doc.parent_of(context) {
            result.extend(doc.descendants_vec(owner));
            start = owner;
        }
    }

    let mut current = Some(start);
    while let Some(node) = current {
        let mut sibling = doc.next_sibling_of(node);
        while let Some(sib_id) = sibling {
            result.push(sib_id);
            result.extend(doc.descendants_vec(sib_id));
            sibling = doc.next_sibling_of(sib_id);
        }
        current = doc.parent_of(node);
    }
    result
}

/// preceding:: axis - nodes before the context in document order, excluding
/// ancestors, nearest first
fn preceding_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let target = if is_attribute(doc, context) {
        doc.parent_of(context).unwrap_or(context)
    } else {
        context
    };
    let ancestors = ancestor_axis(doc, target);
    let mut result: Vec<NodeId> = doc
        .descendants_vec(doc.document_node_id())
        .into_iter()
        .take_while(|&id| id != target)
        .filter(|id| !ancestors.contains(id))
        .collect();
    result.reverse();
    result
}

/// Node test with prefixes already resolved to namespace URIs
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTest<'t> {
    /// `*`: any node of the principal type
    Principal,
    /// Expanded name; `None` namespace means no namespace
    Name {
        namespace: Option<&'t str>,
        local: &'t str,
    },
    /// `prefix:*`
    Namespace(&'t str),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<&'t str>),
}

/// Check if a node matches a resolved node test.
///
/// `principal` is the principal node type of the axis: attributes on the
/// attribute axis, elements everywhere else.
pub fn matches_node_test<D: DocumentAccess>(
    doc: &D,
    node_id: NodeId,
    test: &ResolvedTest<'_>,
    principal: NodeKind,
) -> bool {
    let Some(kind) = doc.node_kind_of(node_id) else {
        return false;
    };

    match test {
        ResolvedTest::Principal => kind == principal,
        ResolvedTest::Name { namespace, local } => {
            kind == principal
                && doc.local_name_of(node_id) == Some(*local)
                && doc.namespace_uri_of(node_id) == *namespace
        }
        ResolvedTest::Namespace(uri) => kind == principal && doc.namespace_uri_of(node_id) == Some(*uri),
        ResolvedTest::Node => true,
        ResolvedTest::Text => matches!(kind, NodeKind::Text | NodeKind::CData),
        ResolvedTest::Comment => kind == NodeKind::Comment,
        ResolvedTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target.is_none_or(|expected| doc.name_of(node_id) == Some(expected))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, DOCUMENT_NODE};

    fn named(doc: &Document, name: &str) -> NodeId {
        doc.descendants(DOCUMENT_NODE)
            .find(|&id| doc.node_name(id) == Some(name))
            .unwrap()
    }

    fn names(doc: &Document, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| doc.node_name(id).unwrap_or("#").to_string())
            .collect()
    }

    #[test]
    fn test_child_axis() {
        let doc = Document::parse_str("<root><a/><b/></root>").unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(navigate(&doc, root, Axis::Child).len(), 2);
    }

    #[test]
    fn test_descendant_axis() {
        let doc = Document::parse_str("<root><a><b/></a><c/></root>").unwrap();
        let root = doc.root_element().unwrap();
        let descendants = navigate(&doc, root, Axis::Descendant);
        assert_eq!(names(&doc, &descendants), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ancestor_axis() {
        let doc = Document::parse_str("<root><a><b/></a></root>").unwrap();
        let b = named(&doc, "b");
        let ancestors = navigate(&doc, b, Axis::Ancestor);
        // a, root, document
        assert_eq!(ancestors.len(), 3);
        assert_eq!(ancestors[2], DOCUMENT_NODE);
    }

    #[test]
    fn test_sibling_axes() {
        let doc = Document::parse_str("<r><a/><b/><c/><d/></r>").unwrap();
        let c = named(&doc, "c");
        assert_eq!(names(&doc, &navigate(&doc, c, Axis::PrecedingSibling)), vec!["b", "a"]);
        assert_eq!(names(&doc, &navigate(&doc, c, Axis::FollowingSibling)), vec!["d"]);
    }

    #[test]
    fn test_following_and_preceding() {
        let doc = Document::parse_str("<r><a><a1/></a><b><b1/></b><c><c1/></c></r>").unwrap();
        let b = named(&doc, "b");
        assert_eq!(names(&doc, &navigate(&doc, b, Axis::Following)), vec!["c", "c1"]);
        assert_eq!(names(&doc, &navigate(&doc, b, Axis::Preceding)), vec!["a1", "a"]);
    }

    #[test]
    fn test_attribute_axis() {
        let doc = Document::parse_str(r#"<r><e x="1" y="2"><k/></e><z/></r>"#).unwrap();
        let e = named(&doc, "e");
        let attrs = navigate(&doc, e, Axis::Attribute);
        assert_eq!(names(&doc, &attrs), vec!["x", "y"]);
        assert_eq!(navigate(&doc, attrs[0], Axis::Parent), vec![e]);
        // following of an attribute includes the owner's content
        assert_eq!(names(&doc, &navigate(&doc, attrs[1], Axis::Following)), vec!["k", "z"]);
        assert!(navigate(&doc, attrs[0], Axis::FollowingSibling).is_empty());
        assert!(navigate(&doc, e, Axis::Namespace).is_empty());
    }

    #[test]
    fn test_matches_name_with_namespace() {
        let doc = Document::parse_str(r#"<r xmlns:p="urn:p"><p:x/><x/></r>"#).unwrap();
        let root = doc.root_element().unwrap();
        let children = navigate(&doc, root, Axis::Child);
        let qualified = ResolvedTest::Name {
            namespace: Some("urn:p"),
            local: "x",
        };
        let plain = ResolvedTest::Name {
            namespace: None,
            local: "x",
        };
        assert!(matches_node_test(&doc, children[0], &qualified, NodeKind::Element));
        assert!(!matches_node_test(&doc, children[1], &qualified, NodeKind::Element));
        assert!(matches_node_test(&doc, children[1], &plain, NodeKind::Element));
        assert!(matches_node_test(&doc, children[0], &ResolvedTest::Namespace("urn:p"), NodeKind::Element));
    }
}
