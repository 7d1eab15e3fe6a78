//! Namespace Resolution
//!
//! Stack-based namespace resolver used while building a tree (and by the
//! streaming reader). Bindings are string pool ids; prefix id 0 is the
//! default namespace.

use super::strings::StringPool;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI)
#[derive(Debug, Clone)]
struct NsBinding {
    prefix_id: u32,
    uri_id: u32,
    depth: usize,
}

/// Stack-based namespace resolver
#[derive(Debug, Clone)]
pub struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    depth: usize,
    xml_prefix_id: u32,
    xmlns_prefix_id: u32,
}

impl NamespaceResolver {
    /// Create a new namespace resolver with the predeclared `xml` prefix
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xmlns_prefix_id = strings.intern("xmlns");
        let xml_uri_id = strings.intern(ns::XML);

        let mut bindings = Vec::with_capacity(16);
        bindings.push(NsBinding {
            prefix_id: xml_prefix_id,
            uri_id: xml_uri_id,
            depth: 0,
        });

        NamespaceResolver {
            bindings,
            depth: 0,
            xml_prefix_id,
            xmlns_prefix_id,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a namespace binding for the current scope.
    /// Returns false for the reserved `xml` and `xmlns` prefixes.
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) -> bool {
        if prefix_id == self.xml_prefix_id || prefix_id == self.xmlns_prefix_id {
            return false;
        }
        self.bindings.push(NsBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
        true
    }

    /// Resolve a prefix to a namespace URI ID. An empty default namespace
    /// declaration (`xmlns=""`) resolves to Some(0).
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
    }

    /// Resolve the default namespace, 0 when none is in scope
    pub fn resolve_default(&self) -> u32 {
        self.resolve(0).unwrap_or(0)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}
