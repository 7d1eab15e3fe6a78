//! XPath evaluation context
//!
//! [`XPathContext`] borrows a document and carries what an expression is
//! evaluated against: the context node, namespace prefix bindings, variable
//! bindings and the default element namespace. Results come back as
//! [`XPathObject`], tied to the same document.

use super::cache;
use super::compiler::CompiledExpr;
use super::eval::{evaluate_compiled, EvalContext};
use super::value::XPathValue;
use crate::dom::namespace::ns;
use crate::dom::{Document, NodeId, DOCUMENT_NODE};
use crate::error::{Error, Result};
use log::debug;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Prefix and variable bindings visible to an expression
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    namespaces: HashMap<String, String>,
    variables: HashMap<String, XPathValue>,
    default_element_namespace: Option<String>,
}

impl Bindings {
    /// Namespace URI bound to `prefix`. `xml` is always bound.
    pub fn lookup_ns(&self, prefix: &str) -> Option<&str> {
        match self.namespaces.get(prefix) {
            Some(uri) => Some(uri.as_str()),
            None if prefix == "xml" => Some(ns::XML),
            None => None,
        }
    }

    pub fn set_namespace(&mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Option<String> {
        self.namespaces.insert(prefix.into(), uri.into())
    }

    pub fn remove_namespace(&mut self, prefix: &str) -> Option<String> {
        self.namespaces.remove(prefix)
    }

    pub fn variable(&self, name: &str) -> Option<&XPathValue> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: XPathValue) -> Option<XPathValue> {
        self.variables.insert(name.into(), value)
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<XPathValue> {
        self.variables.remove(name)
    }

    pub fn default_element_namespace(&self) -> Option<&str> {
        self.default_element_namespace.as_deref()
    }

    pub fn set_default_element_namespace(&mut self, uri: Option<String>) {
        self.default_element_namespace = uri;
    }
}

/// A compiled expression, reusable across contexts and documents
#[derive(Debug, Clone)]
pub struct CompiledXPath {
    source: String,
    expr: Arc<CompiledExpr>,
}

impl CompiledXPath {
    pub(crate) fn new(source: &str, expr: Arc<CompiledExpr>) -> Self {
        CompiledXPath {
            source: source.to_string(),
            expr,
        }
    }

    /// The expression text this was compiled from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub(crate) fn expr(&self) -> &CompiledExpr {
        &self.expr
    }
}

/// Type of an evaluation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPathObjectKind {
    NodeSet,
    Boolean,
    Number,
    String,
}

/// Result of evaluating an expression against a document
#[derive(Debug, Clone)]
pub struct XPathObject<'d> {
    doc: &'d Document,
    value: XPathValue,
}

impl<'d> XPathObject<'d> {
    pub fn kind(&self) -> XPathObjectKind {
        match self.value {
            XPathValue::NodeSet(_) => XPathObjectKind::NodeSet,
            XPathValue::Boolean(_) => XPathObjectKind::Boolean,
            XPathValue::Number(_) => XPathObjectKind::Number,
            XPathValue::String(_) => XPathObjectKind::String,
        }
    }

    /// Nodes of a node-set result in document order; empty for other kinds
    pub fn nodes(&self) -> &[NodeId] {
        self.value.as_nodeset().unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    /// XPath string() of the result
    pub fn string_value(&self) -> String {
        self.value.to_string_value(self.doc)
    }

    /// XPath number() of the result
    pub fn number(&self) -> f64 {
        self.value.to_number(self.doc)
    }

    /// XPath boolean() of the result
    pub fn boolean(&self) -> bool {
        self.value.to_boolean()
    }

    pub fn value(&self) -> &XPathValue {
        &self.value
    }

    pub fn into_value(self) -> XPathValue {
        self.value
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }
}

/// Evaluation context over one document
#[derive(Debug, Clone)]
pub struct XPathContext<'d> {
    doc: &'d Document,
    bindings: Bindings,
    context_node: NodeId,
}

impl<'d> XPathContext<'d> {
    /// New context positioned at the document node, with no bindings
    pub fn new(doc: &'d Document) -> Self {
        XPathContext {
            doc,
            bindings: Bindings::default(),
            context_node: DOCUMENT_NODE,
        }
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    pub fn context_node(&self) -> NodeId {
        self.context_node
    }

    /// Set the node relative paths start from
    pub fn set_context_node(&mut self, id: NodeId) -> Result<()> {
        if self.doc.get_node(id).is_none() {
            return Err(Error::XPathType(format!("node {} is not part of the document", id)));
        }
        self.context_node = id;
        Ok(())
    }

    /// Bind `prefix` to `uri` for name tests, replacing an earlier binding.
    ///
    /// The prefix must be a non-empty NCName.
    pub fn register_ns(&mut self, prefix: &str, uri: &str) -> Result<()> {
        if prefix.is_empty() || prefix.contains(':') {
            return Err(Error::UndefinedPrefix(prefix.to_string()));
        }
        self.bindings.set_namespace(prefix, uri);
        Ok(())
    }

    /// Remove a prefix binding, returning the URI it was bound to
    pub fn unregister_ns(&mut self, prefix: &str) -> Option<String> {
        self.bindings.remove_namespace(prefix)
    }

    pub fn lookup_ns(&self, prefix: &str) -> Option<&str> {
        self.bindings.lookup_ns(prefix)
    }

    /// Register every prefixed namespace declared in the document, then the
    /// bindings added with `Document::register_namespace` (those win).
    /// Prefixes already bound on this context are left alone.
    pub fn register_namespaces_from_document(&mut self) {
        let doc = self.doc;
        let mut added = 0usize;
        for (prefix, uri) in doc.declared_namespaces() {
            let Some(prefix) = prefix else { continue };
            if self.bindings.lookup_ns(prefix).is_none() {
                self.bindings.set_namespace(prefix, uri);
                added += 1;
            }
        }
        for (prefix, uri) in doc.registered_namespaces() {
            self.bindings.set_namespace(prefix.as_str(), uri.as_str());
            added += 1;
        }
        debug!("registered {} namespace bindings from document", added);
    }

    /// Bind `$name` to a value, replacing an earlier binding
    pub fn register_variable(&mut self, name: &str, value: impl Into<XPathValue>) {
        self.bindings.set_variable(name, value.into());
    }

    pub fn unregister_variable(&mut self, name: &str) -> Option<XPathValue> {
        self.bindings.remove_variable(name)
    }

    /// Namespace unprefixed element name tests match; `None` means no
    /// namespace
    pub fn set_default_element_namespace(&mut self, uri: Option<&str>) {
        self.bindings.set_default_element_namespace(uri.map(str::to_string));
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Compile (through the cache when active) and evaluate an expression
    pub fn eval(&self, xpath: &str) -> Result<XPathObject<'d>> {
        let compiled = cache::get_or_compile(xpath)?;
        self.run(&compiled)
    }

    pub fn eval_compiled(&self, compiled: &CompiledXPath) -> Result<XPathObject<'d>> {
        self.run(compiled.expr())
    }

    /// Evaluate several expressions in parallel against this context
    pub fn eval_many(&self, xpaths: &[&str]) -> Vec<Result<XPathObject<'d>>> {
        xpaths.par_iter().map(|xpath| self.eval(xpath)).collect()
    }

    fn run(&self, expr: &CompiledExpr) -> Result<XPathObject<'d>> {
        let ctx = EvalContext::new(self.doc, &self.bindings, self.context_node);
        let value = evaluate_compiled(expr, &ctx)?;
        Ok(XPathObject { doc: self.doc, value })
    }
}
