//! XPath 1.0 Engine
//!
//! Full XPath 1.0 implementation with:
//! - All 13 axes (the namespace axis is always empty)
//! - The 27 core functions
//! - Namespace prefix and variable bindings on [`XPathContext`]
//! - Compiled expression caching while the library is initialized

pub mod axes;
pub mod cache;
pub mod compiler;
pub mod context;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use context::{Bindings, CompiledXPath, XPathContext, XPathObject, XPathObjectKind};
pub use value::XPathValue;

use crate::error::Result;

/// Compile an expression for repeated evaluation.
///
/// Syntax errors, unknown functions and wrong argument counts are reported
/// here; prefixes and variables are resolved when the expression runs.
pub fn compile(xpath: &str) -> Result<CompiledXPath> {
    let expr = cache::get_or_compile(xpath)?;
    Ok(CompiledXPath::new(xpath, expr))
}
