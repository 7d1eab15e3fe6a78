//! xpaver - one import point for XML reading, XPath and HTML
//!
//! Groups:
//! - Streaming reader: pull-style XML reading (`XmlReader`)
//! - XPath: XPath 1.0 compilation and evaluation over a `Document`
//! - XPath context: namespace prefix and variable registration
//! - HTML: lenient HTML parsing and HTML serialization
//!
//! Everything is re-exported at the crate root and in [`prelude`]. The
//! engines behave like libxml2 2.9: XPath 1.0 and HTML4-style implied
//! `html`/`head`/`body` elements.
//!
//! ```
//! use xpaver::prelude::*;
//!
//! let doc = xpaver::html::parse_str("<html><body><p>hi</p></body></html>").unwrap();
//! let ctx = XPathContext::new(&doc);
//! assert_eq!(ctx.eval("//p/text()").unwrap().string_value(), "hi");
//! ```

pub mod config;
pub mod core;
pub mod dom;
pub mod error;
pub mod html;
pub mod node;
pub mod reader;
pub mod xpath;

use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};

pub use config::{HtmlParseOptions, LibraryConfig, ParseOptions, ReaderOptions};
pub use dom::{Document, DocumentKind, NodeId, NodeKind, DOCUMENT_NODE};
pub use error::{Error, Result};
pub use node::{EvalResult, Node};
pub use reader::{ReaderAttribute, XmlNodeType, XmlReader};
pub use xpath::{CompiledXPath, XPathContext, XPathObject, XPathObjectKind, XPathValue};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Library Lifecycle
// ============================================================================

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Guard for the library-wide state. Created by [`init`]; dropping it (or
/// calling [`Library::shutdown`]) tears the state down again.
#[derive(Debug)]
#[must_use = "dropping the guard shuts the library down"]
pub struct Library {
    config: LibraryConfig,
    active: bool,
}

/// Initialize library-wide state: installs the compiled-XPath cache sized
/// by `config`. Fails with `Error::AlreadyInitialized` while another guard
/// is alive. Every operation also works without it, only uncached.
pub fn init(config: LibraryConfig) -> Result<Library> {
    if INITIALIZED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return Err(Error::AlreadyInitialized);
    }
    xpath::cache::install(config.xpath_cache_size);
    debug!("xpaver initialized: {:?}", config);
    Ok(Library { config, active: true })
}

/// Whether a [`Library`] guard is currently alive
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

impl Library {
    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Explicit teardown, same as dropping the guard
    pub fn shutdown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        xpath::cache::uninstall();
        INITIALIZED.store(false, Ordering::Release);
        debug!("xpaver shut down");
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        self.release();
    }
}

/// Everything a consumer needs, for glob import
pub mod prelude {
    pub use crate::config::{HtmlParseOptions, LibraryConfig, ParseOptions, ReaderOptions};
    pub use crate::dom::{Document, DocumentKind, NodeId, NodeKind, DOCUMENT_NODE};
    pub use crate::error::{Error, Result};
    pub use crate::html;
    pub use crate::node::{EvalResult, Node};
    pub use crate::reader::{ReaderAttribute, XmlNodeType, XmlReader};
    pub use crate::xpath::{self, CompiledXPath, XPathContext, XPathObject, XPathObjectKind, XPathValue};
}

#[cfg(test)]
mod tests {
    // Glob plus explicit import of the same items must not conflict
    use crate::prelude::*;
    use crate::{XPathContext, XmlReader};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_html_text_query() {
        init_logging();
        let doc = html::parse(b"<html><body><p>hi</p></body></html>").unwrap();
        let ctx = XPathContext::new(&doc);
        let result = ctx.eval("//p/text()").unwrap();
        assert_eq!(result.kind(), XPathObjectKind::NodeSet);
        assert_eq!(result.node_count(), 1);
        assert_eq!(result.string_value(), "hi");
    }

    #[test]
    fn test_reader_names() {
        init_logging();
        let mut reader = XmlReader::from_str("<a><b/></a>").unwrap();
        let mut seen = Vec::new();
        while reader.read().unwrap() {
            seen.push((reader.node_type(), reader.name().to_string(), reader.is_empty_element()));
        }
        assert_eq!(
            seen,
            vec![
                (XmlNodeType::Element, "a".to_string(), false),
                (XmlNodeType::Element, "b".to_string(), true),
                (XmlNodeType::EndElement, "a".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_registered_prefix_matches_default_namespace() {
        init_logging();
        let doc = Document::parse_str(r#"<x xmlns="urn:test"/>"#).unwrap();
        let mut ctx = XPathContext::new(&doc);
        ctx.register_ns("ns", "urn:test").unwrap();
        assert_eq!(ctx.eval("//ns:x").unwrap().node_count(), 1);
        // Without a binding the prefix is an error, and plain `x` is in no namespace
        let bare = XPathContext::new(&doc);
        assert!(matches!(bare.eval("//ns:x"), Err(Error::UndefinedPrefix(_))));
        assert_eq!(bare.eval("//x").unwrap().node_count(), 0);
    }

    #[test]
    fn test_library_lifecycle() {
        init_logging();
        let library = crate::init(LibraryConfig::default().with_xpath_cache_size(8)).unwrap();
        assert!(crate::is_initialized());
        assert_eq!(library.config().xpath_cache_size, 8);
        assert!(matches!(crate::init(LibraryConfig::default()), Err(Error::AlreadyInitialized)));

        let doc = Document::parse_str("<r><i/><i/></r>").unwrap();
        let ctx = XPathContext::new(&doc);
        assert_eq!(ctx.eval("count(//i)").unwrap().number(), 2.0);
        assert!(xpath::cache::is_active());

        library.shutdown();
        assert!(!crate::is_initialized());
        assert!(!xpath::cache::is_active());

        // Scoped guard: teardown on drop
        {
            let _library = crate::init(LibraryConfig::default()).unwrap();
            assert!(crate::is_initialized());
        }
        assert!(!crate::is_initialized());
    }

    #[test]
    fn test_every_group_is_reachable() {
        init_logging();
        let doc = html::parse_with_options(b"<p>a<br>b", &HtmlParseOptions::default()).unwrap();
        let html_out = html::serialize_document(&doc);
        assert!(html_out.contains("<br>"));
        let p = doc.root().unwrap().first("//p").unwrap().unwrap();
        assert_eq!(html::serialize_node(&doc, p.id()), "<p>a<br>b</p>");

        let compiled = xpath::compile("count(//br)").unwrap();
        let mut ctx = XPathContext::new(&doc);
        assert_eq!(ctx.eval_compiled(&compiled).unwrap().number(), 1.0);
        ctx.register_variable("n", 3.0);
        assert_eq!(ctx.eval("$n + 1").unwrap().number(), 4.0);
        assert!(ctx.unregister_variable("n").is_some());
        assert!(matches!(ctx.eval("$n"), Err(Error::UndefinedVariable(_))));

        let results = ctx.eval_many(&["count(//p)", "string(//p)"]);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));

        let mut reader = XmlReader::from_bytes(b"<r>t</r>", ReaderOptions::default()).unwrap();
        assert!(reader.read().unwrap());
        assert_eq!(reader.node_type(), XmlNodeType::Element);
    }
}
