//! Option structs for the library lifecycle, the parsers and the reader.
//!
//! All options are plain data with `Default` plus `with_*` builders so they
//! can be assembled inline at the call site.

/// Bound on the compiled-XPath LRU cache.
pub const DEFAULT_XPATH_CACHE_SIZE: usize = 256;

/// Settings applied by [`crate::init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Number of compiled XPath expressions kept while the library is
    /// initialized. Zero disables caching.
    pub xpath_cache_size: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig {
            xpath_cache_size: DEFAULT_XPATH_CACHE_SIZE,
        }
    }
}

impl LibraryConfig {
    pub fn with_xpath_cache_size(mut self, size: usize) -> Self {
        self.xpath_cache_size = size;
        self
    }
}

/// XML document parsing options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep going after well-formedness errors instead of failing.
    pub recover: bool,
    /// Drop whitespace-only text nodes.
    pub no_blanks: bool,
    /// Force an input encoding, overriding BOM and declaration sniffing.
    pub encoding: Option<String>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recover(mut self, recover: bool) -> Self {
        self.recover = recover;
        self
    }

    pub fn with_no_blanks(mut self, no_blanks: bool) -> Self {
        self.no_blanks = no_blanks;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }
}

/// HTML parsing options.
///
/// The default matches the lenient settings most callers want: recover from
/// errors, drop blank text, keep the implied `html`/`head`/`body` elements
/// and stay quiet about recovered errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlParseOptions {
    pub recover: bool,
    pub no_blanks: bool,
    /// Do not synthesize missing `html`, `head` and `body` elements.
    pub no_implied: bool,
    /// Suppress `warn!` output for recovered errors.
    pub no_warnings: bool,
    pub encoding: Option<String>,
}

impl Default for HtmlParseOptions {
    fn default() -> Self {
        HtmlParseOptions {
            recover: true,
            no_blanks: true,
            no_implied: false,
            no_warnings: true,
            encoding: None,
        }
    }
}

impl HtmlParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recover(mut self, recover: bool) -> Self {
        self.recover = recover;
        self
    }

    pub fn with_no_blanks(mut self, no_blanks: bool) -> Self {
        self.no_blanks = no_blanks;
        self
    }

    pub fn with_no_implied(mut self, no_implied: bool) -> Self {
        self.no_implied = no_implied;
        self
    }

    pub fn with_no_warnings(mut self, no_warnings: bool) -> Self {
        self.no_warnings = no_warnings;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }
}

/// Streaming reader options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Skip whitespace-only text instead of reporting `Whitespace` nodes.
    pub no_blanks: bool,
    /// Accept malformed markup instead of failing `read()`.
    pub recover: bool,
    pub encoding: Option<String>,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_no_blanks(mut self, no_blanks: bool) -> Self {
        self.no_blanks = no_blanks;
        self
    }

    pub fn with_recover(mut self, recover: bool) -> Self {
        self.recover = recover;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_defaults_are_lenient() {
        let opts = HtmlParseOptions::default();
        assert!(opts.recover);
        assert!(opts.no_blanks);
        assert!(!opts.no_implied);
    }

    #[test]
    fn test_builders() {
        let opts = ParseOptions::new()
            .with_recover(true)
            .with_encoding("ISO-8859-1");
        assert!(opts.recover);
        assert_eq!(opts.encoding.as_deref(), Some("ISO-8859-1"));

        let cfg = LibraryConfig::default().with_xpath_cache_size(8);
        assert_eq!(cfg.xpath_cache_size, 8);
    }
}
