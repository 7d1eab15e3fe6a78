//! Error types shared by every capability group.
//!
//! Parsers, the reader and the XPath engine all report through [`Error`],
//! carrying the byte offset or name that caused the failure so callers can
//! surface it unchanged.

use std::io;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed markup encountered in strict mode.
    #[error("parse error at byte {position}: {message}")]
    Parse { message: String, position: usize },

    #[error("unsupported encoding '{0}'")]
    UnsupportedEncoding(String),

    /// Input was empty or could not be decoded at all.
    #[error("invalid source data")]
    InvalidSourceData,

    /// Document parsed but contains no root element.
    #[error("document has no root element")]
    NoRoot,

    #[error("XPath syntax error at {position}: {message}")]
    XPathSyntax { message: String, position: usize },

    #[error("undefined namespace prefix '{0}'")]
    UndefinedPrefix(String),

    #[error("undefined variable '${0}'")]
    UndefinedVariable(String),

    #[error("unknown XPath function '{0}'")]
    UnknownFunction(String),

    /// Operand of the wrong type, e.g. a number where a node-set is required.
    #[error("XPath type error: {0}")]
    XPathType(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("library is already initialized")]
    AlreadyInitialized,

    #[error("reader is closed")]
    ReaderClosed,
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>, position: usize) -> Self {
        Error::Parse {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        Error::XPathSyntax {
            message: message.into(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_position() {
        let err = Error::parse("unexpected end tag", 12);
        assert_eq!(err.to_string(), "parse error at byte 12: unexpected end tag");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
