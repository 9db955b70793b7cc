//! Error types for the Metalink library.
//!
//! [`Error`] is the internal taxonomy used while a document is being
//! ingested. Callers of the processor see a single [`ParseError`] that
//! carries the specific reason.

use thiserror::Error;

/// Reasons a Metalink document can fail to parse.
#[derive(Error, Debug)]
pub enum Error {
    /// The byte source held fewer bytes than the encoding probe needs
    #[error("too small data for parsing XML: {available} byte(s) available")]
    SourceTooSmall {
        /// Number of bytes the probe read managed to obtain
        available: usize,
    },

    /// The tokenizer rejected the byte stream as malformed XML
    #[error("XML syntax error: {0}")]
    Syntax(String),

    /// An element, attribute or ordering violates the Metalink grammar
    #[error("Metalink grammar error: {0}")]
    Grammar(String),

    /// The input ended before the document element was closed
    #[error("incomplete Metalink document")]
    IncompleteDocument,

    /// IO error while reading the byte source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a grammar error from anything displayable.
    pub(crate) fn grammar(message: impl Into<String>) -> Self {
        Error::Grammar(message.into())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            // The source failed underneath the tokenizer
            quick_xml::Error::Io(io) => Error::Io(std::io::Error::new(io.kind(), io.to_string())),
            other => Error::Syntax(other.to_string()),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Syntax(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::Syntax(err.to_string())
    }
}

/// The caller-visible failure: the document could not be parsed.
///
/// The specific [`Error`] is kept as the reason and exposed as the error
/// source.
#[derive(Error, Debug)]
#[error("cannot parse Metalink document: {reason}")]
pub struct ParseError {
    #[source]
    reason: Error,
}

impl ParseError {
    /// Returns the specific reason the parse failed.
    pub fn reason(&self) -> &Error {
        &self.reason
    }

    /// Consumes the failure and returns its reason.
    pub fn into_reason(self) -> Error {
        self.reason
    }
}

impl From<Error> for ParseError {
    fn from(reason: Error) -> Self {
        Self { reason }
    }
}

/// Result type alias for Metalink operations.
pub type Result<T> = std::result::Result<T, Error>;
