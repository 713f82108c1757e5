//! Error types for the repomind-parsing crate

use thiserror::Error;

/// Result type alias for parsing operations
pub type ParsingResult<T> = Result<T, ParsingError>;

/// Errors raised while parsing or chunking a file
#[derive(Debug, Error)]
pub enum ParsingError {
    /// Tree-sitter grammar could not be loaded into the parser
    #[error("grammar error for {language}: {reason}")]
    Grammar { language: String, reason: String },

    /// Source text could not be read as UTF-8 at a node boundary
    #[error("source text error: {0}")]
    SourceText(String),
}

impl repomind_common::ErrorClass for ParsingError {
    fn kind(&self) -> repomind_common::ErrorKind {
        repomind_common::ErrorKind::Internal
    }
}
