//! Error types for corpus construction and query compilation.

use thiserror::Error;

/// Errors raised while compiling a span query against a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A wildcard expanded to more terms than allowed.
    #[error(
        "query too broad: pattern '{pattern}' on annotation '{annotation}' matches {matched} terms (limit {limit})"
    )]
    TooBroad {
        /// Annotation the pattern was matched against.
        annotation: String,
        /// The offending pattern.
        pattern: String,
        /// Number of terms matched before giving up.
        matched: usize,
        /// Configured expansion limit.
        limit: usize,
    },

    /// The corpus has no such annotation.
    #[error("unknown annotation '{0}'")]
    UnknownAnnotation(String),

    /// A wildcard pattern could not be parsed.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The pattern as given.
        pattern: String,
        /// Parser message.
        message: String,
    },
}

/// Errors raised while building an in-memory corpus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorpusError {
    /// Annotations of one document disagree on the token count.
    #[error(
        "document {doc}: annotation '{annotation}' has {actual} tokens, expected {expected}"
    )]
    AnnotationLengthMismatch {
        /// Document index.
        doc: u32,
        /// Offending annotation.
        annotation: String,
        /// Token count of the first annotation.
        expected: usize,
        /// Token count of this annotation.
        actual: usize,
    },

    /// A tag lies outside its document.
    #[error("document {doc}: tag '{name}' [{start}, {end}) outside {length} tokens")]
    TagOutOfRange {
        /// Document index.
        doc: u32,
        /// Tag name.
        name: String,
        /// Start position.
        start: u32,
        /// End position.
        end: u32,
        /// Document length in tokens.
        length: usize,
    },
}
