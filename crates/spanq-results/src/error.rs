//! Error types for the spanq-results crate.

use spanq_spans::Cancelled;
use thiserror::Error;

/// Errors raised by hit materialization and the derivations built on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResultsError {
    /// A derivation was called with arguments that cannot be satisfied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Cancellation was requested while reading hits.
    #[error("cancelled while reading hits")]
    Cancelled,
}

impl ResultsError {
    /// Creates an `InvalidArgument` error.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<Cancelled> for ResultsError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}
