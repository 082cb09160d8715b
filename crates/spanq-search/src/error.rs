//! Error types for search construction and execution.

use spanq_results::ResultsError;
use spanq_spans::QueryError;
use thiserror::Error;

/// Why a search could not be built or did not complete.
///
/// Cloneable so one failure can be handed to every caller sharing an execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// A term or pattern expands to more terms than allowed. Raised while the
    /// search is being built, before anything runs.
    #[error(
        "query too broad: '{pattern}' on '{annotation}' matches {matched} terms (limit {limit})"
    )]
    QueryTooBroad {
        /// Annotation searched.
        annotation: String,
        /// The offending term or pattern.
        pattern: String,
        /// Terms matched before giving up.
        matched: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A parameter cannot be satisfied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The search was cancelled before it completed.
    #[error("search was cancelled")]
    Cancelled,

    /// Evaluation failed for any other reason.
    #[error("search failed: {0}")]
    ExecutionFailed(String),
}

impl From<QueryError> for SearchError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::TooBroad {
                annotation,
                pattern,
                matched,
                limit,
            } => Self::QueryTooBroad {
                annotation,
                pattern,
                matched,
                limit,
            },
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

impl From<ResultsError> for SearchError {
    fn from(err: ResultsError) -> Self {
        match err {
            ResultsError::InvalidArgument(message) => Self::InvalidArgument(message),
            ResultsError::Cancelled => Self::Cancelled,
        }
    }
}
