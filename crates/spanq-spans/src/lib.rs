//! Positional occurrence streams and the span algebra built on them.
//!
//! This crate holds everything below the hit-result layer:
//!
//! - [`Interval`] and the [`OccurrenceSource`] stream contract
//! - the [`Corpus`] collaborator and its in-memory rendition, [`MemoryCorpus`]
//! - per-annotation [`Terms`] lexicons with case-sensitive and case-folded ordering
//! - span queries ([`SpanQuery`]) and their compiled, openable form
//! - the interval relation filter ([`PositionFilterSource`])
//! - cooperative cancellation ([`CancellationToken`])

#![warn(missing_docs)]

mod cancel;
mod corpus;
mod error;
mod filter;
mod interval;
mod query;
mod source;
mod terms;

pub use cancel::{CancellationToken, Cancelled};
pub use corpus::{
    Corpus, CorpusBuilder, CorpusId, InputDocument, InputTag, MemoryCorpus, WORD_ANNOTATION,
};
pub use error::{CorpusError, QueryError};
pub use filter::{PositionFilterSource, RelationOp, relation_mask};
pub use interval::Interval;
pub use query::{CompiledQuery, SpanQuery};
pub use source::{
    CaptureSource, Captures, DocIntervals, ListSource, MergedSource, OccurrenceSource,
    collect_all, postings_from_triples,
};
pub use terms::{MatchSensitivity, Terms, TermsBuilder};
