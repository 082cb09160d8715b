//! Progress snapshots.
//!
//! Everything here is plain data. A [`HitResults`](crate::HitResults) under
//! materialization publishes a fresh [`ResultsStats`] after every batch, so a
//! presentation layer can poll progress without touching the live hit buffer.

use serde::{Deserialize, Serialize};

/// Whether configured caps cut a read short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MaxStats {
    /// More hits were seen than the processing cap allows to be stored.
    pub hits_processed_exceeded: bool,
    /// Counting stopped at the counting cap before the source was exhausted.
    pub hits_counted_exceeded: bool,
}

impl MaxStats {
    /// Neither cap was hit.
    pub const NOT_EXCEEDED: Self = Self {
        hits_processed_exceeded: false,
        hits_counted_exceeded: false,
    };

    /// True if either cap was hit.
    pub fn any_exceeded(&self) -> bool {
        self.hits_processed_exceeded || self.hits_counted_exceeded
    }
}

/// Counters of a hit result at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultsStats {
    /// Hits stored so far.
    pub hits_processed: usize,
    /// Hits seen so far, stored or not.
    pub hits_counted: usize,
    /// Documents with at least one stored hit.
    pub docs_processed: usize,
    /// Documents with at least one seen hit.
    pub docs_counted: usize,
    /// No further hits will be read.
    pub done: bool,
    /// Caps hit so far.
    pub max_stats: MaxStats,
}

impl ResultsStats {
    /// Stats of a result nobody has read from yet.
    pub const NOT_STARTED: Self = Self {
        hits_processed: 0,
        hits_counted: 0,
        docs_processed: 0,
        docs_counted: 0,
        done: false,
        max_stats: MaxStats::NOT_EXCEEDED,
    };

    /// Stats of a fully materialized hit list.
    pub fn complete(hits: usize, docs: usize, max_stats: MaxStats) -> Self {
        Self {
            hits_processed: hits,
            hits_counted: hits,
            docs_processed: docs,
            docs_counted: docs,
            done: true,
            max_stats,
        }
    }

    /// Whether at least `n` hits had been stored when this snapshot was taken.
    pub fn processed_at_least(&self, n: usize) -> bool {
        self.hits_processed >= n
    }
}

/// Where a windowed result sits in its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowStats {
    /// The source has hits after this window.
    pub has_next: bool,
    /// Index of the first hit of the window in the source.
    pub first: usize,
    /// Window size asked for.
    pub requested_size: usize,
    /// Hits actually in the window.
    pub actual_size: usize,
}

impl WindowStats {
    /// The source has hits before this window.
    pub fn has_previous(&self) -> bool {
        self.first > 0
    }

    /// Start of the following window of the same requested size.
    pub fn next_first(&self) -> usize {
        self.first + self.requested_size
    }
}
