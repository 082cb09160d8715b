//! The interval relation filter.
//!
//! [`PositionFilterSource`] keeps the producer intervals of each document that stand
//! in a [`RelationOp`] to at least one filter interval of the same document, or to
//! none of them when inverted. Matching one document is linear in the number of
//! producer and filter intervals: every operator is answered by a forward-only
//! cursor over the sorted filter list plus, for the containment operators, one
//! running extremum.

use std::{collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    CancellationToken, Captures, Interval, OccurrenceSource,
    source::{DocBuffer, drain_doc},
};

/// Number of producer documents between cancellation checks.
const CANCEL_CHECK_INTERVAL: u32 = 64;

/// How a producer interval P must relate to some filter interval F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationOp {
    /// P covers F.
    Containing,
    /// F covers P.
    Within,
    /// P and F start together.
    StartsAt,
    /// P and F end together.
    EndsAt,
    /// P and F are the same interval.
    Matches,
}

impl RelationOp {
    /// Every operator.
    pub const ALL: [Self; 5] = [
        Self::Containing,
        Self::Within,
        Self::StartsAt,
        Self::EndsAt,
        Self::Matches,
    ];

    /// Stable lower-case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Containing => "containing",
            Self::Within => "within",
            Self::StartsAt => "starts_at",
            Self::EndsAt => "ends_at",
            Self::Matches => "matches",
        }
    }

    /// Whether `producer` relates to `filter` under this operator.
    pub fn holds(self, producer: Interval, filter: Interval) -> bool {
        match self {
            Self::Containing => producer.contains(&filter),
            Self::Within => filter.contains(&producer),
            Self::StartsAt => producer.start == filter.start,
            Self::EndsAt => producer.end == filter.end,
            Self::Matches => producer == filter,
        }
    }
}

impl fmt::Display for RelationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RelationOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| format!("unknown relation operator '{s}'"))
    }
}

/// For each producer interval, whether some filter interval satisfies `op`.
///
/// Both slices must be sorted ascending by `(start, end)`.
pub fn relation_mask(op: RelationOp, producer: &[Interval], filter: &[Interval]) -> Vec<bool> {
    if filter.is_empty() {
        return vec![false; producer.len()];
    }
    match op {
        RelationOp::StartsAt => {
            let mut j = 0;
            producer
                .iter()
                .map(|p| {
                    while j < filter.len() && filter[j].start < p.start {
                        j += 1;
                    }
                    j < filter.len() && filter[j].start == p.start
                })
                .collect()
        }
        RelationOp::Matches => {
            let mut j = 0;
            producer
                .iter()
                .map(|p| {
                    while j < filter.len() && filter[j] < *p {
                        j += 1;
                    }
                    j < filter.len() && filter[j] == *p
                })
                .collect()
        }
        RelationOp::EndsAt => {
            let ends: HashSet<u32> = filter.iter().map(|f| f.end).collect();
            producer.iter().map(|p| ends.contains(&p.end)).collect()
        }
        RelationOp::Containing => {
            // Filters starting at or after P.start form a suffix; P contains one of
            // them iff the smallest end in that suffix fits inside P.
            let mut suffix_min_end = vec![u32::MAX; filter.len() + 1];
            for k in (0..filter.len()).rev() {
                suffix_min_end[k] = suffix_min_end[k + 1].min(filter[k].end);
            }
            let mut lo = 0;
            producer
                .iter()
                .map(|p| {
                    while lo < filter.len() && filter[lo].start < p.start {
                        lo += 1;
                    }
                    lo < filter.len() && suffix_min_end[lo] <= p.end
                })
                .collect()
        }
        RelationOp::Within => {
            // Filters starting at or before P.start form a prefix; one of them covers
            // P iff the largest end in that prefix reaches P.end.
            let mut hi = 0;
            let mut max_end = None;
            producer
                .iter()
                .map(|p| {
                    while hi < filter.len() && filter[hi].start <= p.start {
                        max_end = max_end.max(Some(filter[hi].end));
                        hi += 1;
                    }
                    max_end.is_some_and(|end| end >= p.end)
                })
                .collect()
        }
    }
}

/// Where the filter stream is positioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterCursor {
    /// `next_doc` not yet called.
    Unstarted,
    /// On this document, its intervals buffered.
    At(u32),
    /// No documents left.
    Exhausted,
}

/// Producer intervals filtered by their relation to a second stream.
pub struct PositionFilterSource {
    /// Stream whose intervals are emitted.
    producer: Box<dyn OccurrenceSource>,
    /// Stream the producer is tested against.
    filter: Box<dyn OccurrenceSource>,
    /// Relation to test.
    op: RelationOp,
    /// Emit producer intervals with no qualifying filter interval instead.
    invert: bool,
    /// Polled every [`CANCEL_CHECK_INTERVAL`] documents.
    cancel: CancellationToken,
    /// Position of the filter stream.
    filter_at: FilterCursor,
    /// Intervals of the filter document under the cursor.
    filter_intervals: Vec<Interval>,
    /// Surviving producer intervals of the current document.
    buffer: DocBuffer,
    /// Producer documents examined, for cancellation polling.
    examined: u32,
}

impl PositionFilterSource {
    /// Creates the filter.
    pub fn new(
        producer: Box<dyn OccurrenceSource>,
        filter: Box<dyn OccurrenceSource>,
        op: RelationOp,
        invert: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            producer,
            filter,
            op,
            invert,
            cancel,
            filter_at: FilterCursor::Unstarted,
            filter_intervals: Vec::new(),
            buffer: DocBuffer::default(),
            examined: 0,
        }
    }

    /// Moves the filter stream to the first document `>= doc`.
    fn align_filter(&mut self, doc: u32) {
        let behind = match self.filter_at {
            FilterCursor::Unstarted => true,
            FilterCursor::At(at) => at < doc,
            FilterCursor::Exhausted => false,
        };
        if !behind {
            return;
        }
        self.filter_intervals.clear();
        match self.filter.advance_to(doc) {
            Some(at) => {
                self.filter_at = FilterCursor::At(at);
                while let Some(interval) = self.filter.next_interval() {
                    self.filter_intervals.push(interval);
                }
            }
            None => self.filter_at = FilterCursor::Exhausted,
        }
    }

    /// Starting from producer document `candidate`, finds the first document with
    /// surviving intervals and buffers them.
    fn settle(&mut self, mut candidate: Option<u32>) -> Option<u32> {
        loop {
            let doc = candidate?;
            self.examined = self.examined.wrapping_add(1);
            if self.examined % CANCEL_CHECK_INTERVAL == 0 && self.cancel.is_cancelled() {
                tracing::debug!(doc, "position filter cancelled");
                return None;
            }

            self.align_filter(doc);
            if !self.invert {
                match self.filter_at {
                    FilterCursor::Exhausted => return None,
                    FilterCursor::At(at) if at > doc => {
                        candidate = self.producer.advance_to(at);
                        continue;
                    }
                    _ => {}
                }
            }

            let entries = drain_doc(self.producer.as_mut());
            let filter: &[Interval] = if self.filter_at == FilterCursor::At(doc) {
                &self.filter_intervals
            } else {
                &[]
            };
            let producer: Vec<Interval> = entries.iter().map(|(i, _)| *i).collect();
            let mask = relation_mask(self.op, &producer, filter);
            let kept: Vec<(Interval, Captures)> = entries
                .into_iter()
                .zip(mask)
                .filter_map(|(entry, matched)| (matched != self.invert).then_some(entry))
                .collect();
            if !kept.is_empty() {
                self.buffer.reset(kept);
                return Some(doc);
            }
            candidate = self.producer.next_doc();
        }
    }
}

impl OccurrenceSource for PositionFilterSource {
    fn next_doc(&mut self) -> Option<u32> {
        let candidate = self.producer.next_doc();
        self.settle(candidate)
    }

    fn advance_to(&mut self, target: u32) -> Option<u32> {
        let candidate = self.producer.advance_to(target);
        self.settle(candidate)
    }

    fn next_interval(&mut self) -> Option<Interval> {
        self.buffer.next()
    }

    fn captures(&self, out: &mut Captures) {
        self.buffer.captures(out);
    }
}
