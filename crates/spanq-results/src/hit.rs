//! Hits and captured groups.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use spanq_spans::Interval;

/// One matched interval in one document.
///
/// Ordering is document, then start, then end.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Hit {
    /// Document id.
    pub doc: u32,
    /// First matched token.
    pub start: u32,
    /// One past the last matched token.
    pub end: u32,
}

impl Hit {
    /// Creates a hit.
    pub fn new(doc: u32, start: u32, end: u32) -> Self {
        Self { doc, start, end }
    }

    /// Creates a hit from an interval of `doc`.
    pub fn from_interval(doc: u32, interval: Interval) -> Self {
        Self::new(doc, interval.start, interval.end)
    }

    /// The matched interval.
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

impl fmt::Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.doc, self.start, self.end)
    }
}

/// Named sub-intervals of one hit.
pub type GroupMap = BTreeMap<Arc<str>, Interval>;

/// Captured groups of every hit that has any.
pub type CapturedGroups = HashMap<Hit, GroupMap>;

/// Copies the captured groups of `hits` out of `from`.
pub(crate) fn select_groups<'a>(
    from: &CapturedGroups,
    hits: impl IntoIterator<Item = &'a Hit>,
) -> CapturedGroups {
    if from.is_empty() {
        return CapturedGroups::new();
    }
    hits.into_iter()
        .filter_map(|hit| from.get(hit).map(|groups| (*hit, groups.clone())))
        .collect()
}

/// Number of document transitions in a hit sequence.
pub(crate) fn count_docs(hits: &[Hit]) -> usize {
    let mut docs = 0;
    let mut last = None;
    for hit in hits {
        if last != Some(hit.doc) {
            docs += 1;
            last = Some(hit.doc);
        }
    }
    docs
}

/// Hits per document, documents in order of first appearance.
pub(crate) fn hits_per_doc(hits: &[Hit]) -> Vec<(u32, usize)> {
    let mut slots: HashMap<u32, usize> = HashMap::new();
    let mut totals: Vec<(u32, usize)> = Vec::new();
    for hit in hits {
        let slot = *slots.entry(hit.doc).or_insert_with(|| {
            totals.push((hit.doc, 0));
            totals.len() - 1
        });
        totals[slot].1 += 1;
    }
    totals
}
