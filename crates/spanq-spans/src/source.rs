//! The occurrence-stream contract and the basic streams built on it.
//!
//! An [`OccurrenceSource`] walks documents in ascending id order and, inside the
//! current document, intervals in ascending `(start, end)` order. Everything the
//! query layer produces, from a single term's postings to a nested relation filter,
//! is one of these.

use std::sync::Arc;

use crate::Interval;

/// Named sub-intervals recorded alongside one interval.
pub type Captures = Vec<(Arc<str>, Interval)>;

/// A per-document, ascending stream of intervals.
pub trait OccurrenceSource: Send {
    /// Moves to the next document with at least one interval and returns its id.
    fn next_doc(&mut self) -> Option<u32>;

    /// Moves forward to the first document whose id is `>= target`.
    ///
    /// Only called with a `target` greater than the current document.
    fn advance_to(&mut self, target: u32) -> Option<u32> {
        while let Some(doc) = self.next_doc() {
            if doc >= target {
                return Some(doc);
            }
        }
        None
    }

    /// Returns the next interval in the current document.
    fn next_interval(&mut self) -> Option<Interval>;

    /// Appends the captured groups of the interval last returned by `next_interval`.
    fn captures(&self, _out: &mut Captures) {}
}

/// All intervals of one document, sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocIntervals {
    /// Document id.
    pub doc: u32,
    /// Sorted, non-empty list of intervals.
    pub intervals: Vec<Interval>,
}

/// A stream over a shared, pre-sorted postings list.
#[derive(Debug, Clone)]
pub struct ListSource {
    /// Postings, ascending by document.
    docs: Arc<[DocIntervals]>,
    /// Index of the current document, `None` before the first call.
    current: Option<usize>,
    /// Next interval to return within the current document.
    position: usize,
}

impl ListSource {
    /// Creates a stream over `docs`, which must be sorted by document id.
    pub fn new(docs: Arc<[DocIntervals]>) -> Self {
        Self {
            docs,
            current: None,
            position: 0,
        }
    }

    /// A stream with no documents.
    pub fn empty() -> Self {
        Self::new(Arc::from(Vec::new()))
    }

    /// Positions the stream on document index `index`.
    fn land(&mut self, index: usize) -> Option<u32> {
        self.current = Some(index);
        self.position = 0;
        self.docs.get(index).map(|d| d.doc)
    }
}

impl OccurrenceSource for ListSource {
    fn next_doc(&mut self) -> Option<u32> {
        let next = self.current.map_or(0, |i| i + 1);
        self.land(next)
    }

    fn advance_to(&mut self, target: u32) -> Option<u32> {
        let from = self.current.map_or(0, |i| i + 1).min(self.docs.len());
        let offset = self.docs[from..].partition_point(|d| d.doc < target);
        self.land(from + offset)
    }

    fn next_interval(&mut self) -> Option<Interval> {
        let doc = self.docs.get(self.current?)?;
        let interval = doc.intervals.get(self.position).copied();
        if interval.is_some() {
            self.position += 1;
        }
        interval
    }
}

/// Buffered intervals of one document together with their captures.
#[derive(Debug, Default)]
pub struct DocBuffer {
    /// Intervals and captures, in stream order.
    entries: Vec<(Interval, Captures)>,
    /// Next entry to hand out.
    position: usize,
}

impl DocBuffer {
    /// Replaces the buffered document.
    pub fn reset(&mut self, entries: Vec<(Interval, Captures)>) {
        self.entries = entries;
        self.position = 0;
    }

    /// Returns the next interval.
    pub fn next(&mut self) -> Option<Interval> {
        let interval = self.entries.get(self.position).map(|(i, _)| *i);
        if interval.is_some() {
            self.position += 1;
        }
        interval
    }

    /// Appends the captures of the interval last returned by `next`.
    pub fn captures(&self, out: &mut Captures) {
        if let Some(i) = self.position.checked_sub(1)
            && let Some((_, captures)) = self.entries.get(i)
        {
            out.extend(captures.iter().cloned());
        }
    }
}

/// Drains the current document of `source` into a list of intervals with captures.
pub fn drain_doc(source: &mut dyn OccurrenceSource) -> Vec<(Interval, Captures)> {
    let mut entries = Vec::new();
    while let Some(interval) = source.next_interval() {
        let mut captures = Captures::new();
        source.captures(&mut captures);
        entries.push((interval, captures));
    }
    entries
}

/// The union of several streams.
///
/// Identical intervals in the same document are reported once; the captures of
/// the first stream that produced the interval are kept.
pub struct MergedSource {
    /// Sub-streams and the document each is positioned on.
    sources: Vec<(Box<dyn OccurrenceSource>, Option<u32>)>,
    /// Whether the sub-streams have been positioned on their first document.
    started: bool,
    /// Document currently being reported.
    current: Option<u32>,
    /// Merged intervals of the current document.
    buffer: DocBuffer,
}

impl MergedSource {
    /// Creates the union of `sources`.
    pub fn new(sources: Vec<Box<dyn OccurrenceSource>>) -> Self {
        Self {
            sources: sources.into_iter().map(|s| (s, None)).collect(),
            started: false,
            current: None,
            buffer: DocBuffer::default(),
        }
    }
}

impl OccurrenceSource for MergedSource {
    fn next_doc(&mut self) -> Option<u32> {
        if self.started {
            for (source, doc) in &mut self.sources {
                if doc.is_some() && *doc == self.current {
                    *doc = source.next_doc();
                }
            }
        } else {
            for (source, doc) in &mut self.sources {
                *doc = source.next_doc();
            }
            self.started = true;
        }

        let next = self.sources.iter().filter_map(|(_, doc)| *doc).min();
        self.current = next;
        let doc = next?;

        let mut entries = Vec::new();
        for (source, at) in &mut self.sources {
            if *at == Some(doc) {
                entries.extend(drain_doc(source.as_mut()));
            }
        }
        // Stable sort keeps the first stream's captures ahead of later duplicates
        entries.sort_by_key(|(interval, _)| *interval);
        entries.dedup_by_key(|(interval, _)| *interval);
        self.buffer.reset(entries);
        Some(doc)
    }

    fn next_interval(&mut self) -> Option<Interval> {
        self.buffer.next()
    }

    fn captures(&self, out: &mut Captures) {
        self.buffer.captures(out);
    }
}

/// Records every interval of the inner stream under a group name.
pub struct CaptureSource {
    /// Group name.
    name: Arc<str>,
    /// Stream whose intervals are captured.
    inner: Box<dyn OccurrenceSource>,
    /// Interval last returned.
    last: Option<Interval>,
}

impl CaptureSource {
    /// Wraps `inner`, capturing its intervals as `name`.
    pub fn new(name: Arc<str>, inner: Box<dyn OccurrenceSource>) -> Self {
        Self {
            name,
            inner,
            last: None,
        }
    }
}

impl OccurrenceSource for CaptureSource {
    fn next_doc(&mut self) -> Option<u32> {
        self.last = None;
        self.inner.next_doc()
    }

    fn advance_to(&mut self, target: u32) -> Option<u32> {
        self.last = None;
        self.inner.advance_to(target)
    }

    fn next_interval(&mut self) -> Option<Interval> {
        self.last = self.inner.next_interval();
        self.last
    }

    fn captures(&self, out: &mut Captures) {
        if let Some(interval) = self.last {
            out.push((Arc::clone(&self.name), interval));
        }
        self.inner.captures(out);
    }
}

/// Collects a whole stream into `(doc, interval)` pairs. Test helper and debugging aid.
pub fn collect_all(source: &mut dyn OccurrenceSource) -> Vec<(u32, Interval)> {
    let mut out = Vec::new();
    while let Some(doc) = source.next_doc() {
        while let Some(interval) = source.next_interval() {
            out.push((doc, interval));
        }
    }
    out
}

/// Builds a shared postings list from `(doc, start, end)` triples. Input need not be sorted.
pub fn postings_from_triples(triples: &[(u32, u32, u32)]) -> Arc<[DocIntervals]> {
    let mut sorted = triples.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let mut docs: Vec<DocIntervals> = Vec::new();
    for (doc, start, end) in sorted {
        let interval = Interval::new(start, end);
        match docs.last_mut() {
            Some(last) if last.doc == doc => last.intervals.push(interval),
            _ => docs.push(DocIntervals {
                doc,
                intervals: vec![interval],
            }),
        }
    }
    Arc::from(docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(triples: &[(u32, u32, u32)]) -> Box<dyn OccurrenceSource> {
        Box::new(ListSource::new(postings_from_triples(triples)))
    }

    #[test]
    fn list_source_walks_documents_in_order() {
        let mut source = list(&[(3, 1, 2), (1, 4, 5), (1, 0, 1)]);
        assert_eq!(
            collect_all(source.as_mut()),
            vec![
                (1, Interval::new(0, 1)),
                (1, Interval::new(4, 5)),
                (3, Interval::new(1, 2)),
            ]
        );
    }

    #[test]
    fn list_source_advance_skips_forward() {
        let mut source = ListSource::new(postings_from_triples(&[
            (1, 0, 1),
            (4, 0, 1),
            (9, 2, 3),
        ]));
        assert_eq!(source.advance_to(2), Some(4));
        assert_eq!(source.advance_to(5), Some(9));
        assert_eq!(source.next_interval(), Some(Interval::new(2, 3)));
        assert_eq!(source.advance_to(10), None);
        assert_eq!(source.next_doc(), None);
    }

    #[test]
    fn empty_source_has_no_documents() {
        let mut source = ListSource::empty();
        assert_eq!(source.next_doc(), None);
        assert_eq!(source.next_interval(), None);
    }

    #[test]
    fn merged_source_unions_and_deduplicates() {
        let mut merged = MergedSource::new(vec![
            list(&[(0, 1, 2), (2, 0, 1)]),
            list(&[(0, 0, 1), (0, 1, 2), (1, 5, 6)]),
        ]);
        assert_eq!(
            collect_all(&mut merged),
            vec![
                (0, Interval::new(0, 1)),
                (0, Interval::new(1, 2)),
                (1, Interval::new(5, 6)),
                (2, Interval::new(0, 1)),
            ]
        );
    }

    #[test]
    fn capture_source_reports_named_interval() {
        let mut source = CaptureSource::new(Arc::from("x"), list(&[(0, 2, 4)]));
        assert_eq!(source.next_doc(), Some(0));
        assert_eq!(source.next_interval(), Some(Interval::new(2, 4)));
        let mut captures = Captures::new();
        source.captures(&mut captures);
        assert_eq!(captures, vec![(Arc::from("x"), Interval::new(2, 4))]);
    }
}
