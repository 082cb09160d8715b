//! Lazily materialized hit sequences.
//!
//! [`HitResults`] pulls hits from an occurrence stream only as far as a caller asks
//! for them. Every hit pulled is *counted*; a hit is also *processed* (stored) as
//! long as the processing cap allows. Once the counting cap is reached the source
//! is dropped and the result is done.
//!
//! The mutable buffer and counters sit behind a mutex that only the reading thread
//! holds for any length of time. After every batch the reader publishes an immutable
//! [`ResultsStats`] snapshot, so progress can be polled from other threads without
//! waiting on a drain in progress.
//!
//! The window, sample, sort and filter derivations all produce a new, fully
//! materialized `HitResults` and never modify their source.

#[cfg(test)]
mod tests;

use std::{fmt, sync::Arc};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use spanq_spans::{CancellationToken, Captures, Corpus, OccurrenceSource};

use crate::{
    CapturedGroups, GroupMap, Hit, HitProperty, MaxStats, PropertyValue, ResultsError,
    ResultsStats, SampleParameters, WindowStats,
    hit::{count_docs, hits_per_doc, select_groups},
    sample::choose_indices,
};

/// Hits read between stats publications and cancellation checks.
const BATCH_SIZE: usize = 100;

/// Caps on how many hits a search stores and counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HitLimits {
    /// Maximum hits stored; `None` for no limit.
    pub max_processed: Option<usize>,
    /// Maximum hits counted; `None` for no limit.
    pub max_counted: Option<usize>,
}

impl HitLimits {
    /// No caps at all.
    pub const UNLIMITED: Self = Self {
        max_processed: None,
        max_counted: None,
    };

    /// Creates limits.
    pub fn new(max_processed: Option<usize>, max_counted: Option<usize>) -> Self {
        Self {
            max_processed,
            max_counted,
        }
    }

    /// Whether `stored` hits fill the processing cap.
    pub(crate) fn processing_full(&self, stored: usize) -> bool {
        self.max_processed.is_some_and(|cap| stored >= cap)
    }

    /// Whether `counted` hits fill the counting cap.
    pub(crate) fn counting_full(&self, counted: usize) -> bool {
        self.max_counted.is_some_and(|cap| counted >= cap)
    }
}

/// Converts a hit count into an `ensure_read` target.
fn target(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// The mutable part of a [`HitResults`].
struct Materializer {
    /// Stored hits.
    hits: Vec<Hit>,
    /// Captured groups of stored hits.
    captured: CapturedGroups,
    /// Remaining source; `None` once exhausted or stopped by the counting cap.
    source: Option<Box<dyn OccurrenceSource>>,
    /// Document the source is positioned on.
    current_doc: Option<u32>,
    /// Hits seen.
    hits_counted: usize,
    /// Documents seen.
    docs_counted: usize,
    /// Documents with a stored hit.
    docs_processed: usize,
    /// Hits counted per document, in counting order.
    doc_totals: Vec<(u32, usize)>,
    /// Document of the last counted hit.
    last_counted_doc: Option<u32>,
    /// Document of the last stored hit.
    last_processed_doc: Option<u32>,
    /// Caps hit so far.
    max_stats: MaxStats,
    /// A read observed cancellation; no further reads happen.
    cancelled: bool,
    /// Captures of the hit last pulled.
    scratch: Captures,
}

impl Materializer {
    /// State of a result with nothing left to read.
    fn complete(hits: Vec<Hit>, captured: CapturedGroups, stats: &ResultsStats) -> Self {
        Self {
            doc_totals: hits_per_doc(&hits),
            hits,
            captured,
            source: None,
            current_doc: None,
            hits_counted: stats.hits_counted,
            docs_counted: stats.docs_counted,
            docs_processed: stats.docs_processed,
            last_counted_doc: None,
            last_processed_doc: None,
            max_stats: stats.max_stats,
            cancelled: false,
            scratch: Captures::new(),
        }
    }

    /// State of a result that will read from `source`.
    fn lazy(source: Box<dyn OccurrenceSource>) -> Self {
        let mut state = Self::complete(Vec::new(), CapturedGroups::new(), &ResultsStats::NOT_STARTED);
        state.source = Some(source);
        state
    }

    /// Pulls the next hit and its captures from the source.
    fn next_hit(&mut self) -> Option<Hit> {
        let source = self.source.as_mut()?;
        loop {
            if let Some(doc) = self.current_doc
                && let Some(interval) = source.next_interval()
            {
                self.scratch.clear();
                source.captures(&mut self.scratch);
                return Some(Hit::from_interval(doc, interval));
            }
            self.current_doc = Some(source.next_doc()?);
        }
    }

    /// Counts `hit` and stores it if the processing cap allows.
    fn accept(&mut self, hit: Hit, limits: HitLimits) {
        if limits.counting_full(self.hits_counted) {
            self.max_stats.hits_counted_exceeded = true;
            self.source = None;
            return;
        }
        self.hits_counted += 1;
        if self.last_counted_doc != Some(hit.doc) {
            self.docs_counted += 1;
            self.last_counted_doc = Some(hit.doc);
            self.doc_totals.push((hit.doc, 0));
        }
        if let Some((_, total)) = self.doc_totals.last_mut() {
            *total += 1;
        }

        if limits.processing_full(self.hits.len()) {
            self.max_stats.hits_processed_exceeded = true;
            return;
        }
        if self.last_processed_doc != Some(hit.doc) {
            self.docs_processed += 1;
            self.last_processed_doc = Some(hit.doc);
        }
        if !self.scratch.is_empty() {
            let groups: GroupMap = self.scratch.iter().cloned().collect();
            self.captured.insert(hit, groups);
        }
        self.hits.push(hit);
    }

    /// Current counters.
    fn stats(&self) -> ResultsStats {
        ResultsStats {
            hits_processed: self.hits.len(),
            hits_counted: self.hits_counted,
            docs_processed: self.docs_processed,
            docs_counted: self.docs_counted,
            done: self.source.is_none() && !self.cancelled,
            max_stats: self.max_stats,
        }
    }
}

/// A hit sequence that is read from its source on demand.
pub struct HitResults {
    /// Buffer, counters and remaining source.
    state: Mutex<Materializer>,
    /// Last published counters.
    stats: ArcSwap<ResultsStats>,
    /// Caps applied while reading.
    limits: HitLimits,
    /// Polled while reading.
    cancel: CancellationToken,
    /// Set on results produced by [`HitResults::window`].
    window: Option<WindowStats>,
    /// Set on results produced by [`HitResults::sample`].
    sample: Option<SampleParameters>,
}

impl fmt::Debug for HitResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HitResults")
            .field("stats", &self.stats())
            .field("limits", &self.limits)
            .field("window", &self.window)
            .field("sample", &self.sample)
            .finish_non_exhaustive()
    }
}

impl HitResults {
    /// Creates a result that reads from `source` as hits are requested.
    pub fn from_source(
        source: Box<dyn OccurrenceSource>,
        limits: HitLimits,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            state: Mutex::new(Materializer::lazy(source)),
            stats: ArcSwap::from_pointee(ResultsStats::NOT_STARTED),
            limits,
            cancel,
            window: None,
            sample: None,
        }
    }

    /// Creates a complete result from hits already in hand.
    pub fn from_hits(hits: Vec<Hit>, captured: CapturedGroups) -> Self {
        let docs = count_docs(&hits);
        let stats = ResultsStats::complete(hits.len(), docs, MaxStats::NOT_EXCEEDED);
        Self::with_stats(hits, captured, stats)
    }

    /// Creates a complete result with explicit counters.
    fn with_stats(hits: Vec<Hit>, captured: CapturedGroups, stats: ResultsStats) -> Self {
        Self {
            state: Mutex::new(Materializer::complete(hits, captured, &stats)),
            stats: ArcSwap::from_pointee(stats),
            limits: HitLimits::UNLIMITED,
            cancel: CancellationToken::new(),
            window: None,
            sample: None,
        }
    }

    /// Publishes the counters of `state`.
    fn publish(&self, state: &Materializer) {
        self.stats.store(Arc::new(state.stats()));
    }

    /// Reads until at least `at_least` hits are stored, the source is exhausted,
    /// or a cap stops further storing. A negative `at_least` reads everything.
    ///
    /// Returns [`ResultsError::Cancelled`] if cancellation is observed; hits read
    /// up to that point stay available but the result never becomes done.
    pub fn ensure_read(&self, at_least: i64) -> Result<(), ResultsError> {
        let mut state = self.state.lock();
        let wanted = usize::try_from(at_least).ok();
        let outcome = self.read(&mut state, wanted);
        self.publish(&state);
        outcome
    }

    /// The read loop; `wanted == None` reads everything.
    fn read(&self, state: &mut Materializer, wanted: Option<usize>) -> Result<(), ResultsError> {
        if state.cancelled {
            return Err(ResultsError::Cancelled);
        }
        let mut pulled = 0usize;
        while state.source.is_some() {
            if let Some(wanted) = wanted
                && (state.hits.len() >= wanted || self.limits.processing_full(state.hits.len()))
            {
                break;
            }
            if pulled % BATCH_SIZE == 0 {
                if self.cancel.is_cancelled() {
                    state.cancelled = true;
                    tracing::debug!(read = state.hits_counted, "hit read cancelled");
                    return Err(ResultsError::Cancelled);
                }
                if pulled > 0 {
                    self.publish(state);
                }
            }
            pulled += 1;

            match state.next_hit() {
                Some(hit) => state.accept(hit, self.limits),
                None if self.cancel.is_cancelled() => {
                    // Filters inside the source end early when cancelled.
                    state.cancelled = true;
                    return Err(ResultsError::Cancelled);
                }
                None => state.source = None,
            }
        }
        Ok(())
    }

    /// Latest published counters. Never blocks on a read in progress.
    pub fn stats(&self) -> ResultsStats {
        **self.stats.load()
    }

    /// Hits stored so far.
    pub fn size(&self) -> usize {
        self.stats().hits_processed
    }

    /// True once no further hits will be read.
    pub fn done(&self) -> bool {
        self.stats().done
    }

    /// Whether caps cut reading short.
    pub fn max_stats(&self) -> MaxStats {
        self.stats().max_stats
    }

    /// Caps applied while reading.
    pub fn limits(&self) -> HitLimits {
        self.limits
    }

    /// Requests that reading stop at the next batch boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Reads until `n` hits are stored if possible and reports whether they are.
    pub fn hits_processed_at_least(&self, n: usize) -> Result<bool, ResultsError> {
        if self.stats().processed_at_least(n) {
            return Ok(true);
        }
        self.ensure_read(target(n))?;
        Ok(self.stats().processed_at_least(n))
    }

    /// Hit at `index`, reading as far as needed.
    pub fn get(&self, index: usize) -> Result<Option<Hit>, ResultsError> {
        self.ensure_read(target(index.saturating_add(1)))?;
        Ok(self.state.lock().hits.get(index).copied())
    }

    /// Copy of the hits stored so far, without reading further.
    pub fn hits(&self) -> Vec<Hit> {
        self.state.lock().hits.clone()
    }

    /// Reads everything and returns a copy of all stored hits.
    pub fn all_hits(&self) -> Result<Vec<Hit>, ResultsError> {
        self.ensure_read(-1)?;
        Ok(self.hits())
    }

    /// Captured groups of a stored hit.
    pub fn captured_groups(&self, hit: &Hit) -> Option<GroupMap> {
        self.state.lock().captured.get(hit).cloned()
    }

    /// Hits counted per document so far, stored or not.
    ///
    /// Documents appear in the order they were first counted. A sorted result keeps
    /// the totals of its source, since it holds the same hits.
    pub fn hits_per_doc(&self) -> Vec<(u32, usize)> {
        self.state.lock().doc_totals.clone()
    }

    /// Position of this result in its source, for windowed results.
    pub fn window_stats(&self) -> Option<WindowStats> {
        self.window
    }

    /// How this result was drawn, for sampled results.
    pub fn sample_parameters(&self) -> Option<SampleParameters> {
        self.sample
    }

    /// The `size` hits starting at index `first`.
    ///
    /// `size` is clamped to the hits available. `first` must be zero or the index
    /// of an existing hit.
    pub fn window(&self, first: i64, size: usize) -> Result<Self, ResultsError> {
        let first = usize::try_from(first)
            .map_err(|_| ResultsError::invalid(format!("window start {first} is negative")))?;
        if first > 0 && !self.hits_processed_at_least(first + 1)? {
            let message = if self.size() == 0 {
                format!("window start {first} on empty results")
            } else {
                format!("window start {first} beyond {} hits", self.size())
            };
            return Err(ResultsError::InvalidArgument(message));
        }
        self.ensure_read(target(first.saturating_add(size)))?;

        let state = self.state.lock();
        let actual = size.min(state.hits.len() - first);
        let hits = state.hits[first..first + actual].to_vec();
        let captured = select_groups(&state.captured, &hits);
        drop(state);

        let has_next = self.hits_processed_at_least(first.saturating_add(size).saturating_add(1))?;
        let mut window = Self::from_hits(hits, captured);
        window.window = Some(WindowStats {
            has_next,
            first,
            requested_size: size,
            actual_size: actual,
        });
        Ok(window)
    }

    /// A seeded random subset of all hits, in source order.
    pub fn sample(&self, params: &SampleParameters) -> Result<Self, ResultsError> {
        self.ensure_read(-1)?;
        let state = self.state.lock();
        let population = state.hits.len();
        let count = params.sample_size(population)?;
        let hits: Vec<Hit> = choose_indices(population, count, params.seed)
            .into_iter()
            .map(|i| state.hits[i])
            .collect();
        let captured = select_groups(&state.captured, &hits);
        drop(state);

        let mut sample = Self::from_hits(hits, captured);
        sample.sample = Some(*params);
        Ok(sample)
    }

    /// All hits ordered by `property`.
    ///
    /// Hits with equal values keep hit order, which makes the order total; a
    /// reversed sort is the ascending permutation reversed in place.
    pub fn sort(
        &self,
        property: &HitProperty,
        reverse: bool,
        corpus: &dyn Corpus,
    ) -> Result<Self, ResultsError> {
        self.ensure_read(-1)?;
        let state = self.state.lock();
        let values = property.values(&state.hits, corpus)?;
        self.cancel.check()?;

        let mut order: Vec<usize> = (0..state.hits.len()).collect();
        order.sort_by(|&a, &b| {
            values[a]
                .cmp(&values[b])
                .then_with(|| state.hits[a].cmp(&state.hits[b]))
        });
        if reverse {
            order.reverse();
        }

        let hits: Vec<Hit> = order.into_iter().map(|i| state.hits[i]).collect();
        let stats = ResultsStats {
            hits_processed: hits.len(),
            done: true,
            ..state.stats()
        };
        let captured = state.captured.clone();
        let doc_totals = state.doc_totals.clone();
        drop(state);

        let mut sorted = Self::with_stats(hits, captured, stats);
        sorted.state.get_mut().doc_totals = doc_totals;
        Ok(sorted)
    }

    /// All hits whose `property` equals `value`, in source order.
    pub fn filter(
        &self,
        property: &HitProperty,
        value: &PropertyValue,
        corpus: &dyn Corpus,
    ) -> Result<Self, ResultsError> {
        self.ensure_read(-1)?;
        let state = self.state.lock();
        let values = property.values(&state.hits, corpus)?;
        let hits: Vec<Hit> = state
            .hits
            .iter()
            .zip(&values)
            .filter(|(_, v)| *v == value)
            .map(|(hit, _)| *hit)
            .collect();
        let captured = select_groups(&state.captured, &hits);
        Ok(Self::from_hits(hits, captured))
    }
}
