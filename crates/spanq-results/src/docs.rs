//! Hits grouped per document.

use std::collections::HashMap;

use spanq_spans::{CancellationToken, OccurrenceSource};

use crate::{Hit, HitLimits, HitResults, MaxStats, ResultsError};

/// Documents between cancellation checks while streaming.
const CANCEL_CHECK_INTERVAL: usize = 64;

/// One document and the hits it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocResult {
    /// Document id.
    pub doc: u32,
    /// Stored hits, at most the per-document cap.
    pub hits: Vec<Hit>,
    /// All hits of the document, stored or not.
    pub total_hits: usize,
}

/// Per-document aggregation of a hit sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocResults {
    /// Documents in order of first appearance.
    docs: Vec<DocResult>,
    /// Hits counted over all documents.
    total_hits: usize,
    /// Caps hit while counting.
    max_stats: MaxStats,
}

impl DocResults {
    /// Streams `source` document by document without materializing a hit list.
    ///
    /// Caps apply exactly as they do when a [`HitResults`] reads the same source:
    /// counting stops at the counting cap, and only hits within the processing cap
    /// are eligible for storing. Of those, the first `cap_per_doc` of each document
    /// are stored. Per-document totals include hits that were only counted.
    pub fn from_source(
        mut source: Box<dyn OccurrenceSource>,
        cap_per_doc: usize,
        limits: HitLimits,
        cancel: &CancellationToken,
    ) -> Result<Self, ResultsError> {
        let mut docs = Vec::new();
        let mut total_hits = 0;
        let mut max_stats = MaxStats::NOT_EXCEEDED;

        'docs: while let Some(doc) = source.next_doc() {
            if docs.len() % CANCEL_CHECK_INTERVAL == 0 {
                cancel.check()?;
            }
            let mut result = DocResult {
                doc,
                hits: Vec::new(),
                total_hits: 0,
            };
            while let Some(interval) = source.next_interval() {
                if limits.counting_full(total_hits) {
                    max_stats.hits_counted_exceeded = true;
                    if result.total_hits > 0 {
                        docs.push(result);
                    }
                    break 'docs;
                }
                // Index of this hit among all counted hits.
                let index = total_hits;
                total_hits += 1;
                result.total_hits += 1;
                if limits.processing_full(index) {
                    max_stats.hits_processed_exceeded = true;
                } else if result.hits.len() < cap_per_doc {
                    result.hits.push(Hit::from_interval(doc, interval));
                }
            }
            if result.total_hits > 0 {
                docs.push(result);
            }
        }
        // Streams end early rather than fail when a filter inside sees cancellation.
        cancel.check()?;

        Ok(Self {
            docs,
            total_hits,
            max_stats,
        })
    }

    /// Groups the hits of a result, reading it fully first.
    ///
    /// Documents with stored hits are listed in order of first appearance, which
    /// is document order unless `results` was sorted; documents whose hits were
    /// only counted follow in counting order. Totals come from the counted hits,
    /// so a result stopped by its processing cap groups the same way as streaming
    /// its source would.
    pub fn from_hits(results: &HitResults, cap_per_doc: usize) -> Result<Self, ResultsError> {
        let hits = results.all_hits()?;
        let totals: HashMap<u32, usize> = results.hits_per_doc().into_iter().collect();

        let mut index: HashMap<u32, usize> = HashMap::new();
        let mut docs: Vec<DocResult> = Vec::new();
        for hit in &hits {
            let slot = *index.entry(hit.doc).or_insert_with(|| {
                docs.push(DocResult {
                    doc: hit.doc,
                    hits: Vec::new(),
                    total_hits: totals.get(&hit.doc).copied().unwrap_or_default(),
                });
                docs.len() - 1
            });
            let result = &mut docs[slot];
            if result.hits.len() < cap_per_doc {
                result.hits.push(*hit);
            }
        }
        for (doc, total) in results.hits_per_doc() {
            if !index.contains_key(&doc) {
                docs.push(DocResult {
                    doc,
                    hits: Vec::new(),
                    total_hits: total,
                });
            }
        }

        Ok(Self {
            total_hits: docs.iter().map(|d| d.total_hits).sum(),
            docs,
            max_stats: results.max_stats(),
        })
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// True if no document has a hit.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Documents in order.
    pub fn docs(&self) -> &[DocResult] {
        &self.docs
    }

    /// Hits counted over all documents.
    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    /// Caps hit while counting.
    pub fn max_stats(&self) -> MaxStats {
        self.max_stats
    }

    /// The `size` documents starting at `first`, clamped to what exists.
    pub fn window(&self, first: usize, size: usize) -> &[DocResult] {
        let start = first.min(self.docs.len());
        let end = start.saturating_add(size).min(self.docs.len());
        &self.docs[start..end]
    }
}
