//! Term frequencies around hits.

use std::collections::HashMap;

use serde::Serialize;
use spanq_spans::{Corpus, MatchSensitivity};

use crate::{HitResults, ResultsError};

/// One collocate and how often it occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collocation {
    /// Term as displayed; lower-cased when counted case-insensitively.
    pub term: String,
    /// Occurrences in the context windows.
    pub count: usize,
}

/// Collocates of a hit sequence, most frequent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collocations {
    /// Annotation the terms come from.
    pub annotation: String,
    /// Tokens counted on each side of a hit.
    pub context_size: u32,
    /// Collocates ordered by count, then term.
    pub items: Vec<Collocation>,
}

impl Collocations {
    /// Counts the terms of `annotation` within `context_size` tokens on either side
    /// of every hit. The hits themselves are not counted.
    pub fn from_hits(
        results: &HitResults,
        annotation: &str,
        context_size: u32,
        sensitivity: MatchSensitivity,
        corpus: &dyn Corpus,
    ) -> Result<Self, ResultsError> {
        let terms = corpus
            .terms(annotation)
            .ok_or_else(|| ResultsError::invalid(format!("unknown annotation '{annotation}'")))?;
        let hits = results.all_hits()?;

        let mut counts: HashMap<i64, (u32, usize)> = HashMap::new();
        for hit in &hits {
            let tokens = corpus.tokens(annotation, hit.doc).unwrap_or(&[]);
            let len = tokens.len();
            let start = (hit.start as usize).min(len);
            let end = (hit.end as usize).min(len);
            let before = start.saturating_sub(context_size as usize)..start;
            let after = end..end.saturating_add(context_size as usize).min(len);
            for &id in tokens[before].iter().chain(&tokens[after]) {
                let key = terms.sort_position(id, sensitivity);
                counts.entry(key).or_insert((id, 0)).1 += 1;
            }
        }

        let mut items: Vec<Collocation> = counts
            .into_values()
            .map(|(id, count)| {
                let term = terms.get(id).unwrap_or_default();
                let term = match sensitivity {
                    MatchSensitivity::Sensitive => term.to_string(),
                    MatchSensitivity::Insensitive => term.to_lowercase(),
                };
                Collocation { term, count }
            })
            .collect();
        items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));

        Ok(Self {
            annotation: annotation.to_string(),
            context_size,
            items,
        })
    }

    /// Count of `term`, compared exactly against the displayed form.
    pub fn count_of(&self, term: &str) -> usize {
        self.items
            .iter()
            .find(|c| c.term == term)
            .map_or(0, |c| c.count)
    }
}
