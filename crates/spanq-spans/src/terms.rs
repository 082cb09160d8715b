//! Per-annotation term lexicons.
//!
//! Every annotation (word form, lemma, part of speech, ...) has its own lexicon that
//! maps term strings to dense ids. Besides the id mapping, a lexicon knows the sort
//! position of every term under each [`MatchSensitivity`]: case-insensitive sorting
//! gives terms that differ only in case the same position, so comparing and grouping
//! by sort position is all that is needed to honour the sensitivity.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

/// How terms are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSensitivity {
    /// Exact comparison.
    Sensitive,
    /// Case-folded comparison.
    #[default]
    Insensitive,
}

impl MatchSensitivity {
    /// Single-letter code used in property names and descriptors.
    pub fn code(self) -> &'static str {
        match self {
            Self::Sensitive => "s",
            Self::Insensitive => "i",
        }
    }

    /// Parses a code produced by [`MatchSensitivity::code`].
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "s" => Some(Self::Sensitive),
            "i" => Some(Self::Insensitive),
            _ => None,
        }
    }
}

impl fmt::Display for MatchSensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Accumulates distinct term strings in first-seen order.
#[derive(Debug, Default)]
pub struct TermsBuilder {
    /// Term strings indexed by id.
    strings: Vec<String>,
    /// Reverse mapping.
    ids: HashMap<String, u32>,
}

impl TermsBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `term`, assigning a new one if unseen.
    pub fn intern(&mut self, term: &str) -> u32 {
        if let Some(&id) = self.ids.get(term) {
            return id;
        }
        let id = u32::try_from(self.strings.len()).unwrap_or(u32::MAX);
        self.strings.push(term.to_string());
        self.ids.insert(term.to_string(), id);
        id
    }

    /// Freezes the lexicon and computes sort positions.
    pub fn finish(self) -> Terms {
        let n = self.strings.len();
        let folded: Vec<String> = self.strings.iter().map(|s| s.to_lowercase()).collect();

        let mut order: Vec<u32> = (0..n as u32).collect();
        order.sort_by(|&a, &b| self.strings[a as usize].cmp(&self.strings[b as usize]));
        let mut sensitive_order = vec![0; n];
        for (position, &id) in order.iter().enumerate() {
            sensitive_order[id as usize] = position as u32;
        }

        order.sort_by(|&a, &b| {
            folded[a as usize]
                .cmp(&folded[b as usize])
                .then_with(|| self.strings[a as usize].cmp(&self.strings[b as usize]))
        });
        let mut insensitive_order = vec![0; n];
        let mut position = 0;
        for (i, &id) in order.iter().enumerate() {
            if i > 0 && folded[id as usize] != folded[order[i - 1] as usize] {
                position = i as u32;
            }
            insensitive_order[id as usize] = position;
        }

        let mut by_folded: HashMap<String, Vec<u32>> = HashMap::new();
        for (id, key) in folded.into_iter().enumerate() {
            by_folded.entry(key).or_default().push(id as u32);
        }

        Terms {
            strings: self.strings,
            ids: self.ids,
            by_folded,
            sensitive_order,
            insensitive_order,
        }
    }
}

/// A frozen lexicon for one annotation.
#[derive(Debug, Clone)]
pub struct Terms {
    /// Term strings indexed by id.
    strings: Vec<String>,
    /// Exact string to id.
    ids: HashMap<String, u32>,
    /// Lower-cased string to every id that folds to it.
    by_folded: HashMap<String, Vec<u32>>,
    /// Sort position of each id, exact comparison.
    sensitive_order: Vec<u32>,
    /// Sort position of each id, case-folded comparison.
    insensitive_order: Vec<u32>,
}

impl Terms {
    /// Builds a lexicon from a list of distinct-or-not strings.
    pub fn from_strings<'a>(strings: impl IntoIterator<Item = &'a str>) -> Self {
        let mut builder = TermsBuilder::new();
        for s in strings {
            builder.intern(s);
        }
        builder.finish()
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True if the lexicon is empty.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// The string for `id`.
    pub fn get(&self, id: u32) -> Option<&str> {
        self.strings.get(id as usize).map(String::as_str)
    }

    /// Every term id matching `term` under `sensitivity`, ascending.
    pub fn matching_ids(&self, term: &str, sensitivity: MatchSensitivity) -> Vec<u32> {
        match sensitivity {
            MatchSensitivity::Sensitive => self.ids.get(term).copied().into_iter().collect(),
            MatchSensitivity::Insensitive => self
                .by_folded
                .get(&term.to_lowercase())
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Sort position of `id` under `sensitivity`.
    ///
    /// Ids outside the lexicon sort before every known term.
    pub fn sort_position(&self, id: u32, sensitivity: MatchSensitivity) -> i64 {
        let table = match sensitivity {
            MatchSensitivity::Sensitive => &self.sensitive_order,
            MatchSensitivity::Insensitive => &self.insensitive_order,
        };
        table.get(id as usize).map_or(-1, |&p| i64::from(p))
    }

    /// Iterates `(id, term)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(id, s)| (id as u32, s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Terms {
        Terms::from_strings(["the", "cat", "The", "sat", "Cat", "the"])
    }

    #[test]
    fn interning_deduplicates() {
        let terms = sample();
        assert_eq!(terms.len(), 5);
        assert_eq!(terms.get(0), Some("the"));
        assert_eq!(terms.get(2), Some("The"));
        assert_eq!(terms.get(9), None);
    }

    #[test]
    fn matching_ids_respects_sensitivity() {
        let terms = sample();
        assert_eq!(terms.matching_ids("the", MatchSensitivity::Sensitive), vec![0]);
        assert_eq!(
            terms.matching_ids("THE", MatchSensitivity::Insensitive),
            vec![0, 2]
        );
        assert!(terms.matching_ids("dog", MatchSensitivity::Insensitive).is_empty());
    }

    #[test]
    fn insensitive_positions_collapse_case_variants() {
        let terms = sample();
        let i = MatchSensitivity::Insensitive;
        let s = MatchSensitivity::Sensitive;
        assert_eq!(terms.sort_position(0, i), terms.sort_position(2, i));
        assert_ne!(terms.sort_position(0, s), terms.sort_position(2, s));
        // "cat" < "sat" < "the" when folded
        assert!(terms.sort_position(1, i) < terms.sort_position(3, i));
        assert!(terms.sort_position(3, i) < terms.sort_position(0, i));
    }

    #[test]
    fn unknown_ids_sort_first() {
        let terms = sample();
        assert_eq!(terms.sort_position(42, MatchSensitivity::Sensitive), -1);
    }

    #[test]
    fn sensitivity_codes_round_trip() {
        for s in [MatchSensitivity::Sensitive, MatchSensitivity::Insensitive] {
            assert_eq!(MatchSensitivity::from_code(s.code()), Some(s));
        }
        assert_eq!(MatchSensitivity::from_code("x"), None);
    }
}
