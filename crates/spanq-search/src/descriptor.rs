//! Structural cache keys.
//!
//! A [`Descriptor`] is computed once when a search node is built: the canonical
//! text of the node's whole chain, the corpus instance it runs on, and a SipHash of
//! both. Hashing uses only the precomputed value; equality checks the hash first
//! and falls back to the text, so two logically identical searches built
//! independently always meet in the cache.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use siphasher::sip::SipHasher24;
use spanq_spans::CorpusId;

/// The identity of a search node.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// Corpus instance the search runs on.
    corpus: CorpusId,
    /// SipHash of `corpus` and `repr`.
    hash: u64,
    /// Canonical text of the full operation chain.
    repr: Arc<str>,
}

impl Descriptor {
    /// Creates a descriptor from the canonical chain text.
    pub fn new(corpus: CorpusId, repr: impl Into<Arc<str>>) -> Self {
        let repr = repr.into();
        let mut hasher = SipHasher24::new();
        corpus.get().hash(&mut hasher);
        repr.hash(&mut hasher);
        Self {
            corpus,
            hash: hasher.finish(),
            repr,
        }
    }

    /// Descriptor of a node applying `operation` to the node described by `self`.
    pub fn then(&self, operation: &str) -> Self {
        Self::new(self.corpus, format!("{}|{operation}", self.repr))
    }

    /// Corpus instance the search runs on.
    pub fn corpus(&self) -> CorpusId {
        self.corpus
    }

    /// The precomputed hash.
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Canonical text of the operation chain.
    pub fn repr(&self) -> &str {
        &self.repr
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.corpus == other.corpus && self.repr == other.repr
    }
}

impl Eq for Descriptor {}

impl Hash for Descriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.corpus, self.repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_text_equal_descriptor() {
        let corpus = CorpusId::next();
        let a = Descriptor::new(corpus, "query(x)").then("sort(doc,asc)");
        let b = Descriptor::new(corpus, String::from("query(x)|sort(doc,asc)"));
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn corpus_is_part_of_identity() {
        let a = Descriptor::new(CorpusId::next(), "query(x)");
        let b = Descriptor::new(CorpusId::next(), "query(x)");
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_stable() {
        let corpus = CorpusId::next();
        let first = Descriptor::new(corpus, "query(x)|window(0,20)");
        let second = Descriptor::new(corpus, "query(x)|window(0,20)");
        assert_eq!(first.hash_value(), second.hash_value());
        assert_ne!(
            first.hash_value(),
            Descriptor::new(corpus, "query(x)|window(20,20)").hash_value()
        );
    }
}
