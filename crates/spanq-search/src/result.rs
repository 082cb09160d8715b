//! The value a search node evaluates to.

use std::sync::Arc;

use spanq_results::{Collocations, DocResults, HitGroups, HitResults};

/// A completed search result.
///
/// Results are immutable once produced and shared by reference between the cache and
/// every caller that asked for them.
#[derive(Debug, Clone)]
pub enum SearchResult {
    /// A hit sequence.
    Hits(Arc<HitResults>),
    /// Hits grouped per document.
    Docs(Arc<DocResults>),
    /// Hits grouped by a property value.
    Groups(Arc<HitGroups>),
    /// Term frequencies around hits.
    Collocations(Arc<Collocations>),
}

impl SearchResult {
    /// Short name of the result kind, for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hits(_) => "hits",
            Self::Docs(_) => "docs",
            Self::Groups(_) => "groups",
            Self::Collocations(_) => "collocations",
        }
    }

    /// The hit sequence, if this is one.
    pub fn into_hits(self) -> Option<Arc<HitResults>> {
        match self {
            Self::Hits(hits) => Some(hits),
            _ => None,
        }
    }

    /// The per-document grouping, if this is one.
    pub fn into_docs(self) -> Option<Arc<DocResults>> {
        match self {
            Self::Docs(docs) => Some(docs),
            _ => None,
        }
    }

    /// The property grouping, if this is one.
    pub fn into_groups(self) -> Option<Arc<HitGroups>> {
        match self {
            Self::Groups(groups) => Some(groups),
            _ => None,
        }
    }

    /// The collocations, if this is one.
    pub fn into_collocations(self) -> Option<Arc<Collocations>> {
        match self {
            Self::Collocations(collocations) => Some(collocations),
            _ => None,
        }
    }

    /// True if both values share the same underlying allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Hits(a), Self::Hits(b)) => Arc::ptr_eq(a, b),
            (Self::Docs(a), Self::Docs(b)) => Arc::ptr_eq(a, b),
            (Self::Groups(a), Self::Groups(b)) => Arc::ptr_eq(a, b),
            (Self::Collocations(a), Self::Collocations(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
