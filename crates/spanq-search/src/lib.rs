//! Search graph and result cache for spanq.
//!
//! A search is a chain of [`SearchNode`]s built through the typed wrappers
//! ([`SearchHits`] and the grouping searches derived from it). Each node has a
//! structural [`Descriptor`]; the [`ResultsCache`] keys completed results by it and
//! makes sure concurrent requests for the same descriptor share one execution on a
//! bounded worker pool.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use spanq_config::CacheSettings;
//! use spanq_results::HitProperty;
//! use spanq_search::{QuerySettings, ResultsCache, SearchHits};
//! use spanq_spans::{InputDocument, MemoryCorpus, SpanQuery};
//!
//! let corpus = Arc::new(MemoryCorpus::from_documents([InputDocument::from_text("a cat")])?);
//! let cache = ResultsCache::new(&CacheSettings::default())?;
//! let hits = SearchHits::query(corpus, SpanQuery::term("cat"), &QuerySettings::default())?
//!     .sort(HitProperty::Position, false)?
//!     .window(0, 20)?
//!     .execute(&cache)?;
//! assert_eq!(hits.size(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

mod cache;
mod descriptor;
mod error;
mod node;
mod observer;
mod result;

pub use cache::{CacheEntry, CacheStats, ResultsCache};
pub use descriptor::Descriptor;
pub use error::SearchError;
pub use node::{
    QuerySettings, SearchCollocations, SearchDocs, SearchHitGroups, SearchHits, SearchNode,
};
pub use observer::SearchObserver;
pub use result::SearchResult;
