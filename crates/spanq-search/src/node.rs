//! The search node graph.
//!
//! A [`SearchNode`] is an operation applied to an upstream node, or a span query at
//! the root of a chain. Nodes are immutable and cheap to clone; each carries its
//! [`Descriptor`], computed once from the operation, its parameters and the
//! upstream descriptor.
//!
//! The typed wrappers [`SearchHits`], [`SearchDocs`], [`SearchHitGroups`] and
//! [`SearchCollocations`] only allow chains that make sense: every derivation
//! consumes hits. Parameters that can be checked without running anything are
//! checked when the node is built.

use std::{fmt, sync::Arc};

use spanq_config::Limits;
use spanq_results::{
    Collocations, DocResults, HitGroups, HitLimits, HitProperty, HitResults, PropertyValue,
    SampleParameters,
};
use spanq_spans::{CancellationToken, CompiledQuery, Corpus, MatchSensitivity, SpanQuery};

use crate::{
    CacheEntry, Descriptor, ResultsCache, SearchError, SearchObserver, SearchResult, observer,
};

/// Limits applied when a query node is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    /// Processing and counting caps of the hit sequence.
    pub limits: HitLimits,
    /// Terms a single term or wildcard may expand to.
    pub max_term_expansions: usize,
}

impl QuerySettings {
    /// Settings from the `[limits]` configuration section.
    pub fn from_config(limits: &Limits) -> Self {
        Self {
            limits: HitLimits::new(limits.process_cap(), limits.count_cap()),
            max_term_expansions: limits.max_term_expansions,
        }
    }
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self::from_config(&Limits::default())
    }
}

/// What a node does to its upstream result.
#[derive(Debug, Clone)]
enum Operation {
    /// Run a span query; the root of every chain.
    Query {
        /// The query as written.
        query: SpanQuery,
        /// Resolved against the corpus lexicons.
        compiled: CompiledQuery,
        /// Caps of the hit sequence.
        limits: HitLimits,
    },
    /// Order hits by a property.
    Sort {
        /// Sort key.
        property: HitProperty,
        /// Descending order.
        reverse: bool,
    },
    /// Seeded random subset.
    Sample(SampleParameters),
    /// Hits with a given property value.
    Filter {
        /// Property compared.
        property: HitProperty,
        /// Value kept.
        value: PropertyValue,
    },
    /// A page of hits.
    Window {
        /// Index of the first hit.
        first: i64,
        /// Requested number of hits.
        size: usize,
    },
    /// Group hits per document.
    GroupByDocument {
        /// Hits stored per document.
        cap: usize,
    },
    /// Group hits by a property value.
    GroupByProperty {
        /// Grouping key.
        property: HitProperty,
        /// Hits stored per group.
        cap: usize,
    },
    /// Term frequencies around hits.
    Collocations {
        /// Annotation counted.
        annotation: String,
        /// Tokens on each side.
        context_size: u32,
        /// Whether case variants are counted separately.
        sensitivity: MatchSensitivity,
    },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query { query, limits, .. } => {
                write!(
                    f,
                    "query({query})[process={},count={}]",
                    cap_text(limits.max_processed),
                    cap_text(limits.max_counted)
                )
            }
            Self::Sort { property, reverse } => {
                write!(f, "sort({property},{})", if *reverse { "desc" } else { "asc" })
            }
            Self::Sample(params) => write!(f, "sample({params})"),
            Self::Filter { property, value } => {
                write!(f, "filter({property},{})", value.canonical())
            }
            Self::Window { first, size } => write!(f, "window({first},{size})"),
            Self::GroupByDocument { cap } => write!(f, "docs({cap})"),
            Self::GroupByProperty { property, cap } => write!(f, "group({property},{cap})"),
            Self::Collocations {
                annotation,
                context_size,
                sensitivity,
            } => write!(
                f,
                "collocations({annotation},{context_size},{})",
                sensitivity.code()
            ),
        }
    }
}

/// Renders an optional cap.
fn cap_text(cap: Option<usize>) -> String {
    cap.map_or_else(|| "all".to_string(), |n| n.to_string())
}

/// Shared body of a node.
#[derive(Clone)]
struct NodeInner {
    /// What this node does.
    operation: Operation,
    /// Node whose result this one consumes; `None` for a query.
    upstream: Option<SearchNode>,
    /// Corpus searched.
    corpus: Arc<dyn Corpus>,
    /// Notified on `execute`; not part of the descriptor.
    observers: Vec<Arc<dyn SearchObserver>>,
    /// Cache key.
    descriptor: Descriptor,
}

/// One step of a search.
#[derive(Clone)]
pub struct SearchNode {
    /// Shared body.
    inner: Arc<NodeInner>,
}

impl fmt::Debug for SearchNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchNode")
            .field("descriptor", &self.inner.descriptor)
            .field("observers", &self.inner.observers.len())
            .finish_non_exhaustive()
    }
}

impl SearchNode {
    /// The root node of a chain.
    fn query(
        corpus: Arc<dyn Corpus>,
        query: SpanQuery,
        settings: &QuerySettings,
    ) -> Result<Self, SearchError> {
        let compiled = query.compile(corpus.as_ref(), settings.max_term_expansions)?;
        let operation = Operation::Query {
            query,
            compiled,
            limits: settings.limits,
        };
        let descriptor = Descriptor::new(corpus.id(), operation.to_string());
        Ok(Self {
            inner: Arc::new(NodeInner {
                operation,
                upstream: None,
                corpus,
                observers: Vec::new(),
                descriptor,
            }),
        })
    }

    /// A node applying `operation` to this one.
    fn derive(&self, operation: Operation) -> Self {
        let descriptor = self.inner.descriptor.then(&operation.to_string());
        Self {
            inner: Arc::new(NodeInner {
                operation,
                upstream: Some(self.clone()),
                corpus: Arc::clone(&self.inner.corpus),
                observers: Vec::new(),
                descriptor,
            }),
        }
    }

    /// This node with one more observer.
    fn observed(&self, observer: Arc<dyn SearchObserver>) -> Self {
        let mut inner = (*self.inner).clone();
        inner.observers.push(observer);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Cache key of this node.
    pub fn descriptor(&self) -> &Descriptor {
        &self.inner.descriptor
    }

    /// The node this one consumes, if any.
    pub fn upstream(&self) -> Option<&Self> {
        self.inner.upstream.as_ref()
    }

    /// Corpus searched.
    pub fn corpus(&self) -> &Arc<dyn Corpus> {
        &self.inner.corpus
    }

    /// Fetches the result through `cache` and notifies observers.
    fn run(&self, cache: &ResultsCache) -> Result<SearchResult, SearchError> {
        let result = cache.get(self).wait()?;
        observer::notify(&self.inner.observers, &self.inner.descriptor, &result);
        Ok(result)
    }

    /// Computes this node's result. Upstream results come from `cache`.
    pub(crate) fn evaluate(
        &self,
        cache: &ResultsCache,
        cancel: &CancellationToken,
    ) -> Result<SearchResult, SearchError> {
        let corpus = self.inner.corpus.as_ref();
        let result = match &self.inner.operation {
            Operation::Query {
                compiled, limits, ..
            } => {
                let hits = HitResults::from_source(
                    compiled.open(corpus, cancel),
                    *limits,
                    cancel.clone(),
                );
                hits.ensure_read(-1)?;
                SearchResult::Hits(Arc::new(hits))
            }
            Operation::GroupByDocument { cap } => {
                SearchResult::Docs(Arc::new(self.group_by_document(*cap, cache, cancel)?))
            }
            Operation::Sort { property, reverse } => {
                let hits = self.upstream_hits(cache, cancel)?;
                SearchResult::Hits(Arc::new(hits.sort(property, *reverse, corpus)?))
            }
            Operation::Sample(params) => {
                let hits = self.upstream_hits(cache, cancel)?;
                SearchResult::Hits(Arc::new(hits.sample(params)?))
            }
            Operation::Filter { property, value } => {
                let hits = self.upstream_hits(cache, cancel)?;
                SearchResult::Hits(Arc::new(hits.filter(property, value, corpus)?))
            }
            Operation::Window { first, size } => {
                let hits = self.upstream_hits(cache, cancel)?;
                SearchResult::Hits(Arc::new(hits.window(*first, *size)?))
            }
            Operation::GroupByProperty { property, cap } => {
                let hits = self.upstream_hits(cache, cancel)?;
                let groups = HitGroups::from_hits(&hits, property, *cap, corpus)?;
                SearchResult::Groups(Arc::new(groups))
            }
            Operation::Collocations {
                annotation,
                context_size,
                sensitivity,
            } => {
                let hits = self.upstream_hits(cache, cancel)?;
                let collocations =
                    Collocations::from_hits(&hits, annotation, *context_size, *sensitivity, corpus)?;
                SearchResult::Collocations(Arc::new(collocations))
            }
        };
        cancel.check().map_err(|_| SearchError::Cancelled)?;
        Ok(result)
    }

    /// Groups upstream hits per document.
    ///
    /// When the upstream is a query whose hits are not cached, its occurrence stream
    /// is read document by document instead of materializing every hit.
    fn group_by_document(
        &self,
        cap: usize,
        cache: &ResultsCache,
        cancel: &CancellationToken,
    ) -> Result<DocResults, SearchError> {
        if let Some(upstream) = &self.inner.upstream
            && let Operation::Query {
                compiled, limits, ..
            } = &upstream.inner.operation
            && cache.get_completed(upstream).is_none()
        {
            let source = compiled.open(self.inner.corpus.as_ref(), cancel);
            return Ok(DocResults::from_source(source, cap, *limits, cancel)?);
        }
        let hits = self.upstream_hits(cache, cancel)?;
        Ok(DocResults::from_hits(&hits, cap)?)
    }

    /// The upstream hit sequence, fetched through the cache.
    fn upstream_hits(
        &self,
        cache: &ResultsCache,
        cancel: &CancellationToken,
    ) -> Result<Arc<HitResults>, SearchError> {
        let upstream = self.inner.upstream.as_ref().ok_or_else(|| {
            SearchError::ExecutionFailed(format!("{} has no upstream", self.inner.descriptor))
        })?;
        let result = cache.get(upstream).wait_within(cancel)?;
        let kind = result.kind();
        result.into_hits().ok_or_else(|| {
            SearchError::ExecutionFailed(format!("expected hits upstream, found {kind}"))
        })
    }
}

/// Error for a result of the wrong kind.
fn unexpected(expected: &str, result: &SearchResult) -> SearchError {
    SearchError::ExecutionFailed(format!("expected {expected}, found {}", result.kind()))
}

/// A search producing hits.
#[derive(Debug, Clone)]
pub struct SearchHits {
    /// Underlying node.
    node: SearchNode,
}

impl SearchHits {
    /// Searches `corpus` for `query`.
    ///
    /// Terms are resolved here, so a query that expands too far fails now with
    /// [`SearchError::QueryTooBroad`].
    pub fn query(
        corpus: Arc<dyn Corpus>,
        query: SpanQuery,
        settings: &QuerySettings,
    ) -> Result<Self, SearchError> {
        Ok(Self {
            node: SearchNode::query(corpus, query, settings)?,
        })
    }

    /// All hits ordered by `property`, descending if `reverse`.
    pub fn sort(&self, property: HitProperty, reverse: bool) -> Result<Self, SearchError> {
        property.check(self.node.corpus().as_ref())?;
        Ok(self.derive(Operation::Sort { property, reverse }))
    }

    /// A seeded random subset.
    pub fn sample(&self, params: SampleParameters) -> Self {
        self.derive(Operation::Sample(params))
    }

    /// Hits whose `property` equals `value`.
    pub fn filter(&self, property: HitProperty, value: PropertyValue) -> Result<Self, SearchError> {
        property.check(self.node.corpus().as_ref())?;
        Ok(self.derive(Operation::Filter { property, value }))
    }

    /// `size` hits starting at `first`.
    pub fn window(&self, first: i64, size: usize) -> Result<Self, SearchError> {
        if first < 0 {
            return Err(SearchError::InvalidArgument(format!(
                "window start {first} is negative"
            )));
        }
        Ok(self.derive(Operation::Window { first, size }))
    }

    /// Hits grouped per document, storing at most `cap_per_doc` hits for each.
    pub fn group_by_document(&self, cap_per_doc: usize) -> SearchDocs {
        SearchDocs {
            node: self.node.derive(Operation::GroupByDocument { cap: cap_per_doc }),
        }
    }

    /// Hits grouped by `property`, storing at most `cap_per_group` hits per group.
    pub fn group_by_property(
        &self,
        property: HitProperty,
        cap_per_group: usize,
    ) -> Result<SearchHitGroups, SearchError> {
        property.check(self.node.corpus().as_ref())?;
        Ok(SearchHitGroups {
            node: self.node.derive(Operation::GroupByProperty {
                property,
                cap: cap_per_group,
            }),
        })
    }

    /// Terms of `annotation` within `context_size` tokens of each hit.
    pub fn collocations(
        &self,
        annotation: &str,
        context_size: u32,
        sensitivity: MatchSensitivity,
    ) -> Result<SearchCollocations, SearchError> {
        if self.node.corpus().terms(annotation).is_none() {
            return Err(SearchError::InvalidArgument(format!(
                "unknown annotation '{annotation}'"
            )));
        }
        Ok(SearchCollocations {
            node: self.node.derive(Operation::Collocations {
                annotation: annotation.to_string(),
                context_size,
                sensitivity,
            }),
        })
    }

    /// This search with `observer` notified of its result.
    pub fn with_observer(&self, observer: Arc<dyn SearchObserver>) -> Self {
        Self {
            node: self.node.observed(observer),
        }
    }

    /// The underlying node.
    pub fn node(&self) -> &SearchNode {
        &self.node
    }

    /// Cache key.
    pub fn descriptor(&self) -> &Descriptor {
        self.node.descriptor()
    }

    /// Starts or joins the execution without waiting.
    pub fn submit(&self, cache: &ResultsCache) -> CacheEntry {
        cache.get(&self.node)
    }

    /// Runs the search through `cache` and waits for the hits.
    pub fn execute(&self, cache: &ResultsCache) -> Result<Arc<HitResults>, SearchError> {
        let result = self.node.run(cache)?;
        result
            .clone()
            .into_hits()
            .ok_or_else(|| unexpected("hits", &result))
    }

    /// Wraps a derived node.
    fn derive(&self, operation: Operation) -> Self {
        Self {
            node: self.node.derive(operation),
        }
    }
}

/// A search producing per-document groups.
#[derive(Debug, Clone)]
pub struct SearchDocs {
    /// Underlying node.
    node: SearchNode,
}

impl SearchDocs {
    /// This search with `observer` notified of its result.
    pub fn with_observer(&self, observer: Arc<dyn SearchObserver>) -> Self {
        Self {
            node: self.node.observed(observer),
        }
    }

    /// The underlying node.
    pub fn node(&self) -> &SearchNode {
        &self.node
    }

    /// Cache key.
    pub fn descriptor(&self) -> &Descriptor {
        self.node.descriptor()
    }

    /// Starts or joins the execution without waiting.
    pub fn submit(&self, cache: &ResultsCache) -> CacheEntry {
        cache.get(&self.node)
    }

    /// Runs the search and waits for the groups.
    pub fn execute(&self, cache: &ResultsCache) -> Result<Arc<DocResults>, SearchError> {
        let result = self.node.run(cache)?;
        result
            .clone()
            .into_docs()
            .ok_or_else(|| unexpected("docs", &result))
    }
}

/// A search producing groups of hits.
#[derive(Debug, Clone)]
pub struct SearchHitGroups {
    /// Underlying node.
    node: SearchNode,
}

impl SearchHitGroups {
    /// This search with `observer` notified of its result.
    pub fn with_observer(&self, observer: Arc<dyn SearchObserver>) -> Self {
        Self {
            node: self.node.observed(observer),
        }
    }

    /// The underlying node.
    pub fn node(&self) -> &SearchNode {
        &self.node
    }

    /// Cache key.
    pub fn descriptor(&self) -> &Descriptor {
        self.node.descriptor()
    }

    /// Starts or joins the execution without waiting.
    pub fn submit(&self, cache: &ResultsCache) -> CacheEntry {
        cache.get(&self.node)
    }

    /// Runs the search and waits for the groups.
    pub fn execute(&self, cache: &ResultsCache) -> Result<Arc<HitGroups>, SearchError> {
        let result = self.node.run(cache)?;
        result
            .clone()
            .into_groups()
            .ok_or_else(|| unexpected("groups", &result))
    }
}

/// A search producing collocations.
#[derive(Debug, Clone)]
pub struct SearchCollocations {
    /// Underlying node.
    node: SearchNode,
}

impl SearchCollocations {
    /// This search with `observer` notified of its result.
    pub fn with_observer(&self, observer: Arc<dyn SearchObserver>) -> Self {
        Self {
            node: self.node.observed(observer),
        }
    }

    /// The underlying node.
    pub fn node(&self) -> &SearchNode {
        &self.node
    }

    /// Cache key.
    pub fn descriptor(&self) -> &Descriptor {
        self.node.descriptor()
    }

    /// Starts or joins the execution without waiting.
    pub fn submit(&self, cache: &ResultsCache) -> CacheEntry {
        cache.get(&self.node)
    }

    /// Runs the search and waits for the collocations.
    pub fn execute(&self, cache: &ResultsCache) -> Result<Arc<Collocations>, SearchError> {
        let result = self.node.run(cache)?;
        result
            .clone()
            .into_collocations()
            .ok_or_else(|| unexpected("collocations", &result))
    }
}
