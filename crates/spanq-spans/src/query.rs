//! Span-algebra queries and their compilation against a corpus.
//!
//! A [`SpanQuery`] is the serializable tree a query parser hands to the search core.
//! Compiling it resolves every term and wildcard to lexicon ids, which is where a
//! query that would expand to too many terms is rejected. The resulting
//! [`CompiledQuery`] can be opened any number of times into a fresh occurrence
//! stream.

use std::{fmt, sync::Arc};

use globset::GlobBuilder;
use serde::{Deserialize, Serialize};

use crate::{
    CancellationToken, CaptureSource, Corpus, ListSource, MatchSensitivity, MergedSource,
    OccurrenceSource, PositionFilterSource, QueryError, RelationOp, WORD_ANNOTATION,
};

/// Default annotation for term and wildcard queries.
fn default_annotation() -> String {
    WORD_ANNOTATION.to_string()
}

/// A span query tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanQuery {
    /// Every occurrence of one term.
    Term {
        /// Annotation to search.
        #[serde(default = "default_annotation")]
        annotation: String,
        /// Term string.
        value: String,
        /// Case handling.
        #[serde(default)]
        sensitivity: MatchSensitivity,
    },
    /// Every occurrence of any term matching a glob pattern.
    Wildcard {
        /// Annotation to search.
        #[serde(default = "default_annotation")]
        annotation: String,
        /// Glob pattern such as `walk*`.
        pattern: String,
        /// Case handling.
        #[serde(default)]
        sensitivity: MatchSensitivity,
    },
    /// Every inline element with this name.
    Tag {
        /// Element name.
        name: String,
    },
    /// The union of several queries.
    Or(Vec<SpanQuery>),
    /// Producer spans filtered by their relation to filter spans.
    PositionFilter {
        /// Spans to emit.
        producer: Box<SpanQuery>,
        /// Spans to test against.
        filter: Box<SpanQuery>,
        /// Relation to test.
        op: RelationOp,
        /// Keep spans without a qualifying filter span instead.
        #[serde(default)]
        invert: bool,
    },
    /// Records the spans of `inner` under a group name.
    Capture {
        /// Group name.
        name: String,
        /// Captured query.
        inner: Box<SpanQuery>,
    },
}

impl SpanQuery {
    /// A case-insensitive term query on the word annotation.
    pub fn term(value: &str) -> Self {
        Self::Term {
            annotation: default_annotation(),
            value: value.to_string(),
            sensitivity: MatchSensitivity::Insensitive,
        }
    }

    /// A tag query.
    pub fn tag(name: &str) -> Self {
        Self::Tag {
            name: name.to_string(),
        }
    }

    /// A non-inverted position filter.
    pub fn filtered(producer: Self, op: RelationOp, filter: Self) -> Self {
        Self::PositionFilter {
            producer: Box::new(producer),
            filter: Box::new(filter),
            op,
            invert: false,
        }
    }

    /// Resolves terms to ids.
    ///
    /// Fails with [`QueryError::TooBroad`] when a term or pattern matches more than
    /// `max_expansions` lexicon entries.
    pub fn compile(
        &self,
        corpus: &dyn Corpus,
        max_expansions: usize,
    ) -> Result<CompiledQuery, QueryError> {
        Ok(match self {
            Self::Term {
                annotation,
                value,
                sensitivity,
            } => {
                let terms = corpus
                    .terms(annotation)
                    .ok_or_else(|| QueryError::UnknownAnnotation(annotation.clone()))?;
                let ids = terms.matching_ids(value, *sensitivity);
                check_expansion(annotation, value, ids.len(), max_expansions)?;
                CompiledQuery::Terms {
                    annotation: annotation.clone(),
                    ids,
                }
            }
            Self::Wildcard {
                annotation,
                pattern,
                sensitivity,
            } => {
                let terms = corpus
                    .terms(annotation)
                    .ok_or_else(|| QueryError::UnknownAnnotation(annotation.clone()))?;
                let matcher = GlobBuilder::new(pattern)
                    .case_insensitive(*sensitivity == MatchSensitivity::Insensitive)
                    .literal_separator(false)
                    .build()
                    .map_err(|e| QueryError::InvalidPattern {
                        pattern: pattern.clone(),
                        message: e.kind().to_string(),
                    })?
                    .compile_matcher();
                let mut ids = Vec::new();
                for (id, term) in terms.iter() {
                    if matcher.is_match(term) {
                        ids.push(id);
                        check_expansion(annotation, pattern, ids.len(), max_expansions)?;
                    }
                }
                tracing::debug!(%pattern, expansions = ids.len(), "expanded wildcard");
                CompiledQuery::Terms {
                    annotation: annotation.clone(),
                    ids,
                }
            }
            Self::Tag { name } => CompiledQuery::Tag { name: name.clone() },
            Self::Or(clauses) => CompiledQuery::Or(
                clauses
                    .iter()
                    .map(|c| c.compile(corpus, max_expansions))
                    .collect::<Result<_, _>>()?,
            ),
            Self::PositionFilter {
                producer,
                filter,
                op,
                invert,
            } => CompiledQuery::PositionFilter {
                producer: Box::new(producer.compile(corpus, max_expansions)?),
                filter: Box::new(filter.compile(corpus, max_expansions)?),
                op: *op,
                invert: *invert,
            },
            Self::Capture { name, inner } => CompiledQuery::Capture {
                name: Arc::from(name.as_str()),
                inner: Box::new(inner.compile(corpus, max_expansions)?),
            },
        })
    }
}

/// Fails once `matched` exceeds `limit`.
fn check_expansion(
    annotation: &str,
    pattern: &str,
    matched: usize,
    limit: usize,
) -> Result<(), QueryError> {
    if matched > limit {
        return Err(QueryError::TooBroad {
            annotation: annotation.to_string(),
            pattern: pattern.to_string(),
            matched,
            limit,
        });
    }
    Ok(())
}

/// Writes `items` separated by commas.
fn write_list(f: &mut fmt::Formatter<'_>, items: &[SpanQuery]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// The canonical text form, used in cache descriptors.
impl fmt::Display for SpanQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term {
                annotation,
                value,
                sensitivity,
            } => write!(f, "term({annotation}:{sensitivity}:{value:?})"),
            Self::Wildcard {
                annotation,
                pattern,
                sensitivity,
            } => write!(f, "wildcard({annotation}:{sensitivity}:{pattern:?})"),
            Self::Tag { name } => write!(f, "tag({name:?})"),
            Self::Or(clauses) => {
                f.write_str("or(")?;
                write_list(f, clauses)?;
                f.write_str(")")
            }
            Self::PositionFilter {
                producer,
                filter,
                op,
                invert,
            } => {
                let not = if *invert { "!" } else { "" };
                write!(f, "{not}{op}({producer}, {filter})")
            }
            Self::Capture { name, inner } => write!(f, "capture({name:?}, {inner})"),
        }
    }
}

/// A query with every term resolved to lexicon ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledQuery {
    /// Union of the postings of several term ids.
    Terms {
        /// Annotation the ids belong to.
        annotation: String,
        /// Matching term ids; may be empty.
        ids: Vec<u32>,
    },
    /// Inline element occurrences.
    Tag {
        /// Element name.
        name: String,
    },
    /// Union of sub-queries.
    Or(Vec<CompiledQuery>),
    /// Relation filter.
    PositionFilter {
        /// Spans to emit.
        producer: Box<CompiledQuery>,
        /// Spans to test against.
        filter: Box<CompiledQuery>,
        /// Relation to test.
        op: RelationOp,
        /// Complement the relation.
        invert: bool,
    },
    /// Named capture.
    Capture {
        /// Group name.
        name: Arc<str>,
        /// Captured query.
        inner: Box<CompiledQuery>,
    },
}

impl CompiledQuery {
    /// Opens a fresh occurrence stream over `corpus`.
    ///
    /// Relation filters inside the tree poll `cancel` while they scan documents.
    pub fn open(&self, corpus: &dyn Corpus, cancel: &CancellationToken) -> Box<dyn OccurrenceSource> {
        match self {
            Self::Terms { annotation, ids } => match ids.as_slice() {
                [] => Box::new(ListSource::empty()),
                [id] => corpus.term_occurrences(annotation, *id),
                _ => Box::new(MergedSource::new(
                    ids.iter()
                        .map(|id| corpus.term_occurrences(annotation, *id))
                        .collect(),
                )),
            },
            Self::Tag { name } => corpus.tag_occurrences(name),
            Self::Or(clauses) => Box::new(MergedSource::new(
                clauses.iter().map(|c| c.open(corpus, cancel)).collect(),
            )),
            Self::PositionFilter {
                producer,
                filter,
                op,
                invert,
            } => Box::new(PositionFilterSource::new(
                producer.open(corpus, cancel),
                filter.open(corpus, cancel),
                *op,
                *invert,
                cancel.clone(),
            )),
            Self::Capture { name, inner } => Box::new(CaptureSource::new(
                Arc::clone(name),
                inner.open(corpus, cancel),
            )),
        }
    }
}
