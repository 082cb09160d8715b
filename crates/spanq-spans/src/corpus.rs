//! The corpus collaborator: lexicons, postings and the forward index.
//!
//! The search core never builds or compacts an index itself. It only asks a
//! [`Corpus`] for term lexicons, per-term occurrence streams and the token ids of a
//! document. [`MemoryCorpus`] is a complete in-memory rendition used by the command
//! line and by tests.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use serde::{Deserialize, Serialize};

use crate::{
    CorpusError, DocIntervals, Interval, ListSource, OccurrenceSource,
    terms::{Terms, TermsBuilder},
};

/// Annotation holding the plain word forms.
pub const WORD_ANNOTATION: &str = "word";

/// Source of unique corpus instance ids.
static NEXT_CORPUS_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one opened corpus instance.
///
/// Reloading a corpus yields a new id, which is how cached results for the old
/// instance are told apart from fresh ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorpusId(u64);

impl CorpusId {
    /// Allocates a fresh, process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CORPUS_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorpusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "corpus#{}", self.0)
    }
}

/// What the search core needs from an indexed corpus.
pub trait Corpus: Send + Sync {
    /// Instance id of this corpus.
    fn id(&self) -> CorpusId;

    /// Number of documents.
    fn document_count(&self) -> usize;

    /// Lexicon of `annotation`, if the corpus has it.
    fn terms(&self, annotation: &str) -> Option<&Terms>;

    /// Occurrences of one term id of `annotation`, as single-token intervals.
    fn term_occurrences(&self, annotation: &str, term: u32) -> Box<dyn OccurrenceSource>;

    /// Occurrences of the inline tag `name`.
    fn tag_occurrences(&self, name: &str) -> Box<dyn OccurrenceSource>;

    /// Token ids of `annotation` in document `doc`.
    fn tokens(&self, annotation: &str, doc: u32) -> Option<&[u32]>;
}

/// One document as accepted by [`CorpusBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDocument {
    /// Plain text, split on whitespace into the `word` annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Token lists per annotation. All lists must have the same length.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Vec<String>>,
    /// Inline elements spanning token ranges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<InputTag>,
}

impl InputDocument {
    /// A document consisting only of whitespace-separated words.
    pub fn from_text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

/// An inline element such as a sentence or named entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTag {
    /// Element name.
    pub name: String,
    /// First covered token.
    pub start: u32,
    /// One past the last covered token.
    pub end: u32,
}

/// Index data for one annotation.
#[derive(Debug)]
struct AnnotationIndex {
    /// Lexicon.
    terms: Terms,
    /// Token ids per document.
    forward: Vec<Vec<u32>>,
    /// Postings per term id.
    postings: Vec<Arc<[DocIntervals]>>,
}

/// An immutable corpus held entirely in memory.
#[derive(Debug)]
pub struct MemoryCorpus {
    /// Instance id.
    id: CorpusId,
    /// Number of documents.
    documents: usize,
    /// Per-annotation index data.
    annotations: BTreeMap<String, AnnotationIndex>,
    /// Postings per tag name.
    tags: HashMap<String, Arc<[DocIntervals]>>,
}

impl MemoryCorpus {
    /// Builds a corpus from a list of documents.
    pub fn from_documents(
        documents: impl IntoIterator<Item = InputDocument>,
    ) -> Result<Self, CorpusError> {
        let mut builder = CorpusBuilder::new();
        for doc in documents {
            builder.add_document(doc)?;
        }
        Ok(builder.build())
    }

    /// Names of all annotations, sorted.
    pub fn annotation_names(&self) -> impl Iterator<Item = &str> {
        self.annotations.keys().map(String::as_str)
    }
}

impl Corpus for MemoryCorpus {
    fn id(&self) -> CorpusId {
        self.id
    }

    fn document_count(&self) -> usize {
        self.documents
    }

    fn terms(&self, annotation: &str) -> Option<&Terms> {
        self.annotations.get(annotation).map(|a| &a.terms)
    }

    fn term_occurrences(&self, annotation: &str, term: u32) -> Box<dyn OccurrenceSource> {
        let postings = self
            .annotations
            .get(annotation)
            .and_then(|a| a.postings.get(term as usize));
        match postings {
            Some(docs) => Box::new(ListSource::new(Arc::clone(docs))),
            None => Box::new(ListSource::empty()),
        }
    }

    fn tag_occurrences(&self, name: &str) -> Box<dyn OccurrenceSource> {
        match self.tags.get(name) {
            Some(docs) => Box::new(ListSource::new(Arc::clone(docs))),
            None => Box::new(ListSource::empty()),
        }
    }

    fn tokens(&self, annotation: &str, doc: u32) -> Option<&[u32]> {
        self.annotations
            .get(annotation)?
            .forward
            .get(doc as usize)
            .map(Vec::as_slice)
    }
}

/// Accumulates one annotation while documents are added.
#[derive(Debug, Default)]
struct AnnotationBuilder {
    /// Lexicon under construction.
    terms: TermsBuilder,
    /// Token ids per document, padded for documents lacking the annotation.
    forward: Vec<Vec<u32>>,
}

/// Builds a [`MemoryCorpus`] one document at a time.
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    /// Documents added so far.
    documents: u32,
    /// Per-annotation accumulators.
    annotations: BTreeMap<String, AnnotationBuilder>,
    /// Tag intervals per name, in document order.
    tags: HashMap<String, Vec<DocIntervals>>,
}

impl CorpusBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document and returns its id.
    pub fn add_document(&mut self, input: InputDocument) -> Result<u32, CorpusError> {
        let doc = self.documents;
        let mut layers = input.annotations;
        if let Some(text) = &input.text {
            layers.insert(
                WORD_ANNOTATION.to_string(),
                text.split_whitespace().map(str::to_string).collect(),
            );
        }

        let mut length = None;
        for (name, tokens) in &layers {
            match length {
                None => length = Some(tokens.len()),
                Some(expected) if expected != tokens.len() => {
                    return Err(CorpusError::AnnotationLengthMismatch {
                        doc,
                        annotation: name.clone(),
                        expected,
                        actual: tokens.len(),
                    });
                }
                Some(_) => {}
            }
        }
        let length = length.unwrap_or(0);

        let mut tags: BTreeMap<&str, Vec<Interval>> = BTreeMap::new();
        for tag in &input.tags {
            if tag.start > tag.end || tag.end as usize > length {
                return Err(CorpusError::TagOutOfRange {
                    doc,
                    name: tag.name.clone(),
                    start: tag.start,
                    end: tag.end,
                    length,
                });
            }
            tags.entry(tag.name.as_str())
                .or_default()
                .push(Interval::new(tag.start, tag.end));
        }

        for (name, tokens) in layers {
            let layer = self.annotations.entry(name).or_default();
            layer.forward.resize_with(doc as usize, Vec::new);
            let ids = tokens.iter().map(|t| layer.terms.intern(t)).collect();
            layer.forward.push(ids);
        }
        for (name, mut intervals) in tags {
            intervals.sort_unstable();
            intervals.dedup();
            self.tags
                .entry(name.to_string())
                .or_default()
                .push(DocIntervals { doc, intervals });
        }

        self.documents += 1;
        Ok(doc)
    }

    /// Freezes the corpus and assigns it a fresh instance id.
    pub fn build(self) -> MemoryCorpus {
        let documents = self.documents as usize;
        let annotations = self
            .annotations
            .into_iter()
            .map(|(name, mut layer)| {
                layer.forward.resize_with(documents, Vec::new);
                let terms = layer.terms.finish();
                let postings = invert(&layer.forward, terms.len());
                (
                    name,
                    AnnotationIndex {
                        terms,
                        forward: layer.forward,
                        postings,
                    },
                )
            })
            .collect();
        let tags = self
            .tags
            .into_iter()
            .map(|(name, docs)| (name, Arc::from(docs)))
            .collect();

        let corpus = MemoryCorpus {
            id: CorpusId::next(),
            documents,
            annotations,
            tags,
        };
        tracing::debug!(
            corpus = %corpus.id,
            documents,
            annotations = corpus.annotations.len(),
            "built in-memory corpus"
        );
        corpus
    }
}

/// Turns a forward index into per-term postings.
fn invert(forward: &[Vec<u32>], term_count: usize) -> Vec<Arc<[DocIntervals]>> {
    let mut postings: Vec<Vec<DocIntervals>> = vec![Vec::new(); term_count];
    for (doc, tokens) in forward.iter().enumerate() {
        let doc = doc as u32;
        for (position, &term) in tokens.iter().enumerate() {
            let list = &mut postings[term as usize];
            let interval = Interval::token(position as u32);
            match list.last_mut() {
                Some(last) if last.doc == doc => last.intervals.push(interval),
                _ => list.push(DocIntervals {
                    doc,
                    intervals: vec![interval],
                }),
            }
        }
    }
    postings.into_iter().map(Arc::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatchSensitivity, collect_all};

    fn corpus() -> MemoryCorpus {
        let mut lemma_doc = InputDocument::default();
        lemma_doc.annotations.insert(
            "word".to_string(),
            vec!["Dogs".into(), "bark".into(), "loudly".into()],
        );
        lemma_doc.annotations.insert(
            "lemma".to_string(),
            vec!["dog".into(), "bark".into(), "loudly".into()],
        );
        lemma_doc.tags.push(InputTag {
            name: "s".to_string(),
            start: 0,
            end: 3,
        });
        MemoryCorpus::from_documents([InputDocument::from_text("the dog saw the cat"), lemma_doc])
            .unwrap()
    }

    #[test]
    fn text_is_split_into_words() {
        let corpus = corpus();
        assert_eq!(corpus.document_count(), 2);
        let terms = corpus.terms(WORD_ANNOTATION).unwrap();
        let the = terms.matching_ids("the", MatchSensitivity::Sensitive)[0];
        assert_eq!(corpus.tokens("word", 0).unwrap()[3], the);
    }

    #[test]
    fn term_occurrences_are_single_tokens() {
        let corpus = corpus();
        let the = corpus.terms("word").unwrap().matching_ids("the", MatchSensitivity::Sensitive)[0];
        let mut source = corpus.term_occurrences("word", the);
        assert_eq!(
            collect_all(source.as_mut()),
            vec![(0, Interval::new(0, 1)), (0, Interval::new(3, 4))]
        );
    }

    #[test]
    fn missing_annotation_is_padded() {
        let corpus = corpus();
        assert_eq!(corpus.tokens("lemma", 0), Some(&[][..]));
        assert_eq!(corpus.tokens("lemma", 1).map(<[u32]>::len), Some(3));
        assert_eq!(corpus.tokens("pos", 0), None);
    }

    #[test]
    fn tags_become_occurrences() {
        let corpus = corpus();
        let mut source = corpus.tag_occurrences("s");
        assert_eq!(collect_all(source.as_mut()), vec![(1, Interval::new(0, 3))]);
        let mut none = corpus.tag_occurrences("p");
        assert!(collect_all(none.as_mut()).is_empty());
    }

    #[test]
    fn mismatched_annotations_are_rejected() {
        let mut doc = InputDocument::from_text("a b");
        doc.annotations.insert("lemma".to_string(), vec!["a".into()]);
        let err = MemoryCorpus::from_documents([doc]).unwrap_err();
        assert!(matches!(err, CorpusError::AnnotationLengthMismatch { .. }));
    }

    #[test]
    fn tags_outside_document_are_rejected() {
        let mut doc = InputDocument::from_text("a b");
        doc.tags.push(InputTag {
            name: "s".to_string(),
            start: 1,
            end: 5,
        });
        let err = MemoryCorpus::from_documents([doc]).unwrap_err();
        assert!(matches!(err, CorpusError::TagOutOfRange { length: 2, .. }));
    }

    #[test]
    fn every_build_gets_a_new_id() {
        assert_ne!(corpus().id(), corpus().id());
    }

    #[test]
    fn input_documents_deserialize() {
        let doc: InputDocument = serde_json::from_str(
            r#"{"text": "a b c", "tags": [{"name": "np", "start": 0, "end": 2}]}"#,
        )
        .unwrap();
        assert_eq!(doc.tags[0].end, 2);
        assert!(doc.annotations.is_empty());
    }
}
