//! Hit properties: what hits are sorted, grouped and filtered by.
//!
//! A [`HitProperty`] turns a hit into a [`PropertyValue`]. Text-bearing values keep
//! two things per token: the lexicon sort position under the property's sensitivity,
//! which is all that equality, hashing and ordering look at, and the term string for
//! display. Two hits whose matched words differ only in case therefore land in the
//! same group under a case-insensitive property.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ops::Range,
    str::FromStr,
};

use spanq_spans::{Corpus, MatchSensitivity, Terms, WORD_ANNOTATION};

use crate::{Hit, ResultsError};

/// Context size used when a context property does not name one.
pub const DEFAULT_CONTEXT_SIZE: u32 = 1;

/// A property of a hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HitProperty {
    /// Document id.
    DocId,
    /// Start and end position within the document.
    Position,
    /// The matched tokens.
    HitText {
        /// Annotation to read tokens from.
        annotation: String,
        /// Case handling.
        sensitivity: MatchSensitivity,
    },
    /// Tokens immediately before the hit, nearest first for ordering.
    LeftContext {
        /// Annotation to read tokens from.
        annotation: String,
        /// Case handling.
        sensitivity: MatchSensitivity,
        /// Number of tokens.
        size: u32,
    },
    /// Tokens immediately after the hit.
    RightContext {
        /// Annotation to read tokens from.
        annotation: String,
        /// Case handling.
        sensitivity: MatchSensitivity,
        /// Number of tokens.
        size: u32,
    },
    /// Several properties compared in order.
    Multiple(Vec<HitProperty>),
}

impl HitProperty {
    /// Matched text on the word annotation.
    pub fn hit_text(sensitivity: MatchSensitivity) -> Self {
        Self::HitText {
            annotation: WORD_ANNOTATION.to_string(),
            sensitivity,
        }
    }

    /// Whether computing the value reads document tokens.
    pub fn needs_context(&self) -> bool {
        match self {
            Self::DocId | Self::Position => false,
            Self::HitText { .. } | Self::LeftContext { .. } | Self::RightContext { .. } => true,
            Self::Multiple(parts) => parts.iter().any(Self::needs_context),
        }
    }

    /// Fails if the property reads an annotation the corpus lacks.
    pub fn check(&self, corpus: &dyn Corpus) -> Result<(), ResultsError> {
        match self {
            Self::DocId | Self::Position => Ok(()),
            Self::HitText { annotation, .. }
            | Self::LeftContext { annotation, .. }
            | Self::RightContext { annotation, .. } => lexicon(corpus, annotation).map(|_| ()),
            Self::Multiple(parts) => parts.iter().try_for_each(|p| p.check(corpus)),
        }
    }

    /// Computes the value for one hit.
    pub fn value(&self, hit: &Hit, corpus: &dyn Corpus) -> Result<PropertyValue, ResultsError> {
        Ok(match self {
            Self::DocId => PropertyValue::Int(i64::from(hit.doc)),
            Self::Position => PropertyValue::Position(hit.start, hit.end),
            Self::HitText {
                annotation,
                sensitivity,
            } => {
                let tokens = doc_tokens(corpus, annotation, hit.doc);
                let range = clamp(hit.start, hit.end, tokens.len());
                terms_value(lexicon(corpus, annotation)?, &tokens[range], *sensitivity, false)
            }
            Self::LeftContext {
                annotation,
                sensitivity,
                size,
            } => {
                let tokens = doc_tokens(corpus, annotation, hit.doc);
                let range = clamp(hit.start.saturating_sub(*size), hit.start, tokens.len());
                terms_value(lexicon(corpus, annotation)?, &tokens[range], *sensitivity, true)
            }
            Self::RightContext {
                annotation,
                sensitivity,
                size,
            } => {
                let tokens = doc_tokens(corpus, annotation, hit.doc);
                let range = clamp(hit.end, hit.end.saturating_add(*size), tokens.len());
                terms_value(lexicon(corpus, annotation)?, &tokens[range], *sensitivity, false)
            }
            Self::Multiple(parts) => PropertyValue::Multiple(
                parts
                    .iter()
                    .map(|p| p.value(hit, corpus))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Computes values for a slice of hits, once each.
    pub fn values(
        &self,
        hits: &[Hit],
        corpus: &dyn Corpus,
    ) -> Result<Vec<PropertyValue>, ResultsError> {
        if self.needs_context() {
            self.check(corpus)?;
        }
        hits.iter().map(|hit| self.value(hit, corpus)).collect()
    }
}

/// Lexicon of `annotation` or an error naming it.
fn lexicon<'a>(corpus: &'a dyn Corpus, annotation: &str) -> Result<&'a Terms, ResultsError> {
    corpus
        .terms(annotation)
        .ok_or_else(|| ResultsError::invalid(format!("unknown annotation '{annotation}'")))
}

/// Token ids of a document, empty if absent.
fn doc_tokens<'a>(corpus: &'a dyn Corpus, annotation: &str, doc: u32) -> &'a [u32] {
    corpus.tokens(annotation, doc).unwrap_or(&[])
}

/// `start..end` clamped to a document of `len` tokens.
fn clamp(start: u32, end: u32, len: usize) -> Range<usize> {
    let end = (end as usize).min(len);
    (start as usize).min(end)..end
}

/// Builds a text value; `nearest_first` reverses the comparison keys.
fn terms_value(
    terms: &Terms,
    ids: &[u32],
    sensitivity: MatchSensitivity,
    nearest_first: bool,
) -> PropertyValue {
    let mut keys: Vec<i64> = ids
        .iter()
        .map(|&id| terms.sort_position(id, sensitivity))
        .collect();
    if nearest_first {
        keys.reverse();
    }
    let text = ids
        .iter()
        .map(|&id| terms.get(id).unwrap_or_default().to_string())
        .collect();
    PropertyValue::Terms(TermsValue { keys, text })
}

impl fmt::Display for HitProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DocId => f.write_str("doc"),
            Self::Position => f.write_str("position"),
            Self::HitText {
                annotation,
                sensitivity,
            } => write!(f, "hit:{annotation}:{sensitivity}"),
            Self::LeftContext {
                annotation,
                sensitivity,
                size,
            } => write!(f, "left:{annotation}:{sensitivity}:{size}"),
            Self::RightContext {
                annotation,
                sensitivity,
                size,
            } => write!(f, "right:{annotation}:{sensitivity}:{size}"),
            Self::Multiple(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

/// Parses `kind[:annotation[:sensitivity[:size]]]`, comma separated for several.
impl FromStr for HitProperty {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() > 1 {
            return Ok(Self::Multiple(
                parts
                    .into_iter()
                    .map(Self::from_str)
                    .collect::<Result<_, _>>()?,
            ));
        }

        let mut fields = s.trim().split(':');
        let kind = fields.next().unwrap_or_default();
        let annotation = fields
            .next()
            .filter(|a| !a.is_empty())
            .unwrap_or(WORD_ANNOTATION)
            .to_string();
        let sensitivity = match fields.next() {
            None | Some("") => MatchSensitivity::Insensitive,
            Some(code) => MatchSensitivity::from_code(code).ok_or_else(|| {
                ResultsError::invalid(format!("unknown sensitivity '{code}' in '{s}'"))
            })?,
        };
        let size = match fields.next() {
            None | Some("") => DEFAULT_CONTEXT_SIZE,
            Some(n) => n
                .parse()
                .map_err(|_| ResultsError::invalid(format!("invalid context size '{n}' in '{s}'")))?,
        };
        if fields.next().is_some() {
            return Err(ResultsError::invalid(format!("too many fields in '{s}'")));
        }

        match kind {
            "doc" | "docid" => Ok(Self::DocId),
            "position" | "pos" => Ok(Self::Position),
            "hit" => Ok(Self::HitText {
                annotation,
                sensitivity,
            }),
            "left" => Ok(Self::LeftContext {
                annotation,
                sensitivity,
                size,
            }),
            "right" => Ok(Self::RightContext {
                annotation,
                sensitivity,
                size,
            }),
            _ => Err(ResultsError::invalid(format!("unknown hit property '{s}'"))),
        }
    }
}

/// Token text compared by sort position.
#[derive(Debug, Clone)]
pub struct TermsValue {
    /// Sort positions; the only part that takes part in comparisons.
    keys: Vec<i64>,
    /// Term strings in document order.
    text: Vec<String>,
}

impl TermsValue {
    /// Term strings in document order.
    pub fn text(&self) -> &[String] {
        &self.text
    }
}

impl PartialEq for TermsValue {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl Eq for TermsValue {}

impl Hash for TermsValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.keys.hash(state);
    }
}

impl PartialOrd for TermsValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TermsValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.keys.cmp(&other.keys)
    }
}

/// The value of a [`HitProperty`] for one hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyValue {
    /// A number such as a document id.
    Int(i64),
    /// Start and end position.
    Position(u32, u32),
    /// Token text.
    Terms(TermsValue),
    /// One value per part of a multiple property.
    Multiple(Vec<PropertyValue>),
}

impl PropertyValue {
    /// A stable string built only from the compared parts of the value.
    pub fn canonical(&self) -> String {
        match self {
            Self::Int(n) => format!("int:{n}"),
            Self::Position(start, end) => format!("pos:{start}-{end}"),
            Self::Terms(value) => {
                let keys: Vec<String> = value.keys.iter().map(i64::to_string).collect();
                format!("terms:[{}]", keys.join(" "))
            }
            Self::Multiple(parts) => {
                let parts: Vec<String> = parts.iter().map(Self::canonical).collect();
                format!("multi({})", parts.join(","))
            }
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Position(start, end) => write!(f, "{start}-{end}"),
            Self::Terms(value) => f.write_str(&value.text.join(" ")),
            Self::Multiple(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" / ")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use spanq_spans::{InputDocument, MemoryCorpus};

    use super::*;

    fn corpus() -> MemoryCorpus {
        MemoryCorpus::from_documents([
            InputDocument::from_text("The big dog saw the small cat"),
            InputDocument::from_text("the Dog ran"),
        ])
        .unwrap()
    }

    #[test]
    fn only_text_properties_read_tokens() {
        assert!(!HitProperty::DocId.needs_context());
        assert!(!HitProperty::Position.needs_context());
        assert!(HitProperty::hit_text(MatchSensitivity::Sensitive).needs_context());
        assert!(
            "doc,left:word:i:1"
                .parse::<HitProperty>()
                .unwrap()
                .needs_context()
        );
        assert!(!"doc,position".parse::<HitProperty>().unwrap().needs_context());
    }

    #[test]
    fn parses_property_strings() {
        assert_eq!("doc".parse::<HitProperty>().unwrap(), HitProperty::DocId);
        assert_eq!(
            "hit:lemma:s".parse::<HitProperty>().unwrap(),
            HitProperty::HitText {
                annotation: "lemma".to_string(),
                sensitivity: MatchSensitivity::Sensitive,
            }
        );
        assert_eq!(
            "left:word:i:2".parse::<HitProperty>().unwrap(),
            HitProperty::LeftContext {
                annotation: "word".to_string(),
                sensitivity: MatchSensitivity::Insensitive,
                size: 2,
            }
        );
        assert_eq!(
            "right".parse::<HitProperty>().unwrap(),
            HitProperty::RightContext {
                annotation: "word".to_string(),
                sensitivity: MatchSensitivity::Insensitive,
                size: DEFAULT_CONTEXT_SIZE,
            }
        );
        assert!(matches!(
            "doc,hit".parse::<HitProperty>().unwrap(),
            HitProperty::Multiple(parts) if parts.len() == 2
        ));
    }

    #[test]
    fn rejects_bad_property_strings() {
        for bad in ["score", "hit:word:x", "left:word:i:many", "hit:word:i:1:2"] {
            assert!(bad.parse::<HitProperty>().is_err(), "{bad}");
        }
    }

    #[test]
    fn display_round_trips() {
        for text in ["doc", "position", "hit:word:s", "left:lemma:i:3", "doc,right:word:i:1"] {
            let property: HitProperty = text.parse().unwrap();
            assert_eq!(property.to_string(), text);
        }
    }

    #[test]
    fn insensitive_text_values_are_equal() {
        let corpus = corpus();
        let property = HitProperty::hit_text(MatchSensitivity::Insensitive);
        let a = property.value(&Hit::new(0, 2, 3), &corpus).unwrap();
        let b = property.value(&Hit::new(1, 1, 2), &corpus).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "dog");
        assert_eq!(b.to_string(), "Dog");

        let sensitive = HitProperty::hit_text(MatchSensitivity::Sensitive);
        assert_ne!(
            sensitive.value(&Hit::new(0, 2, 3), &corpus).unwrap(),
            sensitive.value(&Hit::new(1, 1, 2), &corpus).unwrap()
        );
    }

    #[test]
    fn contexts_clamp_at_document_edges() {
        let corpus = corpus();
        let left = HitProperty::LeftContext {
            annotation: "word".to_string(),
            sensitivity: MatchSensitivity::Insensitive,
            size: 3,
        };
        let right = HitProperty::RightContext {
            annotation: "word".to_string(),
            sensitivity: MatchSensitivity::Insensitive,
            size: 3,
        };
        let hit = Hit::new(1, 1, 2);
        assert_eq!(left.value(&hit, &corpus).unwrap().to_string(), "the");
        assert_eq!(right.value(&hit, &corpus).unwrap().to_string(), "ran");
    }

    #[test]
    fn left_context_orders_nearest_word_first() {
        let corpus = corpus();
        let left = HitProperty::LeftContext {
            annotation: "word".to_string(),
            sensitivity: MatchSensitivity::Insensitive,
            size: 2,
        };
        // "big dog" vs "the small": nearest words are "dog" and "small"
        let a = left.value(&Hit::new(0, 3, 4), &corpus).unwrap();
        let b = left.value(&Hit::new(0, 6, 7), &corpus).unwrap();
        assert!(a < b);
        assert_eq!(a.to_string(), "big dog");
    }

    #[test]
    fn unknown_annotation_is_rejected() {
        let corpus = corpus();
        let property: HitProperty = "hit:pos".parse().unwrap();
        assert!(matches!(
            property.values(&[Hit::new(0, 0, 1)], &corpus),
            Err(ResultsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn canonical_ignores_display_text() {
        let corpus = corpus();
        let property = HitProperty::hit_text(MatchSensitivity::Insensitive);
        let a = property.value(&Hit::new(0, 0, 1), &corpus).unwrap();
        let b = property.value(&Hit::new(0, 4, 5), &corpus).unwrap();
        assert_eq!(a.canonical(), b.canonical());
        assert_ne!(a.to_string(), b.to_string());
    }
}
