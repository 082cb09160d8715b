//! Rendering and JSON serialization for CLI output.

use std::{collections::BTreeMap, process::ExitCode};

use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;
use spanq_results::{Collocations, DocResults, Hit, HitGroups, HitResults, WindowStats};
use spanq_spans::{Corpus, WORD_ANNOTATION};

/// JSON output for one listed hit.
#[derive(Serialize)]
struct JsonHit {
    /// Document id.
    doc: u32,
    /// First matched token.
    start: u32,
    /// One past the last matched token.
    end: u32,
    /// Words before the hit.
    left: String,
    /// Matched words.
    text: String,
    /// Words after the hit.
    right: String,
    /// Captured groups as `[start, end]`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    captures: BTreeMap<String, [u32; 2]>,
}

/// JSON output for `spanq search`.
#[derive(Serialize)]
struct JsonHits {
    /// Hits counted.
    total_hits: usize,
    /// Documents counted.
    total_docs: usize,
    /// Hits stored.
    hits_processed: usize,
    /// Whether the processing cap stopped materialization.
    max_hits_processed_exceeded: bool,
    /// Whether the counting cap stopped counting.
    max_hits_counted_exceeded: bool,
    /// The page shown.
    window: Option<WindowStats>,
    /// Hits in the page.
    hits: Vec<JsonHit>,
}

/// JSON output for one document group.
#[derive(Serialize)]
struct JsonDoc {
    /// Document id.
    doc: u32,
    /// Hits in the document.
    hits: usize,
    /// Stored hits.
    stored: Vec<Hit>,
}

/// JSON output for `spanq search --docs`.
#[derive(Serialize)]
struct JsonDocs {
    /// Hits over all documents.
    total_hits: usize,
    /// Documents with hits.
    docs: Vec<JsonDoc>,
}

/// JSON output for one property group.
#[derive(Serialize)]
struct JsonGroup {
    /// Shared property value, as displayed.
    identity: String,
    /// Hits in the group.
    hits: usize,
    /// Documents in the group.
    docs: usize,
}

/// JSON output for `spanq search --group-by`.
#[derive(Serialize)]
struct JsonGroups {
    /// Grouping property.
    property: String,
    /// Hits over all groups.
    total_hits: usize,
    /// Groups, largest first.
    groups: Vec<JsonGroup>,
}

/// Prints `value` as pretty JSON.
fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize JSON: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Words of `doc` between two token positions, clamped to the document.
fn words(corpus: &dyn Corpus, doc: u32, start: usize, end: usize) -> String {
    let (Some(tokens), Some(terms)) = (
        corpus.tokens(WORD_ANNOTATION, doc),
        corpus.terms(WORD_ANNOTATION),
    ) else {
        return String::new();
    };
    let end = end.min(tokens.len());
    let start = start.min(end);
    tokens[start..end]
        .iter()
        .filter_map(|&id| terms.get(id))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Left context, match and right context of a hit.
fn keyword_in_context(corpus: &dyn Corpus, hit: &Hit, context: usize) -> [String; 3] {
    let start = hit.start as usize;
    let end = hit.end as usize;
    [
        words(corpus, hit.doc, start.saturating_sub(context), start),
        words(corpus, hit.doc, start, end),
        words(corpus, hit.doc, end, end.saturating_add(context)),
    ]
}

/// Prints a page of hits with totals from the full result.
pub fn hits(
    all: &HitResults,
    page: &HitResults,
    corpus: &dyn Corpus,
    context: usize,
    json: bool,
) -> ExitCode {
    let stats = all.stats();
    let window = page.window_stats();
    let listed = page.hits();

    if json {
        let hits = listed
            .iter()
            .map(|hit| {
                let [left, text, right] = keyword_in_context(corpus, hit, context);
                let captures = page
                    .captured_groups(hit)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(name, span)| (name.to_string(), [span.start, span.end]))
                    .collect();
                JsonHit {
                    doc: hit.doc,
                    start: hit.start,
                    end: hit.end,
                    left,
                    text,
                    right,
                    captures,
                }
            })
            .collect();
        return print_json(&JsonHits {
            total_hits: stats.hits_counted,
            total_docs: stats.docs_counted,
            hits_processed: stats.hits_processed,
            max_hits_processed_exceeded: stats.max_stats.hits_processed_exceeded,
            max_hits_counted_exceeded: stats.max_stats.hits_counted_exceeded,
            window,
            hits,
        });
    }

    if listed.is_empty() {
        println!("No hits found.");
        return ExitCode::SUCCESS;
    }

    let first = window.map_or(0, |w| w.first);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["#", "Doc", "Span", "Left", "Hit", "Right"]);
    for (i, hit) in listed.iter().enumerate() {
        let [left, text, right] = keyword_in_context(corpus, hit, context);
        table.add_row(vec![
            Cell::new((first + i).to_string()),
            Cell::new(hit.doc.to_string()),
            Cell::new(format!("{}-{}", hit.start, hit.end)),
            Cell::new(left),
            Cell::new(text),
            Cell::new(right),
        ]);
    }
    println!("{table}");

    println!(
        "{} hits in {} documents; showing {}-{}",
        stats.hits_counted,
        stats.docs_counted,
        first,
        first + listed.len() - 1
    );
    if stats.max_stats.any_exceeded() {
        println!(
            "(limits reached: stored {} hits, counted {})",
            stats.hits_processed, stats.hits_counted
        );
    }
    if let Some(window) = window
        && window.has_next
    {
        println!("more hits: --first {}", window.next_first());
    }
    ExitCode::SUCCESS
}

/// Prints hits grouped per document.
pub fn docs(docs: &DocResults, corpus: &dyn Corpus, json: bool) -> ExitCode {
    if json {
        return print_json(&JsonDocs {
            total_hits: docs.total_hits(),
            docs: docs
                .docs()
                .iter()
                .map(|d| JsonDoc {
                    doc: d.doc,
                    hits: d.total_hits,
                    stored: d.hits.clone(),
                })
                .collect(),
        });
    }

    if docs.is_empty() {
        println!("No hits found.");
        return ExitCode::SUCCESS;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Doc", "Hits", "First hit"]);
    for doc in docs.docs() {
        let first = doc.hits.first().map_or_else(String::new, |hit| {
            words(corpus, hit.doc, hit.start as usize, hit.end as usize)
        });
        table.add_row(vec![
            Cell::new(doc.doc.to_string()),
            Cell::new(doc.total_hits.to_string()),
            Cell::new(first),
        ]);
    }
    println!("{table}");
    println!("{} hits in {} documents", docs.total_hits(), docs.len());
    ExitCode::SUCCESS
}

/// Prints groups, largest first.
pub fn groups(groups: &HitGroups, json: bool) -> ExitCode {
    let ordered = groups.largest_first();
    if json {
        return print_json(&JsonGroups {
            property: groups.property().to_string(),
            total_hits: groups.total_hits(),
            groups: ordered
                .iter()
                .map(|g| JsonGroup {
                    identity: g.identity().to_string(),
                    hits: g.total_hits(),
                    docs: g.total_docs(),
                })
                .collect(),
        });
    }

    if ordered.is_empty() {
        println!("No hits found.");
        return ExitCode::SUCCESS;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Group", "Hits", "Docs"]);
    for group in ordered {
        table.add_row(vec![
            Cell::new(group.identity().to_string()),
            Cell::new(group.total_hits().to_string()),
            Cell::new(group.total_docs().to_string()),
        ]);
    }
    println!("{table}");
    println!(
        "{} hits in {} groups by {}",
        groups.total_hits(),
        groups.len(),
        groups.property()
    );
    ExitCode::SUCCESS
}

/// Prints the `limit` most frequent collocates.
pub fn collocations(collocations: &Collocations, limit: usize, json: bool) -> ExitCode {
    if json {
        return print_json(collocations);
    }

    if collocations.items.is_empty() {
        println!("No collocates found.");
        return ExitCode::SUCCESS;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Term", "Count"]);
    for item in collocations.items.iter().take(limit) {
        table.add_row(vec![Cell::new(&item.term), Cell::new(item.count.to_string())]);
    }
    println!("{table}");
    ExitCode::SUCCESS
}
