use std::{sync::Arc, thread};

use spanq_spans::{
    CancellationToken, CaptureSource, InputDocument, ListSource, MatchSensitivity, MemoryCorpus,
    OccurrenceSource, SpanQuery, postings_from_triples,
};

use super::*;

/// Ten hits over four documents: 3, 2, 4, 1.
fn triples() -> Vec<(u32, u32, u32)> {
    vec![
        (0, 0, 1),
        (0, 2, 3),
        (0, 5, 7),
        (1, 1, 2),
        (1, 3, 4),
        (2, 0, 2),
        (2, 4, 5),
        (2, 6, 7),
        (2, 8, 9),
        (3, 0, 1),
    ]
}

fn source() -> Box<dyn OccurrenceSource> {
    Box::new(ListSource::new(postings_from_triples(&triples())))
}

fn lazy(limits: HitLimits) -> HitResults {
    HitResults::from_source(source(), limits, CancellationToken::new())
}

fn unlimited() -> HitResults {
    lazy(HitLimits::UNLIMITED)
}

fn assert_consistent(stats: &ResultsStats) {
    assert!(stats.hits_processed <= stats.hits_counted, "{stats:?}");
    assert!(stats.docs_processed <= stats.docs_counted, "{stats:?}");
}

/// Corpus where "the" occurs with varied case and neighbours, for sort tests.
fn corpus() -> MemoryCorpus {
    MemoryCorpus::from_documents([
        InputDocument::from_text("the cat saw The dog and the bird"),
        InputDocument::from_text("THE end of the story"),
        InputDocument::from_text("nothing here"),
        InputDocument::from_text("the cat again the"),
    ])
    .unwrap()
}

fn query_results(corpus: &MemoryCorpus, word: &str) -> HitResults {
    let compiled = SpanQuery::term(word).compile(corpus, 100).unwrap();
    let cancel = CancellationToken::new();
    HitResults::from_source(compiled.open(corpus, &cancel), HitLimits::UNLIMITED, cancel)
}

#[test]
fn nothing_is_read_up_front() {
    let results = unlimited();
    assert_eq!(results.stats(), ResultsStats::NOT_STARTED);
    assert!(!results.done());
}

#[test]
fn ensure_read_stops_at_target() {
    let results = unlimited();
    results.ensure_read(3).unwrap();
    let stats = results.stats();
    assert_eq!(stats.hits_processed, 3);
    assert_eq!(stats.docs_processed, 1);
    assert!(!stats.done);

    results.ensure_read(4).unwrap();
    assert_eq!(results.stats().docs_counted, 2);
}

#[test]
fn negative_target_reads_everything() {
    let results = unlimited();
    results.ensure_read(-1).unwrap();
    let stats = results.stats();
    assert_eq!(stats.hits_processed, 10);
    assert_eq!(stats.hits_counted, 10);
    assert_eq!(stats.docs_counted, 4);
    assert!(stats.done);
    assert!(!stats.max_stats.any_exceeded());
}

#[test]
fn processing_cap_keeps_counting() {
    let results = lazy(HitLimits::new(Some(4), None));
    results.ensure_read(-1).unwrap();
    let stats = results.stats();
    assert_eq!(stats.hits_processed, 4);
    assert_eq!(stats.hits_counted, 10);
    assert_eq!(stats.docs_processed, 2);
    assert_eq!(stats.docs_counted, 4);
    assert!(stats.max_stats.hits_processed_exceeded);
    assert!(!stats.max_stats.hits_counted_exceeded);
    assert!(stats.done);
}

#[test]
fn bounded_read_stops_at_processing_cap() {
    let results = lazy(HitLimits::new(Some(4), None));
    results.ensure_read(8).unwrap();
    let stats = results.stats();
    assert_eq!(stats.hits_processed, 4);
    assert!(!stats.done);
    assert_consistent(&stats);
}

#[test]
fn counting_cap_stops_the_source() {
    let results = lazy(HitLimits::new(Some(4), Some(6)));
    results.ensure_read(-1).unwrap();
    let stats = results.stats();
    assert_eq!(stats.hits_processed, 4);
    assert_eq!(stats.hits_counted, 6);
    assert!(stats.max_stats.hits_processed_exceeded);
    assert!(stats.max_stats.hits_counted_exceeded);
    assert!(stats.done);
}

#[test]
fn counting_cap_not_flagged_when_source_ends_exactly() {
    let results = lazy(HitLimits::new(None, Some(10)));
    results.ensure_read(-1).unwrap();
    assert!(!results.max_stats().hits_counted_exceeded);
    assert!(results.done());
}

#[test]
fn counters_stay_consistent_at_every_step() {
    let results = lazy(HitLimits::new(Some(5), Some(8)));
    for n in 0..12 {
        results.ensure_read(n).unwrap();
        assert_consistent(&results.stats());
    }
    results.ensure_read(-1).unwrap();
    assert_consistent(&results.stats());
}

#[test]
fn get_reads_on_demand() {
    let results = unlimited();
    assert_eq!(results.get(4).unwrap(), Some(Hit::new(1, 3, 4)));
    assert_eq!(results.size(), 5);
    assert_eq!(results.get(10).unwrap(), None);
    assert!(results.done());
}

#[test]
fn cancelled_read_is_reported() {
    let cancel = CancellationToken::new();
    let results = HitResults::from_source(source(), HitLimits::UNLIMITED, cancel.clone());
    results.ensure_read(2).unwrap();
    cancel.cancel();
    assert_eq!(results.ensure_read(-1), Err(ResultsError::Cancelled));
    assert!(!results.done());
    assert_eq!(results.ensure_read(1), Err(ResultsError::Cancelled));
}

#[test]
fn readers_see_consistent_snapshots_during_a_drain() {
    let triples: Vec<(u32, u32, u32)> = (0..5_000).map(|i| (i / 7, i % 7, i % 7 + 1)).collect();
    let results = HitResults::from_source(
        Box::new(ListSource::new(postings_from_triples(&triples))),
        HitLimits::new(Some(3_000), None),
        CancellationToken::new(),
    );
    thread::scope(|s| {
        s.spawn(|| results.ensure_read(-1).unwrap());
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..200 {
                    assert_consistent(&results.stats());
                }
            });
        }
    });
    assert_eq!(results.stats().hits_counted, 5_000);
}

#[test]
fn window_over_short_source_is_clamped() {
    let results = HitResults::from_hits(
        (0..5).map(|i| Hit::new(0, i, i + 1)).collect(),
        CapturedGroups::new(),
    );
    let window = results.window(0, 10).unwrap();
    let stats = window.window_stats().unwrap();
    assert_eq!(stats.actual_size, 5);
    assert_eq!(stats.requested_size, 10);
    assert!(!stats.has_next);
    assert_eq!(window.size(), 5);
}

#[test]
fn window_probes_one_past_its_end() {
    let results = unlimited();
    let window = results.window(2, 3).unwrap();
    assert_eq!(
        window.hits(),
        vec![Hit::new(0, 5, 7), Hit::new(1, 1, 2), Hit::new(1, 3, 4)]
    );
    assert!(window.window_stats().unwrap().has_next);
    // Reading stops right after the probe.
    assert_eq!(results.size(), 6);

    let last = results.window(7, 3).unwrap();
    assert!(!last.window_stats().unwrap().has_next);
    assert_eq!(last.size(), 3);
}

#[test]
fn window_rejects_bad_starts() {
    let results = unlimited();
    assert!(matches!(
        results.window(-1, 5),
        Err(ResultsError::InvalidArgument(_))
    ));
    assert!(matches!(
        results.window(10, 5),
        Err(ResultsError::InvalidArgument(_))
    ));

    let empty = HitResults::from_hits(Vec::new(), CapturedGroups::new());
    assert!(matches!(
        empty.window(1, 5),
        Err(ResultsError::InvalidArgument(_))
    ));
    assert_eq!(empty.window(0, 5).unwrap().size(), 0);
}

#[test]
fn window_carries_captured_groups() {
    let captured = CaptureSource::new(Arc::from("w"), source());
    let results =
        HitResults::from_source(Box::new(captured), HitLimits::UNLIMITED, CancellationToken::new());
    let window = results.window(1, 2).unwrap();
    let hit = window.get(0).unwrap().unwrap();
    let groups = window.captured_groups(&hit).unwrap();
    assert_eq!(groups.get("w"), Some(&hit.interval()));
    assert!(window.captured_groups(&Hit::new(0, 0, 1)).is_none());
}

#[test]
fn sample_is_reproducible() {
    let results = unlimited();
    let params = SampleParameters::count(4, 1234);
    let a = results.sample(&params).unwrap();
    let b = results.sample(&params).unwrap();
    assert_eq!(a.hits(), b.hits());
    assert_eq!(a.size(), 4);
    assert_eq!(a.sample_parameters(), Some(params));

    let hits = a.hits();
    assert!(hits.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn oversized_sample_is_everything() {
    let results = unlimited();
    let sample = results.sample(&SampleParameters::count(50, 9)).unwrap();
    assert_eq!(sample.hits(), results.hits());
}

#[test]
fn sample_counts_documents_of_chosen_hits() {
    let results = unlimited();
    let sample = results.sample(&SampleParameters::fraction(0.5, 77)).unwrap();
    let hits = sample.hits();
    assert_eq!(hits.len(), 5);
    assert_eq!(sample.stats().docs_processed, count_docs(&hits));
}

#[test]
fn reverse_sort_equals_descending_sort() {
    let corpus = corpus();
    let results = query_results(&corpus, "the");
    let properties = [
        HitProperty::hit_text(MatchSensitivity::Insensitive),
        HitProperty::hit_text(MatchSensitivity::Sensitive),
        "right:word:i:1".parse().unwrap(),
        "left:word:i:2".parse().unwrap(),
        HitProperty::DocId,
    ];
    for property in properties {
        let hits = results.all_hits().unwrap();
        let values = property.values(&hits, &corpus).unwrap();
        let mut expected: Vec<(PropertyValue, Hit)> = values.into_iter().zip(hits).collect();
        expected.sort_by(|a, b| b.cmp(a));
        let expected: Vec<Hit> = expected.into_iter().map(|(_, hit)| hit).collect();

        let reversed = results.sort(&property, true, &corpus).unwrap();
        assert_eq!(reversed.hits(), expected, "{property}");
    }
}

#[test]
fn sort_by_text_groups_case_variants() {
    let corpus = corpus();
    let results = query_results(&corpus, "the");
    let sorted = results
        .sort(&"right:word:i:1".parse().unwrap(), false, &corpus)
        .unwrap();
    let hits = sorted.hits();
    assert_eq!(hits.len(), 7);
    // Hits at the end of a document have an empty right context and sort first.
    assert_eq!(hits[0], Hit::new(3, 3, 4));
    assert_eq!(sorted.stats().hits_counted, results.stats().hits_counted);
    assert!(sorted.done());
}

#[test]
fn sort_is_cancellable() {
    let corpus = corpus();
    let compiled = SpanQuery::term("the").compile(&corpus, 100).unwrap();
    let cancel = CancellationToken::new();
    let results =
        HitResults::from_source(compiled.open(&corpus, &cancel), HitLimits::UNLIMITED, cancel);
    results.cancel();
    assert_eq!(
        results.sort(&HitProperty::DocId, false, &corpus).unwrap_err(),
        ResultsError::Cancelled
    );
}

#[test]
fn filter_keeps_matching_values() {
    let corpus = corpus();
    let results = query_results(&corpus, "the");
    let property: HitProperty = "right:word:i:1".parse().unwrap();
    let target = property.value(&Hit::new(0, 0, 1), &corpus).unwrap();
    let filtered = results.filter(&property, &target, &corpus).unwrap();
    assert_eq!(filtered.hits(), vec![Hit::new(0, 0, 1), Hit::new(3, 0, 1)]);
    assert_eq!(filtered.stats().docs_processed, 2);
}
