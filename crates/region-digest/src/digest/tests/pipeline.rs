use super::common::*;
use serde_json::json;
use std::collections::HashSet;

use crate::digest::context::DigestContext;
use crate::digest::fields::{FieldAliases, FieldSource};
use crate::digest::filters::NonBusinessAreaRule;
use crate::digest::identity::IdentityResolver;
use crate::digest::record::{normalize_layers, RawLayer};
use crate::digest::sampling::{SampleCategory, SamplingLimits};
use crate::digest::score::resolve_score;
use crate::digest::stats::SummaryStatistics;
use crate::digest::summarizer::{NaiveSummarizer, OptimizedSummarizer, Summarizer};
use crate::digest::summary::views::ProvenanceKind;
use crate::digest::DigestError;

fn codes_in(summary: &crate::digest::Summary, category: SampleCategory) -> Vec<String> {
    summary
        .sample
        .iter()
        .filter(|entry| entry.category == category)
        .map(|entry| entry.code.clone())
        .collect()
}

#[test]
fn five_record_example_matches_expected_statistics_and_sample() {
    let layers = normalize_layers(&[five_record_layer()]);
    let context = DigestContext::new("generic")
        .with_target_field("v")
        .with_limits(small_limits());

    for summarizer in [&OptimizedSummarizer as &dyn Summarizer, &NaiveSummarizer] {
        let summary = summarizer
            .summarize(&context, &layers, &IdentityResolver::default())
            .expect("summary");

        let stats = summary.statistics.expect("statistics");
        assert_eq!(stats.min, 5.0);
        assert_eq!(stats.max, 95.0);
        assert_eq!(stats.mean, 50.0);
        assert_eq!(stats.median, 50.0);
        assert_eq!(summary.field.source, FieldSource::Override);

        assert_eq!(codes_in(&summary, SampleCategory::Top), vec!["D", "A"]);
        assert_eq!(codes_in(&summary, SampleCategory::Bottom), vec!["B", "E"]);
        assert_eq!(codes_in(&summary, SampleCategory::Median), vec!["C"]);
        assert_eq!(summary.sample[0].label, "Area D");
        assert_eq!(summary.sample[0].population_rank, Some(1));
    }
}

#[test]
fn sample_stays_bounded_for_any_population_size() {
    let context = DigestContext::new("strategic_analysis");
    for n in [10, 1_000, 100_000] {
        let layers = zip_layers(n, n as u64);
        let summary = OptimizedSummarizer
            .summarize(&context, &layers, &IdentityResolver::default())
            .expect("summary");
        assert!(
            summary.sample.len() <= SamplingLimits::default().max_entries,
            "n = {n}: {} entries",
            summary.sample.len()
        );
        assert_eq!(summary.counts.scored_records, n);
        assert_eq!(summary.statistics.map(|stats| stats.count), Some(n));
    }
}

#[test]
fn statistics_do_not_depend_on_sampling() {
    let layers = zip_layers(2_500, 17);
    let identity = IdentityResolver::default();
    let sampled = OptimizedSummarizer
        .summarize(&DigestContext::new("strategic_analysis"), &layers, &identity)
        .expect("sampled summary");
    let unsampled = OptimizedSummarizer
        .summarize(
            &DigestContext::new("strategic_analysis").with_limits(SamplingLimits {
                max_entries: 0,
                ..SamplingLimits::default()
            }),
            &layers,
            &identity,
        )
        .expect("unsampled summary");

    let direct = SummaryStatistics::from_numbers(
        layers
            .iter()
            .flat_map(|layer| layer.records.iter())
            .filter_map(|record| resolve_score(record, &sampled.field.chain)),
    );

    assert!(unsampled.sample.is_empty());
    assert!(!sampled.sample.is_empty());
    assert_eq!(sampled.statistics, unsampled.statistics);
    assert_eq!(sampled.statistics, direct);
    assert_eq!(sampled.contextual, unsampled.contextual);
}

#[test]
fn sample_entries_have_unique_code_and_score() {
    let mut records = zip_records(500, 3);
    // same code and score, many times over
    records.extend((0..50).map(|_| json!({ "ZIP": "30301", "strategic_value_score": 99_999.0 })));
    let layers = normalize_layers(&[RawLayer::new("zips", records)]);

    let summary = NaiveSummarizer
        .summarize(
            &DigestContext::new("strategic_analysis"),
            &layers,
            &IdentityResolver::default(),
        )
        .expect("summary");

    let mut keys = HashSet::new();
    for entry in &summary.sample {
        let score = entry.score.expect("ranked entries carry scores");
        assert!(
            keys.insert((entry.code.clone(), score.to_bits())),
            "duplicate sample key {} / {score}",
            entry.code
        );
    }
    assert_eq!(
        summary
            .sample
            .iter()
            .filter(|entry| entry.code == "30301")
            .count(),
        1
    );
}

#[test]
fn optimized_and_naive_strategies_agree() {
    let identity = IdentityResolver::default();
    for (n, seed) in [(1, 1), (12, 2), (377, 3), (4_000, 4)] {
        let layers = zip_layers(n, seed);
        let context = DigestContext::new("strategic-analysis").with_exclusion(NonBusinessAreaRule);
        let fast = OptimizedSummarizer
            .summarize(&context, &layers, &identity)
            .expect("optimized");
        let slow = NaiveSummarizer
            .summarize(&context, &layers, &identity)
            .expect("naive");

        assert_eq!(fast.statistics, slow.statistics, "n = {n}");
        assert_eq!(fast.contextual, slow.contextual, "n = {n}");
        assert_eq!(fast.sample, slow.sample, "n = {n}");
        assert_eq!(fast.counts, slow.counts, "n = {n}");
        assert_eq!(fast.provenance, slow.provenance, "n = {n}");
    }
}

#[test]
fn legacy_field_names_still_score() {
    let layers = normalize_layers(&[RawLayer::new(
        "zips",
        vec![
            json!({ "ZIP": "10001", "strategic_value_score": "71.5" }),
            json!({ "properties": { "ZIP": "10002", "strategic_value_score": 12 } }),
        ],
    )]);
    let summary = OptimizedSummarizer
        .summarize(
            &DigestContext::new("Strategic-Analysis"),
            &layers,
            &IdentityResolver::default(),
        )
        .expect("summary");

    assert_eq!(summary.field.primary, "strategic_analysis_score");
    assert_eq!(summary.analysis_type, "strategic_analysis");
    assert_eq!(summary.counts.scored_records, 2);
    assert_eq!(sample_codes(&summary), vec!["10001", "10002"]);
}

#[test]
fn aliases_apply_only_to_the_context_that_carries_them() {
    let layers = normalize_layers(&[RawLayer::new(
        "zips",
        vec![
            json!({ "ZIP": "10001", "sas": 80, "other": 1 }),
            json!({ "ZIP": "10002", "sas": 20, "other": 2 }),
        ],
    )]);
    let identity = IdentityResolver::default();

    let aliases: FieldAliases = [("strategic_analysis_score".to_string(), "sas".to_string())]
        .into_iter()
        .collect();
    let aliased = OptimizedSummarizer
        .summarize(
            &DigestContext::new("strategic_analysis").with_aliases(aliases),
            &layers,
            &identity,
        )
        .expect("aliased");
    assert_eq!(aliased.statistics.map(|stats| stats.max), Some(80.0));
    assert_eq!(aliased.field.chain[0], "sas");

    let plain = OptimizedSummarizer
        .summarize(&DigestContext::new("strategic_analysis"), &layers, &identity)
        .expect("plain");
    assert!(plain.statistics.is_none());
    assert!(!plain.field.chain.iter().any(|field| field == "sas"));
}

#[test]
fn missing_metric_degrades_to_a_notice() {
    let layers = normalize_layers(&[RawLayer::new(
        "zips",
        vec![
            json!({ "DESCRIPTION": "10001 (New York)", "unrelated": 4 }),
            json!({ "DESCRIPTION": "H3A 1B2 Montreal", "unrelated": 9 }),
        ],
    )]);
    let summary = OptimizedSummarizer
        .summarize(
            &DigestContext::new("competitive_analysis"),
            &layers,
            &IdentityResolver::default(),
        )
        .expect("resolution failure is not terminal");

    assert!(summary.statistics.is_none());
    assert!(summary
        .statistics_notice
        .as_deref()
        .is_some_and(|notice| notice.contains("competitive_analysis_score")));
    assert_eq!(sample_codes(&summary), vec!["10001", "H3A"]);
    assert_eq!(summary.sample[0].label, "New York");
    assert!(summary.sample.iter().all(|entry| entry.score.is_none()));
}

#[test]
fn empty_or_non_numeric_input_is_rejected() {
    let identity = IdentityResolver::default();
    let context = DigestContext::new("generic");

    let empty = normalize_layers(&[RawLayer::new("empty", Vec::new())]);
    assert!(matches!(
        OptimizedSummarizer.summarize(&context, &empty, &identity),
        Err(DigestError::Validation { .. })
    ));

    let names_only = normalize_layers(&[RawLayer::new(
        "names",
        vec![json!({ "name": "Springfield" }), json!({ "name": "Shelbyville" })],
    )]);
    assert!(matches!(
        NaiveSummarizer.summarize(&context, &names_only, &identity),
        Err(DigestError::Validation { .. })
    ));
}

#[test]
fn exclusion_only_shapes_the_sample() {
    let records = vec![
        json!({ "DESCRIPTION": "82190 (Yellowstone National Park)", "value": 100 }),
        json!({ "DESCRIPTION": "10001 (New York)", "value": 60 }),
        json!({ "DESCRIPTION": "10002 (Chelsea)", "value": 40 }),
    ];
    let layers = normalize_layers(&[RawLayer::new("zips", records)]);
    let summary = OptimizedSummarizer
        .summarize(
            &DigestContext::new("generic").with_exclusion(NonBusinessAreaRule),
            &layers,
            &IdentityResolver::default(),
        )
        .expect("summary");

    assert_eq!(summary.statistics.map(|stats| stats.max), Some(100.0));
    assert!(!sample_codes(&summary).contains(&"82190"));
    assert_eq!(summary.counts.excluded_records, 1);
    assert!(summary
        .provenance
        .iter()
        .any(|note| note.kind == ProvenanceKind::Exclusion));
}

#[test]
fn excluding_everything_falls_back_to_unfiltered_extremes() {
    let records: Vec<_> = (0..12)
        .map(|i| json!({ "name": format!("Pine State Park {i}"), "ZIP": format!("{:05}", 50_000 + i), "value": i }))
        .collect();
    let layers = normalize_layers(&[RawLayer::new("parks", records)]);
    let summary = NaiveSummarizer
        .summarize(
            &DigestContext::new("generic").with_exclusion(NonBusinessAreaRule),
            &layers,
            &IdentityResolver::default(),
        )
        .expect("summary");

    assert_eq!(summary.sample.len(), 8);
    assert_eq!(codes_in(&summary, SampleCategory::Top).len(), 5);
    assert_eq!(
        codes_in(&summary, SampleCategory::Bottom),
        vec!["50002", "50001", "50000"]
    );
    assert!(summary
        .provenance
        .iter()
        .any(|note| note.kind == ProvenanceKind::Exclusion && note.detail.contains("falls back")));
}

#[test]
fn rendered_report_keeps_fixed_section_order() {
    let mut raw = five_record_layer();
    raw.total_count = Some(250);
    let layers = normalize_layers(&[raw]);
    let summary = OptimizedSummarizer
        .summarize(
            &DigestContext::new("generic").with_target_field("v"),
            &layers,
            &IdentityResolver::default(),
        )
        .expect("summary");
    let report = summary.render_text();

    let positions: Vec<usize> = crate::digest::summary::SECTIONS
        .iter()
        .map(|header| report.find(header).expect("section present"))
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(report.contains("Mean: 50.00 | Median: 50.00"));
    assert!(report.contains("1. Area D [D] score 95.00 (top)"));
    assert!(report.contains("5 of 250 records"));
    assert!(summary
        .provenance
        .iter()
        .any(|note| note.kind == ProvenanceKind::Upstream));
    // generic analysis lists total population, which these records lack
    assert!(report.contains("=== CONTEXTUAL METRICS ===\nNone"));
}
