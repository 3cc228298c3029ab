use super::super::context::DigestContext;
use super::super::fields::{contextual_chain, resolve_field};
use super::super::identity::IdentityResolver;
use super::super::record::{NormalizedLayer, NormalizedRecord};
use super::super::sampling::{hybrid_sample, SampleAnchors, SampleCategory};
use super::super::score::has_numeric_attribute;
use super::super::stats::SummaryStatistics;
use super::super::summarizer::{Scored, Summarizer};
use super::super::DigestError;
use super::views::{
    ContextualStatistics, LayerOverview, ProvenanceKind, ProvenanceNote, SampleEntryView, Summary,
    SummaryCounts,
};
use std::collections::{HashMap, HashSet};

/// Layer position plus the record itself, in flattened population order.
type Member<'a> = (usize, &'a NormalizedRecord);

struct SampleOutcome {
    entries: Vec<SampleEntryView>,
    excluded: usize,
    fallback: bool,
}

#[tracing::instrument(skip_all, fields(strategy = summarizer.strategy().label()))]
pub(crate) fn assemble<S: Summarizer + ?Sized>(
    summarizer: &S,
    context: &DigestContext,
    layers: &[NormalizedLayer],
    identity: &IdentityResolver,
) -> Result<Summary, DigestError> {
    let members: Vec<Member<'_>> = layers
        .iter()
        .enumerate()
        .flat_map(|(position, layer)| layer.records.iter().map(move |record| (position, record)))
        .collect();
    if members.is_empty() {
        return Err(DigestError::validation("no records supplied"));
    }
    let records: Vec<&NormalizedRecord> = members.iter().map(|(_, record)| *record).collect();

    let field = resolve_field(
        &context.analysis_type,
        context.target_field.as_deref(),
        &context.aliases,
        layers,
    );

    let mut ranked: Vec<Scored> = summarizer
        .score(&records, &field.chain)
        .into_iter()
        .enumerate()
        .filter_map(|(index, score)| score.map(|score| (index, score)))
        .collect();

    let statistics = SummaryStatistics::from_numbers(ranked.iter().map(|(_, score)| *score));
    let statistics_notice = match statistics {
        Some(_) => None,
        None => {
            if !records.iter().any(|record| has_numeric_attribute(record)) {
                return Err(DigestError::validation(
                    "no record carries a numeric attribute to summarize",
                ));
            }
            tracing::warn!(
                field = %field.primary,
                population = records.len(),
                "field resolved but no record has a numeric value for it"
            );
            Some(format!(
                "No numeric values were found for '{}' across {} records; statistics are unavailable.",
                field.primary,
                records.len()
            ))
        }
    };

    let contextual = field
        .contextual
        .iter()
        .filter_map(|metric| {
            let chain = contextual_chain(metric, &context.aliases);
            let values = summarizer.score(&records, &chain);
            SummaryStatistics::from_numbers(values.into_iter().flatten()).map(|statistics| {
                ContextualStatistics {
                    field: metric.field.to_string(),
                    label: metric.label,
                    statistics,
                }
            })
        })
        .collect();

    let outcome = match &statistics {
        Some(stats) => {
            summarizer.rank(&mut ranked);
            sample_ranked(summarizer, context, identity, layers, &members, &ranked, stats)
        }
        None => sample_unscored(context, identity, layers, &members),
    };

    let counts = SummaryCounts {
        raw_records: context.intake.raw_records.max(members.len()),
        filtered_records: members.len(),
        scored_records: ranked.len(),
        excluded_records: outcome.excluded,
        sampled_records: outcome.entries.len(),
        reported_total: layers.iter().map(|layer| layer.total_count).sum(),
    };

    let provenance = provenance_notes(
        context,
        layers,
        &field.primary,
        &field.chain,
        field.source.label(),
        &counts,
        statistics.is_some(),
        outcome.fallback,
    );

    tracing::debug!(
        scored = counts.scored_records,
        sampled = counts.sampled_records,
        excluded = counts.excluded_records,
        "summary assembled"
    );

    Ok(Summary {
        analysis_type: field.analysis_type.clone(),
        field,
        strategy: summarizer.strategy(),
        statistics,
        statistics_notice,
        contextual,
        sample: outcome.entries,
        provenance,
        counts,
        layers: layers.iter().map(layer_overview).collect(),
    })
}

fn sample_ranked<S: Summarizer + ?Sized>(
    summarizer: &S,
    context: &DigestContext,
    identity: &IdentityResolver,
    layers: &[NormalizedLayer],
    members: &[Member<'_>],
    ranked: &[Scored],
    stats: &SummaryStatistics,
) -> SampleOutcome {
    let scores: Vec<f64> = ranked.iter().map(|(_, score)| *score).collect();
    let excluded: Vec<bool> = match &context.exclusion {
        Some(rule) => ranked
            .iter()
            .map(|(index, _)| rule.excludes(members[*index].1))
            .collect(),
        None => Vec::new(),
    };

    // codes are only resolved for picked records
    let mut codes: HashMap<usize, String> = HashMap::new();
    let selection = hybrid_sample(
        &scores,
        &excluded,
        &SampleAnchors::from(stats),
        &context.limits,
        summarizer.selector(),
        |rank| {
            let (index, score) = ranked[rank];
            let code = codes
                .entry(rank)
                .or_insert_with(|| identity.code(members[index].1))
                .clone();
            (code, score.to_bits())
        },
    );

    if selection.fallback {
        tracing::warn!(
            rule = context.exclusion.as_ref().map(|rule| rule.name()).unwrap_or_default(),
            excluded = selection.excluded,
            "exclusion removed every candidate; sampling unfiltered extremes"
        );
    }

    let entries = selection
        .picks
        .iter()
        .enumerate()
        .map(|(position, pick)| {
            let (index, score) = ranked[pick.rank];
            let (layer, record) = members[index];
            SampleEntryView {
                position: position + 1,
                population_rank: Some(pick.rank + 1),
                label: identity.label(record, index),
                code: codes
                    .remove(&pick.rank)
                    .unwrap_or_else(|| identity.code(record)),
                score: Some(score),
                category: pick.category,
                category_label: pick.category.label(),
                layer_id: layers[layer].id.clone(),
            }
        })
        .collect();

    SampleOutcome {
        entries,
        excluded: selection.excluded,
        fallback: selection.fallback,
    }
}

/// Without scores there is nothing to rank; list records in input order.
fn sample_unscored(
    context: &DigestContext,
    identity: &IdentityResolver,
    layers: &[NormalizedLayer],
    members: &[Member<'_>],
) -> SampleOutcome {
    let mut seen = HashSet::new();
    let entries = members
        .iter()
        .enumerate()
        .filter_map(|(index, (layer, record))| {
            let code = identity.code(record);
            seen.insert(code.clone())
                .then_some((index, *layer, *record, code))
        })
        .take(context.limits.top.min(context.limits.max_entries))
        .enumerate()
        .map(|(position, (index, layer, record, code))| SampleEntryView {
            position: position + 1,
            population_rank: None,
            label: identity.label(record, index),
            code,
            score: None,
            category: SampleCategory::Top,
            category_label: SampleCategory::Top.label(),
            layer_id: layers[layer].id.clone(),
        })
        .collect();

    SampleOutcome {
        entries,
        excluded: 0,
        fallback: false,
    }
}

#[allow(clippy::too_many_arguments)]
fn provenance_notes(
    context: &DigestContext,
    layers: &[NormalizedLayer],
    primary: &str,
    chain: &[String],
    source: &str,
    counts: &SummaryCounts,
    has_statistics: bool,
    fallback: bool,
) -> Vec<ProvenanceNote> {
    let mut notes = vec![ProvenanceNote::new(
        ProvenanceKind::Field,
        format!(
            "Primary metric '{primary}' resolved via {source}; lookup order: {}",
            chain.join(" > ")
        ),
    )];

    if has_statistics {
        notes.push(ProvenanceNote::new(
            ProvenanceKind::Statistics,
            format!(
                "Statistics cover all {} scored records across {} layer(s), not only the sample",
                counts.scored_records,
                layers.len()
            ),
        ));
        notes.push(ProvenanceNote::new(
            ProvenanceKind::Sample,
            format!(
                "The sample lists {} of {} scored records; per-record scores are individual values, not aggregates",
                counts.sampled_records, counts.scored_records
            ),
        ));
    } else {
        notes.push(ProvenanceNote::new(
            ProvenanceKind::Sample,
            format!(
                "No record carries a score; the sample lists the first {} records in input order",
                counts.sampled_records
            ),
        ));
    }

    for layer in layers.iter().filter(|layer| layer.is_presampled()) {
        notes.push(ProvenanceNote::new(
            ProvenanceKind::Upstream,
            format!(
                "Layer '{}' carried {} of {} upstream records; figures reflect the records received",
                layer.name,
                layer.records.len(),
                layer.total_count
            ),
        ));
    }

    if context.intake.prefilter_active {
        notes.push(ProvenanceNote::new(
            ProvenanceKind::Prefilter,
            format!(
                "{} of {} records kept by the identifier pre-filter",
                counts.filtered_records, counts.raw_records
            ),
        ));
    }

    if let Some(rule) = &context.exclusion {
        let detail = if fallback {
            format!(
                "Every ranked record matched the {} rule; the sample falls back to the unfiltered top and bottom records",
                rule.name()
            )
        } else {
            format!(
                "{} records matching the {} rule were left out of the sample; statistics still include them",
                counts.excluded_records,
                rule.name()
            )
        };
        notes.push(ProvenanceNote::new(ProvenanceKind::Exclusion, detail));
    }

    notes
}

fn layer_overview(layer: &NormalizedLayer) -> LayerOverview {
    LayerOverview {
        id: layer.id.clone(),
        name: layer.name.clone(),
        records: layer.records.len(),
        total_count: layer.total_count,
        presampled: layer.is_presampled(),
    }
}
