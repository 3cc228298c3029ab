use super::record::NormalizedLayer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Field used when an analysis type is unknown.
pub const GENERIC_FIELD: &str = "value";

/// Tried after every type-specific field, in order.
pub const GENERIC_FALLBACKS: &[&str] = &["value", "score", "thematic_value"];

/// Secondary metric reported alongside the primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextualFieldSpec {
    pub field: &'static str,
    pub label: &'static str,
}

const fn ctx(field: &'static str, label: &'static str) -> ContextualFieldSpec {
    ContextualFieldSpec { field, label }
}

const POPULATION: ContextualFieldSpec = ctx("total_population", "Total population");
const INCOME: ContextualFieldSpec = ctx("median_income", "Median household income");
const DIVERSITY: ContextualFieldSpec = ctx("diversity_index", "Diversity index");
const MARKET_SHARE: ContextualFieldSpec = ctx("market_share", "Market share");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub analysis_type: &'static str,
    pub primary: &'static str,
    pub legacy_fallbacks: &'static [&'static str],
    pub contextual: &'static [ContextualFieldSpec],
}

static GENERIC_SPEC: FieldSpec = FieldSpec {
    analysis_type: "generic",
    primary: GENERIC_FIELD,
    legacy_fallbacks: &[],
    contextual: &[POPULATION],
};

static FIELD_SPECS: &[FieldSpec] = &[
    FieldSpec {
        analysis_type: "strategic_analysis",
        primary: "strategic_analysis_score",
        legacy_fallbacks: &["strategic_value_score", "strategic_score"],
        contextual: &[POPULATION, INCOME, MARKET_SHARE],
    },
    FieldSpec {
        analysis_type: "competitive_analysis",
        primary: "competitive_analysis_score",
        legacy_fallbacks: &["competitive_advantage_score", "competitive_score"],
        contextual: &[MARKET_SHARE, POPULATION],
    },
    FieldSpec {
        analysis_type: "demographic_insights",
        primary: "demographic_insights_score",
        legacy_fallbacks: &["demographic_score", "demographic_opportunity_score"],
        contextual: &[POPULATION, INCOME, DIVERSITY],
    },
    FieldSpec {
        analysis_type: "comparative_analysis",
        primary: "comparison_score",
        legacy_fallbacks: &["comparative_analysis_score", "comparative_score"],
        contextual: &[POPULATION, MARKET_SHARE],
    },
    FieldSpec {
        analysis_type: "brand_difference",
        primary: "brand_difference_score",
        legacy_fallbacks: &["brand_difference", "brand_score"],
        contextual: &[MARKET_SHARE],
    },
    FieldSpec {
        analysis_type: "customer_profile",
        primary: "customer_profile_score",
        legacy_fallbacks: &["profile_score", "persona_score"],
        contextual: &[INCOME, POPULATION],
    },
    FieldSpec {
        analysis_type: "segment_profiling",
        primary: "segment_profiling_score",
        legacy_fallbacks: &["segment_score"],
        contextual: &[POPULATION, INCOME],
    },
    FieldSpec {
        analysis_type: "trend_analysis",
        primary: "trend_strength_score",
        legacy_fallbacks: &["trend_analysis_score", "trend_score"],
        contextual: &[POPULATION],
    },
    FieldSpec {
        analysis_type: "correlation_analysis",
        primary: "correlation_strength_score",
        legacy_fallbacks: &["correlation_analysis_score", "correlation_score"],
        contextual: &[POPULATION, INCOME],
    },
    FieldSpec {
        analysis_type: "anomaly_detection",
        primary: "anomaly_detection_score",
        legacy_fallbacks: &["anomaly_score"],
        contextual: &[POPULATION],
    },
    FieldSpec {
        analysis_type: "outlier_detection",
        primary: "outlier_detection_score",
        legacy_fallbacks: &["outlier_score"],
        contextual: &[POPULATION],
    },
    FieldSpec {
        analysis_type: "feature_interactions",
        primary: "feature_interaction_score",
        legacy_fallbacks: &["interaction_score", "feature_interactions_score"],
        contextual: &[POPULATION, INCOME],
    },
    FieldSpec {
        analysis_type: "spatial_clusters",
        primary: "cluster_performance_score",
        legacy_fallbacks: &["spatial_clusters_score", "cluster_score"],
        contextual: &[POPULATION, DIVERSITY],
    },
    FieldSpec {
        analysis_type: "scenario_analysis",
        primary: "scenario_analysis_score",
        legacy_fallbacks: &["scenario_score"],
        contextual: &[POPULATION, INCOME],
    },
    FieldSpec {
        analysis_type: "predictive_modeling",
        primary: "predictive_modeling_score",
        legacy_fallbacks: &["prediction_score", "predictive_score"],
        contextual: &[POPULATION],
    },
    FieldSpec {
        analysis_type: "housing",
        primary: "housing_score",
        legacy_fallbacks: &["housing_affordability_score"],
        contextual: &[INCOME, POPULATION],
    },
];

static FIELD_SPEC_MAP: OnceLock<HashMap<&'static str, &'static FieldSpec>> = OnceLock::new();

fn field_spec_map() -> &'static HashMap<&'static str, &'static FieldSpec> {
    FIELD_SPEC_MAP.get_or_init(|| {
        FIELD_SPECS
            .iter()
            .map(|spec| (spec.analysis_type, spec))
            .collect()
    })
}

/// Lowercases and folds `-`/whitespace to `_` so `Strategic-Analysis` and
/// `strategic_analysis` select the same entry.
pub fn normalize_analysis_type(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|ch| if ch == '-' || ch.is_whitespace() { '_' } else { ch })
        .collect()
}

/// Total lookup: unknown or empty types get the generic spec.
pub fn field_spec(analysis_type: &str) -> &'static FieldSpec {
    let normalized = normalize_analysis_type(analysis_type);
    field_spec_map()
        .get(normalized.as_str())
        .copied()
        .unwrap_or(&GENERIC_SPEC)
}

pub fn known_analysis_types() -> impl Iterator<Item = &'static str> {
    FIELD_SPECS.iter().map(|spec| spec.analysis_type)
}

/// Caller-supplied field aliases for a single request.
///
/// Keys are canonical field names (or normalized analysis types); values are
/// the attribute names that carry them in this request's data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldAliases(BTreeMap<String, String>);

impl FieldAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, canonical: impl Into<String>, alias: impl Into<String>) {
        let alias = alias.into();
        if !alias.trim().is_empty() {
            self.0.insert(canonical.into(), alias.trim().to_string());
        }
    }

    pub fn get(&self, canonical: &str) -> Option<&str> {
        self.0.get(canonical).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for FieldAliases {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut aliases = Self::new();
        for (canonical, alias) in iter {
            aliases.insert(canonical, alias);
        }
        aliases
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// Caller named the field explicitly and the data carries it.
    Override,
    Table,
    /// Analysis type was not recognized.
    Generic,
}

impl FieldSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Override => "explicit override",
            Self::Table => "analysis type table",
            Self::Generic => "generic fallback",
        }
    }
}

/// Outcome of field resolution: the metric and where to look for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedField {
    pub analysis_type: String,
    pub primary: String,
    /// Ordered attribute names tried by the score resolver.
    pub chain: Vec<String>,
    pub source: FieldSource,
    pub contextual: Vec<ContextualFieldSpec>,
}

/// Picks the metric field for a request. Never fails; the worst case is the
/// generic `value` chain.
pub fn resolve_field(
    analysis_type: &str,
    target_field: Option<&str>,
    aliases: &FieldAliases,
    layers: &[NormalizedLayer],
) -> ResolvedField {
    let normalized = normalize_analysis_type(analysis_type);
    let spec = field_spec(&normalized);

    let contextual = spec.contextual.to_vec();

    if let Some(target) = target_field.map(str::trim).filter(|t| !t.is_empty()) {
        let candidates = with_aliases(&[target], aliases, None);
        if candidates.iter().any(|field| present_in(layers, field)) {
            return ResolvedField {
                analysis_type: normalized,
                primary: target.to_string(),
                chain: candidates,
                source: FieldSource::Override,
                contextual,
            };
        }
        tracing::debug!(target, "target field absent from records; using table");
    }

    let source = if spec.analysis_type == GENERIC_SPEC.analysis_type {
        FieldSource::Generic
    } else {
        FieldSource::Table
    };

    let mut names: Vec<&str> = Vec::with_capacity(1 + spec.legacy_fallbacks.len() + 3);
    names.push(spec.primary);
    names.extend_from_slice(spec.legacy_fallbacks);
    names.extend_from_slice(GENERIC_FALLBACKS);

    ResolvedField {
        chain: with_aliases(&names, aliases, Some(&normalized)),
        analysis_type: normalized,
        primary: spec.primary.to_string(),
        source,
        contextual,
    }
}

/// Chain for a contextual field, honoring the request's aliases.
pub fn contextual_chain(spec: &ContextualFieldSpec, aliases: &FieldAliases) -> Vec<String> {
    with_aliases(&[spec.field], aliases, None)
}

fn with_aliases(names: &[&str], aliases: &FieldAliases, analysis_type: Option<&str>) -> Vec<String> {
    let mut chain: Vec<String> = Vec::with_capacity(names.len() + 1);
    let mut push = |name: &str| {
        if !chain.iter().any(|existing| existing == name) {
            chain.push(name.to_string());
        }
    };

    if let Some(alias) = analysis_type.and_then(|kind| aliases.get(kind)) {
        push(alias);
    }
    for name in names {
        if let Some(alias) = aliases.get(name) {
            push(alias);
        }
        push(name);
    }

    chain
}

fn present_in(layers: &[NormalizedLayer], field: &str) -> bool {
    layers
        .iter()
        .flat_map(|layer| layer.records.iter())
        .any(|record| record.contains(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::record::{normalize_layers, RawLayer};
    use serde_json::json;

    fn layers_with(records: Vec<serde_json::Value>) -> Vec<NormalizedLayer> {
        normalize_layers(&[RawLayer::new("test", records)])
    }

    #[test]
    fn normalizes_case_and_punctuation() {
        assert_eq!(normalize_analysis_type(" Strategic-Analysis "), "strategic_analysis");
        assert_eq!(normalize_analysis_type("brand difference"), "brand_difference");
    }

    #[test]
    fn strategic_analysis_resolves_with_legacy_chain() {
        let resolved = resolve_field("strategic-analysis", None, &FieldAliases::new(), &[]);
        assert_eq!(resolved.primary, "strategic_analysis_score");
        assert_eq!(resolved.source, FieldSource::Table);
        assert_eq!(
            resolved.chain,
            vec![
                "strategic_analysis_score",
                "strategic_value_score",
                "strategic_score",
                "value",
                "score",
                "thematic_value"
            ]
        );
    }

    #[test]
    fn unknown_and_empty_types_fall_back_to_generic_field() {
        for raw in ["", "   ", "??!!", "definitely_not_a_type", "\u{0}"] {
            let resolved = resolve_field(raw, None, &FieldAliases::new(), &[]);
            assert_eq!(resolved.primary, GENERIC_FIELD, "input {raw:?}");
            assert_eq!(resolved.source, FieldSource::Generic);
            assert!(!resolved.chain.is_empty());
        }
    }

    #[test]
    fn every_table_entry_is_reachable() {
        for kind in known_analysis_types() {
            let spec = field_spec(&kind.replace('_', "-").to_uppercase());
            assert_eq!(spec.analysis_type, kind);
        }
    }

    #[test]
    fn override_wins_only_when_present_in_records() {
        let layers = layers_with(vec![json!({ "custom_metric": 4, "value": 1 })]);
        let present = resolve_field(
            "strategic_analysis",
            Some("custom_metric"),
            &FieldAliases::new(),
            &layers,
        );
        assert_eq!(present.primary, "custom_metric");
        assert_eq!(present.source, FieldSource::Override);
        assert_eq!(present.chain, vec!["custom_metric"]);

        let absent = resolve_field(
            "strategic_analysis",
            Some("missing_metric"),
            &FieldAliases::new(),
            &layers,
        );
        assert_eq!(absent.primary, "strategic_analysis_score");
        assert_eq!(absent.source, FieldSource::Table);
    }

    #[test]
    fn aliases_are_tried_before_their_canonical_field() {
        let aliases: FieldAliases = [
            ("strategic_analysis_score".to_string(), "strat_v2".to_string()),
            ("strategic_analysis".to_string(), "client_metric".to_string()),
        ]
        .into_iter()
        .collect();
        let resolved = resolve_field("strategic_analysis", None, &aliases, &[]);
        assert_eq!(resolved.chain[0], "client_metric");
        assert_eq!(resolved.chain[1], "strat_v2");
        assert_eq!(resolved.chain[2], "strategic_analysis_score");
    }

    #[test]
    fn resolution_has_no_lasting_effect_on_later_requests() {
        let aliases: FieldAliases = [("value".to_string(), "client_a_value".to_string())]
            .into_iter()
            .collect();
        let first = resolve_field("unknown", None, &aliases, &[]);
        assert_eq!(first.chain[0], "client_a_value");

        let second = resolve_field("unknown", None, &FieldAliases::new(), &[]);
        assert_eq!(second.chain[0], "value");
    }
}
