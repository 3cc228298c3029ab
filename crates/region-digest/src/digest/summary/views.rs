use super::super::fields::ResolvedField;
use super::super::sampling::SampleCategory;
use super::super::stats::SummaryStatistics;
use super::super::summarizer::SummarizerStrategy;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerOverview {
    pub id: String,
    pub name: String,
    pub records: usize,
    pub total_count: usize,
    pub presampled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextualStatistics {
    pub field: String,
    pub label: &'static str,
    pub statistics: SummaryStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleEntryView {
    /// Position in the sample, starting at 1.
    pub position: usize,
    /// Rank among all scored records, starting at 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_rank: Option<usize>,
    pub label: String,
    pub code: String,
    pub score: Option<f64>,
    pub category: SampleCategory,
    pub category_label: &'static str,
    pub layer_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceKind {
    Field,
    Statistics,
    Sample,
    Upstream,
    Prefilter,
    Exclusion,
}

impl ProvenanceKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Statistics => "statistics",
            Self::Sample => "sample",
            Self::Upstream => "upstream",
            Self::Prefilter => "pre-filter",
            Self::Exclusion => "exclusion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvenanceNote {
    pub kind: ProvenanceKind,
    pub detail: String,
}

impl ProvenanceNote {
    pub(crate) fn new(kind: ProvenanceKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    /// Records received, before the identifier pre-filter.
    pub raw_records: usize,
    /// Records that reached summarization.
    pub filtered_records: usize,
    pub scored_records: usize,
    /// Records held out of the sample by the exclusion rule.
    pub excluded_records: usize,
    pub sampled_records: usize,
    /// Sum of upstream layer totals; exceeds `raw_records` when pre-sampled.
    pub reported_total: usize,
}

/// Typed digest of one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub analysis_type: String,
    pub field: ResolvedField,
    pub strategy: SummarizerStrategy,
    /// Over every scored record; `None` when nothing resolved to a number.
    pub statistics: Option<SummaryStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics_notice: Option<String>,
    pub contextual: Vec<ContextualStatistics>,
    pub sample: Vec<SampleEntryView>,
    pub provenance: Vec<ProvenanceNote>,
    pub counts: SummaryCounts,
    pub layers: Vec<LayerOverview>,
}
