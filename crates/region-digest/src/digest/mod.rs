//! Bounded, deterministic digests of large geographic record sets.
//!
//! Raw layers pass through the payload guard, the normalizer and the
//! optional identifier pre-filter before a [`Summarizer`] resolves the metric
//! field, computes full-population statistics and picks a small
//! representative sample. The resulting [`Summary`] is rendered as a typed
//! object and as a fixed-section text report.

pub mod context;
pub mod fields;
pub mod filters;
pub mod guard;
pub mod identity;
pub mod record;
pub mod router;
pub mod sampling;
pub mod score;
pub mod service;
pub mod source;
pub mod stats;
pub mod summarizer;
pub mod summary;
pub mod validator;

#[cfg(test)]
mod tests;

pub use context::{DigestContext, DigestRequest, IntakeCounts, SizeGuardFlags};
pub use fields::{resolve_field, FieldAliases, FieldSource, ResolvedField};
pub use filters::{ExclusionRule, IdentifierPrefilter, NonBusinessAreaRule};
pub use guard::PayloadGuard;
pub use identity::{IdentityResolver, ResolveMode, SharedLabelResolver};
pub use record::{NormalizedLayer, NormalizedRecord, RawLayer};
pub use router::{digest_router, DigestResponse};
pub use sampling::{SampleCategory, SamplingLimits};
pub use service::{DigestOutcome, DigestService};
pub use source::{fetch_within, CsvLayerFile, InlineLayers, JsonLayerFile, LayerSource, SourceError};
pub use stats::SummaryStatistics;
pub use summarizer::{
    summarizer_for, NaiveSummarizer, OptimizedSummarizer, Summarizer, SummarizerStrategy,
};
pub use summary::views::Summary;
pub use validator::{ConsistencyValidator, ValidationIssue, ValidationReport, ValidationRequest};

/// Terminal failures of a digest request.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("invalid digest request: {reason}")]
    Validation { reason: String },
    #[error("payload too large: {received} raw records exceed the limit of {limit}")]
    Oversize { received: usize, limit: usize },
    #[error("upstream data fetch exceeded its {budget_ms} ms budget")]
    UpstreamTimeout { budget_ms: u64 },
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl DigestError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Remediation advice returned alongside the error message.
    pub fn hint(&self) -> String {
        match self {
            Self::Validation { .. } => {
                "supply at least one layer with records carrying a numeric attribute".to_string()
            }
            Self::Oversize { limit, .. } => format!(
                "pre-aggregate or filter records client-side so that no more than {limit} raw records are sent"
            ),
            Self::UpstreamTimeout { .. } => {
                "retry later or narrow the requested area so the data fetch completes in time"
                    .to_string()
            }
            Self::Source(_) => "check that the layer input is valid JSON or CSV".to_string(),
        }
    }
}
