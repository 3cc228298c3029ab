use super::context::{DigestContext, DigestRequest, IntakeCounts};
use super::filters::IdentifierPrefilter;
use super::guard::{raw_record_count, PayloadGuard};
use super::identity::IdentityResolver;
use super::record::normalize_layers;
use super::source::{fetch_within, LayerSource};
use super::summarizer::summarizer_for;
use super::summary::views::Summary;
use super::validator::{ConsistencyValidator, ValidationReport};
use super::DigestError;
use crate::config::DigestConfig;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DigestOutcome {
    pub summary: Summary,
    pub report: String,
}

/// Entry point for digest requests. Holds only immutable configuration, so
/// one instance serves concurrent requests without locking.
#[derive(Debug, Default)]
pub struct DigestService {
    config: DigestConfig,
    identity: IdentityResolver,
    validator: ConsistencyValidator,
}

impl DigestService {
    pub fn new(config: DigestConfig) -> Self {
        let validator = ConsistencyValidator::new(config.validator.clone());
        Self {
            config,
            identity: IdentityResolver::default(),
            validator,
        }
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    #[tracing::instrument(
        skip_all,
        fields(analysis_type = %request.analysis_type, layers = request.layers.len())
    )]
    pub fn digest(&self, request: DigestRequest) -> Result<DigestOutcome, DigestError> {
        let raw_records = if request.size_guard.skip && self.config.allow_guard_bypass {
            tracing::debug!("payload guard bypassed by request flag");
            raw_record_count(&request.layers)
        } else {
            PayloadGuard::new(self.config.max_raw_records).check(&request.layers)?
        };

        let mut layers = normalize_layers(&request.layers);
        let prefilter = IdentifierPrefilter::new(request.record_ids.as_ref());
        prefilter.apply(&mut layers);

        let context = DigestContext::from_request(&request).with_intake(IntakeCounts {
            raw_records,
            prefilter_active: prefilter.is_active(),
        });
        let strategy = request.strategy.unwrap_or(self.config.strategy);
        let summary = summarizer_for(strategy).summarize(&context, &layers, &self.identity)?;
        let report = summary.render_text();

        tracing::info!(
            analysis_type = %summary.analysis_type,
            field = %summary.field.primary,
            population = summary.counts.filtered_records,
            scored = summary.counts.scored_records,
            sampled = summary.counts.sampled_records,
            strategy = strategy.label(),
            "digest completed"
        );

        Ok(DigestOutcome { summary, report })
    }

    /// Loads layers under the configured fetch budget, then digests them.
    /// Layers already present on `request` are replaced.
    pub async fn digest_from_source<S: LayerSource>(
        &self,
        source: S,
        mut request: DigestRequest,
    ) -> Result<DigestOutcome, DigestError> {
        request.layers = fetch_within(source, self.config.fetch_timeout).await?;
        self.digest(request)
    }

    pub fn validate(&self, generated: &str, summary_text: &str) -> ValidationReport {
        self.validator.validate(generated, summary_text)
    }
}
