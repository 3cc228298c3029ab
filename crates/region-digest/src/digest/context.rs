use super::fields::FieldAliases;
use super::filters::{ExclusionRule, NonBusinessAreaRule};
use super::record::RawLayer;
use super::sampling::SamplingLimits;
use super::summarizer::SummarizerStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-controlled switches for the inbound size check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeGuardFlags {
    /// Honoured only when the service is configured to allow bypasses.
    #[serde(default)]
    pub skip: bool,
}

/// Wire shape of a digest request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DigestRequest {
    #[serde(default)]
    pub layers: Vec<RawLayer>,
    #[serde(default, alias = "analysisType")]
    pub analysis_type: String,
    #[serde(default, alias = "targetField")]
    pub target_field: Option<String>,
    #[serde(default, alias = "fieldAliases")]
    pub field_aliases: FieldAliases,
    /// Identifiers selected upstream; `None` keeps every record.
    #[serde(default, alias = "recordIds")]
    pub record_ids: Option<Vec<String>>,
    #[serde(default, alias = "sizeGuard")]
    pub size_guard: SizeGuardFlags,
    #[serde(default)]
    pub strategy: Option<SummarizerStrategy>,
    #[serde(default, alias = "excludeNonBusinessAreas")]
    pub exclude_non_business_areas: bool,
}

impl DigestRequest {
    pub fn new(analysis_type: impl Into<String>, layers: Vec<RawLayer>) -> Self {
        Self {
            analysis_type: analysis_type.into(),
            layers,
            ..Self::default()
        }
    }
}

/// Record counts observed before summarization starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeCounts {
    pub raw_records: usize,
    pub prefilter_active: bool,
}

/// Everything a single digest invocation needs besides the records.
///
/// Built fresh for every request and passed by reference through field
/// resolution, scoring and sampling. Aliases never outlive it.
pub struct DigestContext {
    pub analysis_type: String,
    pub target_field: Option<String>,
    pub aliases: FieldAliases,
    pub limits: SamplingLimits,
    pub exclusion: Option<Box<dyn ExclusionRule>>,
    pub intake: IntakeCounts,
}

impl DigestContext {
    pub fn new(analysis_type: impl Into<String>) -> Self {
        Self {
            analysis_type: analysis_type.into(),
            target_field: None,
            aliases: FieldAliases::default(),
            limits: SamplingLimits::default(),
            exclusion: None,
            intake: IntakeCounts::default(),
        }
    }

    pub fn from_request(request: &DigestRequest) -> Self {
        let mut context = Self::new(request.analysis_type.clone())
            .with_aliases(request.field_aliases.clone());
        context.target_field = request.target_field.clone();
        if request.exclude_non_business_areas {
            context.exclusion = Some(Box::new(NonBusinessAreaRule));
        }
        context
    }

    pub fn with_target_field(mut self, field: impl Into<String>) -> Self {
        self.target_field = Some(field.into());
        self
    }

    pub fn with_aliases(mut self, aliases: FieldAliases) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_limits(mut self, limits: SamplingLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_exclusion<R: ExclusionRule + 'static>(mut self, rule: R) -> Self {
        self.exclusion = Some(Box::new(rule));
        self
    }

    pub fn with_intake(mut self, intake: IntakeCounts) -> Self {
        self.intake = intake;
        self
    }
}

impl fmt::Debug for DigestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestContext")
            .field("analysis_type", &self.analysis_type)
            .field("target_field", &self.target_field)
            .field("aliases", &self.aliases)
            .field("limits", &self.limits)
            .field("exclusion", &self.exclusion.as_ref().map(|rule| rule.name()))
            .field("intake", &self.intake)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_accepts_camel_case_aliases() {
        let request: DigestRequest = serde_json::from_value(json!({
            "analysisType": "strategic-analysis",
            "targetField": "score_2024",
            "fieldAliases": { "strategic_analysis_score": "sas" },
            "recordIds": ["10001"],
            "sizeGuard": { "skip": true },
            "strategy": "naive",
            "layers": [{ "id": "zips", "features": [{ "properties": { "sas": 1 } }] }]
        }))
        .expect("request parses");

        assert_eq!(request.analysis_type, "strategic-analysis");
        assert_eq!(request.target_field.as_deref(), Some("score_2024"));
        assert_eq!(request.field_aliases.get("strategic_analysis_score"), Some("sas"));
        assert_eq!(request.record_ids, Some(vec!["10001".to_string()]));
        assert!(request.size_guard.skip);
        assert_eq!(request.strategy, Some(SummarizerStrategy::Naive));
        assert_eq!(request.layers[0].records.len(), 1);
    }

    #[test]
    fn context_carries_request_scoped_settings() {
        let mut request = DigestRequest::new("demographic_insights", Vec::new());
        request.exclude_non_business_areas = true;
        request.field_aliases.insert("total_population", "POP");

        let context = DigestContext::from_request(&request);
        assert_eq!(context.aliases.get("total_population"), Some("POP"));
        assert_eq!(
            context.exclusion.as_ref().map(|rule| rule.name()),
            Some("non-business areas")
        );
        assert_eq!(context.limits, SamplingLimits::default());
    }
}
