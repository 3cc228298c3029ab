//! Advisory checks on text generated from a summary.

use crate::config::ValidatorConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn code_token_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\b\d{5}\b").expect("code token regex must compile"))
}

fn decimal_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\d+\.\d+").expect("decimal regex must compile"))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationRequest {
    #[serde(alias = "generatedText")]
    pub generated_text: String,
    #[serde(alias = "summaryText")]
    pub summary_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DisallowedRegion,
    FabricatedCode,
    SuspiciousDecimals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
}

/// Flags out-of-scope or fabricated region codes and synthetic-looking
/// figures. Never blocks delivery.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyValidator {
    config: ValidatorConfig,
}

impl ConsistencyValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, generated: &str, summary_text: &str) -> ValidationReport {
        let generated_codes = code_tokens(generated);
        let summary_codes = code_tokens(summary_text);
        let mut issues = Vec::new();

        for token in generated_codes.union(&summary_codes) {
            if let Some(prefix) = self
                .config
                .disallowed_prefixes
                .iter()
                .find(|prefix| token.starts_with(prefix.as_str()))
            {
                let origin = if generated_codes.contains(token) {
                    "generated text"
                } else {
                    "summary"
                };
                issues.push(ValidationIssue {
                    kind: IssueKind::DisallowedRegion,
                    detail: format!("code {token} in {origin} uses out-of-scope prefix {prefix}"),
                    token: Some(token.to_string()),
                });
            }
        }

        for token in generated_codes.difference(&summary_codes) {
            issues.push(ValidationIssue {
                kind: IssueKind::FabricatedCode,
                detail: format!("code {token} does not appear in the summary"),
                token: Some(token.to_string()),
            });
        }

        let clustered = self.clustered_decimals(generated);
        if clustered > self.config.max_clustered_decimals {
            issues.push(ValidationIssue {
                kind: IssueKind::SuspiciousDecimals,
                detail: format!(
                    "{clustered} decimal values sit on round fractions; figures may be synthetic"
                ),
                token: None,
            });
        }

        if !issues.is_empty() {
            tracing::warn!(issues = issues.len(), "generated text failed consistency checks");
        }

        ValidationReport {
            is_valid: issues.is_empty(),
            issues,
        }
    }

    fn clustered_decimals(&self, text: &str) -> usize {
        decimal_regex()
            .find_iter(text)
            .filter_map(|found| found.as_str().parse::<f64>().ok())
            .filter(|value| {
                let fraction = value.fract();
                self.config
                    .suspicious_fractions
                    .iter()
                    .any(|target| (fraction - target).abs() <= self.config.fraction_tolerance)
            })
            .count()
    }
}

fn code_tokens(text: &str) -> BTreeSet<&str> {
    code_token_regex()
        .find_iter(text)
        .map(|found| found.as_str())
        .collect()
}
