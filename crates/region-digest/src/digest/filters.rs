use super::identity::ID_KEYS;
use super::record::{NormalizedLayer, NormalizedRecord};
use std::collections::HashSet;

const IDENTIFIER_KEYS: &[&str] = &["GEOID", "ZIP", "zip", "zip_code", "FSA", "geo_code"];

/// Narrows layers to the records a caller selected upstream (for example by
/// a spatial query). Records are matched on their identifier attributes.
#[derive(Debug, Clone, Default)]
pub struct IdentifierPrefilter {
    identifiers: Option<HashSet<String>>,
}

impl IdentifierPrefilter {
    pub fn new<I, S>(identifiers: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            identifiers: identifiers.map(|ids| {
                ids.into_iter()
                    .map(|id| id.as_ref().trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect()
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.identifiers.is_some()
    }

    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        let Some(identifiers) = &self.identifiers else {
            return true;
        };

        ID_KEYS
            .iter()
            .chain(IDENTIFIER_KEYS)
            .filter_map(|key| record.text(key))
            .any(|value| identifiers.contains(&value))
    }

    /// Drops unmatched records in place; returns how many were kept.
    pub fn apply(&self, layers: &mut [NormalizedLayer]) -> usize {
        if !self.is_active() {
            return layers.iter().map(|layer| layer.records.len()).sum();
        }

        layers
            .iter_mut()
            .map(|layer| {
                layer.records.retain(|record| self.matches(record));
                layer.records.len()
            })
            .sum()
    }
}

/// Predicate removing records that should not appear in the sample.
pub trait ExclusionRule: Send + Sync {
    fn excludes(&self, record: &NormalizedRecord) -> bool;

    fn name(&self) -> &'static str;
}

/// Protected or administrative areas that are not business regions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonBusinessAreaRule;

const NON_BUSINESS_MARKERS: &[&str] = &[
    "national park",
    "state park",
    "national forest",
    "state forest",
    "wildlife refuge",
    "wilderness",
    "military",
    "air force base",
    "army base",
    "naval",
    "airport",
    "reservoir",
    "lake ",
    "water body",
];

const TEXT_KEYS: &[&str] = &[
    "DESCRIPTION",
    "description",
    "area_name",
    "NAME",
    "name",
    "land_use",
];

impl ExclusionRule for NonBusinessAreaRule {
    fn excludes(&self, record: &NormalizedRecord) -> bool {
        TEXT_KEYS
            .iter()
            .filter_map(|key| record.text(key))
            .any(|text| {
                let lowered = format!("{} ", text.to_lowercase());
                NON_BUSINESS_MARKERS
                    .iter()
                    .any(|marker| lowered.contains(marker))
            })
    }

    fn name(&self) -> &'static str {
        "non-business areas"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::record::{normalize_layers, normalize_record, RawLayer};
    use serde_json::json;

    #[test]
    fn prefilter_keeps_matching_identifiers_only() {
        let mut layers = normalize_layers(&[RawLayer::new(
            "zips",
            vec![
                json!({ "ID": "10001", "value": 1 }),
                json!({ "properties": { "ZIP": 10002, "value": 2 } }),
                json!({ "ID": "10003", "value": 3 }),
            ],
        )]);
        let filter = IdentifierPrefilter::new(Some(["10001", "10002"]));
        assert_eq!(filter.apply(&mut layers), 2);
        assert_eq!(layers[0].records.len(), 2);
    }

    #[test]
    fn inactive_prefilter_keeps_everything() {
        let mut layers = normalize_layers(&[RawLayer::new(
            "zips",
            vec![json!({ "value": 1 }), json!({ "value": 2 })],
        )]);
        let filter = IdentifierPrefilter::new(None::<Vec<String>>);
        assert!(!filter.is_active());
        assert_eq!(filter.apply(&mut layers), 2);
    }

    #[test]
    fn non_business_rule_matches_protected_areas() {
        let rule = NonBusinessAreaRule;
        assert!(rule.excludes(&normalize_record(
            &json!({ "DESCRIPTION": "99999 (Yellowstone National Park)" })
        )));
        assert!(rule.excludes(&normalize_record(&json!({ "name": "Regional Airport" }))));
        assert!(rule.excludes(&normalize_record(&json!({ "name": "Crystal Lake" }))));
        assert!(!rule.excludes(&normalize_record(&json!({ "name": "Lakewood" }))));
        assert!(!rule.excludes(&normalize_record(&json!({ "DESCRIPTION": "10001 (New York)" }))));
        assert!(!rule.excludes(&normalize_record(&json!({}))));
    }
}
