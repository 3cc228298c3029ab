use super::record::NormalizedRecord;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn thousands_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[-+]?\d{1,3}(,\d{3})+(\.\d+)?$").expect("thousands regex must compile")
    })
}

/// Numbers pass through; numeric strings are parsed. Commas are accepted only
/// as well-formed thousands separators. NaN and infinities are rejected.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed.contains(',') {
                if !thousands_re().is_match(trimmed) {
                    return None;
                }
                trimmed.replace(',', "").parse::<f64>().ok()?
            } else {
                trimmed.parse::<f64>().ok()?
            }
        }
        _ => return None,
    };

    number.is_finite().then_some(number)
}

/// First numeric value along `chain`.
///
/// Normalized records are already flat, but data that skipped normalization
/// may still carry the metric one object deeper, so that level is checked too.
pub fn resolve_score<S: AsRef<str>>(record: &NormalizedRecord, chain: &[S]) -> Option<f64> {
    let attributes = record.attributes();

    chain
        .iter()
        .find_map(|field| attributes.get(field.as_ref()).and_then(coerce_number))
        .or_else(|| {
            chain.iter().find_map(|field| {
                attributes.values().find_map(|value| match value {
                    Value::Object(inner) => inner.get(field.as_ref()).and_then(coerce_number),
                    _ => None,
                })
            })
        })
}

/// Whether the record carries any numeric attribute at all.
pub fn has_numeric_attribute(record: &NormalizedRecord) -> bool {
    record
        .attributes()
        .values()
        .any(|value| coerce_number(value).is_some())
}
