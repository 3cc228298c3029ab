//! Display labels and short geographic codes for records.
//!
//! Both chains are total: every input, however malformed, produces a
//! non-empty string. A missing name must never stop the rest of the
//! population from being summarized.

use super::record::NormalizedRecord;
use super::score::coerce_number;
use regex::Regex;
use std::sync::OnceLock;

/// Long-form description as merged from the nested level.
const NESTED_DESCRIPTION_KEY: &str = "DESCRIPTION";
const FLAT_DESCRIPTION_KEY: &str = "description";
const AREA_NAME_KEY: &str = "area_name";

const NAME_KEYS: &[&str] = &[
    "NAME",
    "name",
    "Name",
    "area_description",
    "region_name",
    "geo_name",
    "DisplayName",
    "display_name",
    "city",
    "county",
];

const CODE_KEYS: &[&str] = &[
    "ZIP",
    "zip",
    "ZIP_CODE",
    "zip_code",
    "postal_code",
    "FSA",
    "GEOID",
    "geo_code",
];

pub(crate) const ID_KEYS: &[&str] = &["ID", "id", "Id"];

/// Synthetic numeric surrogates attached by upstream exports.
const SURROGATE_KEYS: &[&str] = &["OBJECTID", "FID", "objectid", "fid"];

pub const UNKNOWN_CODE: &str = "Unknown";

fn regional_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]\d[A-Z]\b").expect("regional code regex must compile"))
}

fn digits_before_paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*\(").expect("paren digits regex must compile"))
}

fn leading_digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)").expect("leading digits regex must compile"))
}

fn five_digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{5}").expect("five digit regex must compile"))
}

fn parenthesized_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^()]*\(([^()]+)\)\s*$").expect("parenthesized name regex must compile")
    })
}

/// How much detail a shared resolver should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    Full,
    Short,
}

/// Name lookup shared with other consumers of the same records.
pub trait SharedLabelResolver: Send + Sync {
    fn resolve(&self, record: &NormalizedRecord, mode: ResolveMode) -> Option<String>;
}

/// Builds "City, ST" style names from place attributes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceNameResolver;

impl SharedLabelResolver for PlaceNameResolver {
    fn resolve(&self, record: &NormalizedRecord, mode: ResolveMode) -> Option<String> {
        let place = ["place_name", "PLACE_NAME", "city_name"]
            .iter()
            .find_map(|key| record.text(key))?;

        if mode == ResolveMode::Short {
            return Some(place);
        }

        match ["state", "STATE", "state_abbr", "province"]
            .iter()
            .find_map(|key| record.text(key))
        {
            Some(state) => Some(format!("{place}, {state}")),
            None => Some(place),
        }
    }
}

/// Resolves labels and codes, delegating to a shared resolver mid-chain.
pub struct IdentityResolver {
    shared: Box<dyn SharedLabelResolver>,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::with_shared(PlaceNameResolver)
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver").finish_non_exhaustive()
    }
}

impl IdentityResolver {
    pub fn with_shared<R: SharedLabelResolver + 'static>(shared: R) -> Self {
        Self {
            shared: Box::new(shared),
        }
    }

    /// Human-readable label; `index` is the record's position in its batch
    /// and only used by the last fallback.
    pub fn label(&self, record: &NormalizedRecord, index: usize) -> String {
        if let Some(description) = description_text(record) {
            return label_from_description(&description);
        }

        if let Some(area) = record.text(AREA_NAME_KEY) {
            return area;
        }

        if let Some(shared) = self
            .shared
            .resolve(record, ResolveMode::Full)
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
        {
            return shared;
        }

        if let Some(name) = first_text(record, NAME_KEYS) {
            return name;
        }

        if let Some(token) = surrogate_token(record) {
            return token;
        }

        if let Some(id) = first_text(record, ID_KEYS) {
            return format!("Area {id}");
        }

        format!("Location {}", index.saturating_add(1))
    }

    /// Short geographic code such as a postal code; `"Unknown"` as last resort.
    pub fn code(&self, record: &NormalizedRecord) -> String {
        if let Some(code) = description_text(record).and_then(|text| code_from_description(&text)) {
            return code;
        }

        if let Some(code) = first_text(record, CODE_KEYS)
            .or_else(|| first_text(record, ID_KEYS))
            .or_else(|| record.text(AREA_NAME_KEY))
            .or_else(|| first_text(record, NAME_KEYS))
        {
            return code;
        }

        surrogate_token(record).unwrap_or_else(|| UNKNOWN_CODE.to_string())
    }
}

/// Nested, then flat, then outer-level description; first non-blank wins.
fn description_text(record: &NormalizedRecord) -> Option<String> {
    record
        .text(NESTED_DESCRIPTION_KEY)
        .or_else(|| record.text(FLAT_DESCRIPTION_KEY))
        .or_else(|| record.top_level_text(NESTED_DESCRIPTION_KEY))
        .or_else(|| record.top_level_text(FLAT_DESCRIPTION_KEY))
}

/// `"10001 (New York)"` → `"New York"`; anything else is used as-is.
pub fn label_from_description(description: &str) -> String {
    let trimmed = description.trim();
    parenthesized_name_re()
        .captures(trimmed)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(trimmed)
        .to_string()
}

/// Regional letter-digit-letter code first, then the digit patterns.
pub fn code_from_description(description: &str) -> Option<String> {
    if let Some(found) = regional_code_re().find(description) {
        return Some(found.as_str().to_string());
    }

    for pattern in [digits_before_paren_re(), leading_digits_re()] {
        if let Some(digits) = pattern.captures(description).and_then(|c| c.get(1)) {
            return Some(digits.as_str().to_string());
        }
    }

    five_digits_re()
        .find(description)
        .map(|found| found.as_str().to_string())
}

fn first_text(record: &NormalizedRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| record.text(key))
}

fn surrogate_token(record: &NormalizedRecord) -> Option<String> {
    SURROGATE_KEYS
        .iter()
        .find_map(|key| record.get(key).and_then(coerce_number))
        .map(surrogate_code)
}

/// Stable, non-cryptographic token for a numeric surrogate.
///
/// Values within 0.1 of an integer render as that integer. Otherwise the
/// fractional part scaled to five digits is added to the integer part and
/// reduced modulo 100000, giving a zero-padded five digit pseudo-code.
pub fn surrogate_code(value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() <= 0.1 {
        return format!("{}", rounded as i64);
    }

    let fraction = (value.fract().abs() * 100_000.0).round() as u64;
    let whole = (value.trunc().abs() as u64) % 100_000;
    format!("{:05}", (fraction + whole) % 100_000)
}
