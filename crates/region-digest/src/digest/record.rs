use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat attribute map shared by every normalized record.
pub type AttributeMap = Map<String, Value>;

/// Keys under which upstream exports tuck the real attribute map.
const NESTED_KEYS: [&str; 2] = ["properties", "attributes"];

/// A layer exactly as received, before any shape cleanup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLayer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "features")]
    pub records: Vec<Value>,
    /// Upstream population size; larger than `records.len()` when pre-sampled.
    #[serde(default, alias = "totalCount")]
    pub total_count: Option<usize>,
}

impl RawLayer {
    pub fn new(id: impl Into<String>, records: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            name: None,
            records,
            total_count: None,
        }
    }
}

/// One record after the nested shapes have been merged into a single map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    attributes: AttributeMap,
    top_level: AttributeMap,
}

impl NormalizedRecord {
    /// Merged attributes; nested values won any key collision.
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Attributes that sat on the outermost object, before merging.
    pub fn top_level(&self) -> &AttributeMap {
        &self.top_level
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes
            .get(key)
            .is_some_and(|value| !value.is_null())
    }

    /// Non-empty display text for `key` (strings trimmed, numbers rendered).
    pub fn text(&self, key: &str) -> Option<String> {
        self.attributes.get(key).and_then(attribute_text)
    }

    pub fn top_level_text(&self, key: &str) -> Option<String> {
        self.top_level.get(key).and_then(attribute_text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLayer {
    pub id: String,
    pub name: String,
    pub records: Vec<NormalizedRecord>,
    pub total_count: usize,
}

impl NormalizedLayer {
    /// True when the upstream population was larger than what was sent.
    pub fn is_presampled(&self) -> bool {
        self.total_count > self.records.len()
    }
}

pub(crate) fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Flattens a raw record of unknown shape. Never fails: non-object input
/// yields an empty record, and empty nested maps leave the outer map as-is.
pub fn normalize_record(raw: &Value) -> NormalizedRecord {
    let Value::Object(outer) = raw else {
        return NormalizedRecord::default();
    };

    let (top_level, mut nested) = split_level(outer);
    let mut attributes = top_level.clone();

    while let Some(level) = nested {
        let (flat, deeper) = split_level(level);
        for (key, value) in flat {
            attributes.insert(key, value);
        }
        nested = deeper;
    }

    NormalizedRecord {
        attributes,
        top_level,
    }
}

/// Separates one object into its plain attributes and its first nested map.
fn split_level(level: &AttributeMap) -> (AttributeMap, Option<&AttributeMap>) {
    let mut flat = AttributeMap::new();
    let mut nested = None;

    for (key, value) in level {
        match value {
            Value::Object(inner) if NESTED_KEYS.contains(&key.as_str()) => {
                if nested.is_none() && !inner.is_empty() {
                    nested = Some(inner);
                } else if !inner.is_empty() {
                    // A second container on the same level still contributes
                    // its attributes; outer keys keep priority over it.
                    for (inner_key, inner_value) in inner {
                        if !inner_value.is_object() {
                            flat.entry(inner_key.clone())
                                .or_insert_with(|| inner_value.clone());
                        }
                    }
                }
            }
            _ => {
                flat.insert(key.clone(), value.clone());
            }
        }
    }

    (flat, nested)
}

pub fn normalize_layer(raw: &RawLayer, position: usize) -> NormalizedLayer {
    let id = if raw.id.trim().is_empty() {
        format!("layer-{}", position + 1)
    } else {
        raw.id.trim().to_string()
    };
    let name = raw
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| id.clone());
    let records: Vec<NormalizedRecord> = raw.records.iter().map(normalize_record).collect();
    let total_count = raw.total_count.unwrap_or(0).max(records.len());

    tracing::debug!(layer = %id, records = records.len(), total_count, "normalized layer");

    NormalizedLayer {
        id,
        name,
        records,
        total_count,
    }
}

/// Layers have no cross-dependencies, so each one is normalized on its own worker.
pub fn normalize_layers(raw: &[RawLayer]) -> Vec<NormalizedLayer> {
    raw.par_iter()
        .enumerate()
        .map(|(position, layer)| normalize_layer(layer, position))
        .collect()
}
