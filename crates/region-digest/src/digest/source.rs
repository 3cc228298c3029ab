//! Raw layer acquisition ahead of the digest pipeline.

use super::record::{AttributeMap, RawLayer};
use super::DigestError;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse layer JSON from {origin}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse CSV records from {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Boundary to whatever produces raw layers (request bodies, files, remote
/// feature services). Consumed once per request.
pub trait LayerSource: Send {
    fn fetch(self) -> impl Future<Output = Result<Vec<RawLayer>, SourceError>> + Send;
}

/// Awaits `source` under a wall-clock budget. An expired budget fails the
/// request outright; whatever the source had produced so far is dropped.
pub async fn fetch_within<S: LayerSource>(
    source: S,
    budget: Duration,
) -> Result<Vec<RawLayer>, DigestError> {
    match tokio::time::timeout(budget, source.fetch()).await {
        Ok(layers) => Ok(layers?),
        Err(_) => {
            let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(budget_ms, "layer fetch exceeded its budget");
            Err(DigestError::UpstreamTimeout { budget_ms })
        }
    }
}

/// Layers that already arrived with the request.
#[derive(Debug, Clone, Default)]
pub struct InlineLayers(pub Vec<RawLayer>);

impl LayerSource for InlineLayers {
    async fn fetch(self) -> Result<Vec<RawLayer>, SourceError> {
        Ok(self.0)
    }
}

/// A JSON file holding a layer array, a `{ "layers": [...] }` wrapper, or a
/// single layer / feature collection.
#[derive(Debug, Clone)]
pub struct JsonLayerFile {
    path: PathBuf,
}

impl JsonLayerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LayerSource for JsonLayerFile {
    async fn fetch(self) -> Result<Vec<RawLayer>, SourceError> {
        let bytes = read_file(&self.path).await?;
        let mut layers = parse_layer_document(&bytes).map_err(|source| SourceError::Json {
            origin: self.path.display().to_string(),
            source,
        })?;

        if let [layer] = layers.as_mut_slice() {
            if layer.id.trim().is_empty() {
                layer.id = file_stem(&self.path);
            }
        }
        Ok(layers)
    }
}

/// A CSV file read as one layer: one record per row, headers as keys.
#[derive(Debug, Clone)]
pub struct CsvLayerFile {
    path: PathBuf,
}

impl CsvLayerFile {
    /// The file stem becomes the layer id.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LayerSource for CsvLayerFile {
    async fn fetch(self) -> Result<Vec<RawLayer>, SourceError> {
        let bytes = read_file(&self.path).await?;
        let layer = parse_csv_layer(bytes.as_slice(), file_stem(&self.path)).map_err(|source| SourceError::Csv {
            path: self.path.clone(),
            source,
        })?;
        Ok(vec![layer])
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LayerDocument {
    Many(Vec<RawLayer>),
    Wrapped { layers: Vec<RawLayer> },
    Single(RawLayer),
}

pub fn parse_layer_document(bytes: &[u8]) -> Result<Vec<RawLayer>, serde_json::Error> {
    Ok(match serde_json::from_slice::<LayerDocument>(bytes)? {
        LayerDocument::Many(layers) | LayerDocument::Wrapped { layers } => layers,
        LayerDocument::Single(layer) => vec![layer],
    })
}

/// Empty cells become `null` so they never count as present attributes.
pub fn parse_csv_layer<R: Read>(reader: R, id: String) -> Result<RawLayer, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();

    for row in csv_reader.records() {
        let row = row?;
        let attributes: AttributeMap = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (header.to_string(), value)
            })
            .collect();
        records.push(Value::Object(attributes));
    }

    Ok(RawLayer::new(id, records))
}

async fn read_file(path: &Path) -> Result<Vec<u8>, SourceError> {
    tokio::fs::read(path).await.map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
