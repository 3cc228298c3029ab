use axum::response::Response;
use serde_json::{json, Value};

use crate::digest::record::{normalize_layers, NormalizedLayer, RawLayer};
use crate::digest::sampling::SamplingLimits;
use crate::digest::summary::views::Summary;

/// Five records with a plain `v` metric: D=95, A=90, C=50, B=10, E=5.
pub(super) fn five_record_layer() -> RawLayer {
    RawLayer::new(
        "letters",
        vec![
            json!({ "id": "A", "v": 90 }),
            json!({ "id": "B", "v": 10 }),
            json!({ "id": "C", "v": 50 }),
            json!({ "id": "D", "v": 95 }),
            json!({ "id": "E", "v": 5 }),
        ],
    )
}

pub(super) fn small_limits() -> SamplingLimits {
    SamplingLimits {
        top: 2,
        bottom: 2,
        median_nearest: 1,
        mean_nearest: 1,
        deciles: 0,
        ..SamplingLimits::default()
    }
}

/// Deterministic ZIP-code records shaped like a feature export: metric
/// under a legacy name, nested properties, numeric strings, ties and a few
/// extreme values.
pub(super) fn zip_records(n: usize, seed: u64) -> Vec<Value> {
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    (0..n)
        .map(|i| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let zip = 10_000 + (i % 80_000);
            let base = ((state >> 35) % 10_000) as f64 / 100.0;
            let score = match i % 211 {
                0 => base * 40.0,
                7 => 0.0,
                _ if i % 9 == 0 => 42.0,
                _ => base,
            };
            let population = 500 + ((state >> 20) % 50_000);
            if i % 3 == 0 {
                json!({
                    "properties": {
                        "DESCRIPTION": format!("{zip} (Area {i})"),
                        "strategic_value_score": score,
                        "total_population": population.to_string(),
                    }
                })
            } else {
                json!({
                    "ZIP": format!("{zip:05}"),
                    "NAME": format!("Area {i}"),
                    "strategic_value_score": score,
                    "total_population": population,
                    "median_income": 40_000 + (i % 7) * 1_000,
                })
            }
        })
        .collect()
}

pub(super) fn zip_layers(n: usize, seed: u64) -> Vec<NormalizedLayer> {
    normalize_layers(&[RawLayer::new("zips", zip_records(n, seed))])
}

pub(super) fn sample_codes(summary: &Summary) -> Vec<&str> {
    summary
        .sample
        .iter()
        .map(|entry| entry.code.as_str())
        .collect()
}

pub(super) async fn read_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
