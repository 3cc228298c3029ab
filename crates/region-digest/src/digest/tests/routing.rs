use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::config::DigestConfig;
use crate::digest::{digest_router, DigestService};

fn router() -> axum::Router {
    digest_router(Arc::new(DigestService::new(DigestConfig::default())))
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize body")))
        .expect("request")
}

#[tokio::test]
async fn digest_endpoint_returns_summary_and_report() {
    let body = json!({
        "analysisType": "generic",
        "target_field": "v",
        "layers": [five_record_layer()],
    });

    let response = router()
        .oneshot(post_json("/api/v1/digest", &body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json(response).await;
    assert!(payload["generated_at"].is_string());
    assert_eq!(payload["summary"]["statistics"]["median"], json!(50.0));
    assert_eq!(payload["summary"]["sample"][0]["code"], json!("D"));
    assert_eq!(payload["summary"]["sample"][0]["category"], json!("top"));
    assert!(payload["report"]
        .as_str()
        .is_some_and(|report| report.starts_with("=== DATASET OVERVIEW ===")));
}

#[tokio::test]
async fn oversize_payload_is_rejected_with_hint() {
    let records: Vec<Value> = (0..5_001).map(|i| json!({ "value": i })).collect();
    let body = json!({ "analysis_type": "generic", "layers": [{ "id": "big", "records": records }] });

    let response = router()
        .oneshot(post_json("/api/v1/digest", &body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let payload = read_json(response).await;
    assert!(payload["error"]
        .as_str()
        .is_some_and(|error| error.contains("payload too large")));
    assert!(payload["hint"]
        .as_str()
        .is_some_and(|hint| hint.contains("pre-aggregate")));
}

#[tokio::test]
async fn empty_layers_are_unprocessable() {
    let response = router()
        .oneshot(post_json(
            "/api/v1/digest",
            &json!({ "analysis_type": "generic", "layers": [] }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json(response).await;
    assert!(payload["hint"].is_string());
}

#[tokio::test]
async fn malformed_body_uses_error_shape() {
    let request = Request::post("/api/v1/digest")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .expect("request");

    let response = router().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json(response).await;
    assert!(payload["error"]
        .as_str()
        .is_some_and(|error| error.starts_with("malformed request")));
}

#[tokio::test]
async fn validate_endpoint_reports_issues() {
    let body = json!({
        "generated_text": "Top performer is 60601.",
        "summary_text": "1. New York [10001] score 95.00 (top)",
    });
    let response = router()
        .oneshot(post_json("/api/v1/digest/validate", &body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json(response).await;
    assert_eq!(payload["is_valid"], json!(false));
    assert_eq!(payload["issues"][0]["kind"], json!("fabricated_code"));
    assert_eq!(payload["issues"][0]["token"], json!("60601"));
}

#[tokio::test]
async fn concurrent_digests_complete_independently() {
    let app = router();
    let first = json!({ "analysis_type": "generic", "target_field": "v", "layers": [five_record_layer()] });
    let second = json!({ "analysis_type": "generic", "layers": [] });

    let (ok, rejected) = tokio::join!(
        app.clone().oneshot(post_json("/api/v1/digest", &first)),
        app.clone().oneshot(post_json("/api/v1/digest", &second)),
    );
    assert_eq!(ok.expect("response").status(), StatusCode::OK);
    assert_eq!(
        rejected.expect("response").status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}
