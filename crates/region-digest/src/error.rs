use crate::config::ConfigError;
use crate::digest::DigestError;
use crate::telemetry::TelemetryError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Digest(DigestError),
    Request(JsonRejection),
    Task(tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Digest(DigestError::Validation { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Digest(DigestError::Oversize { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Digest(DigestError::UpstreamTimeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Digest(DigestError::Source(_)) => StatusCode::BAD_REQUEST,
            AppError::Request(rejection) => rejection.status(),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn hint(&self) -> String {
        match self {
            AppError::Digest(err) => err.hint(),
            AppError::Request(_) => {
                "send a JSON body with `layers` and `analysis_type` fields".to_string()
            }
            AppError::Config(_) => "review the APP_* and DIGEST_* environment variables".to_string(),
            AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Task(_) => "check the service logs for details".to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Digest(err) => write!(f, "{}", err),
            AppError::Request(err) => write!(f, "malformed request: {}", err.body_text()),
            AppError::Task(err) => write!(f, "digest task failed: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Digest(err) => Some(err),
            AppError::Request(err) => Some(err),
            AppError::Task(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string(), "hint": self.hint() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<DigestError> for AppError {
    fn from(value: DigestError) -> Self {
        Self::Digest(value)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Task(value)
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        Self::Request(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_errors_map_to_distinct_statuses() {
        let cases = [
            (
                AppError::from(DigestError::Validation {
                    reason: "no records supplied".to_string(),
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::from(DigestError::Oversize {
                    received: 5_001,
                    limit: 5_000,
                }),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                AppError::from(DigestError::UpstreamTimeout { budget_ms: 10 }),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                AppError::from(ConfigError::InvalidPort),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{error}");
            assert!(!error.hint().is_empty());
        }
    }

    #[test]
    fn oversize_hint_names_the_limit() {
        let error = AppError::from(DigestError::Oversize {
            received: 9_000,
            limit: 5_000,
        });
        assert!(error.to_string().contains("payload too large"));
        assert!(error.hint().contains("5000"));
    }

    #[tokio::test]
    async fn failed_digest_task_is_an_internal_error() {
        let join_error = tokio::task::spawn_blocking(|| panic!("summarizer panicked"))
            .await
            .expect_err("task panics");
        let error = AppError::from(join_error);
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.to_string().starts_with("digest task failed"));
    }
}
