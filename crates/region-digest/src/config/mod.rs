use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::digest::SummarizerStrategy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub digest: DigestConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => raw.parse::<LogFormat>()?,
            Err(_) => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            digest: DigestConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Output style for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                key: "APP_LOG_FORMAT",
                value: other.to_string(),
            }),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

pub const DEFAULT_MAX_RAW_RECORDS: usize = 5_000;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Limits and strategy selection for the digest pipeline.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Ceiling on the aggregate raw record count accepted per request.
    pub max_raw_records: usize,
    pub strategy: SummarizerStrategy,
    /// Wall-clock budget for loading raw layers before the pipeline starts.
    pub fetch_timeout: Duration,
    /// Whether callers may skip the payload guard through request flags.
    pub allow_guard_bypass: bool,
    pub validator: ValidatorConfig,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            max_raw_records: DEFAULT_MAX_RAW_RECORDS,
            strategy: SummarizerStrategy::Optimized,
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            allow_guard_bypass: false,
            validator: ValidatorConfig::default(),
        }
    }
}

impl DigestConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_raw_records = parse_env("DIGEST_MAX_RAW_RECORDS", defaults.max_raw_records)?;
        let strategy = match env::var("DIGEST_STRATEGY") {
            Ok(raw) => raw
                .parse::<SummarizerStrategy>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "DIGEST_STRATEGY",
                    value: raw,
                })?,
            Err(_) => defaults.strategy,
        };
        let timeout_ms = parse_env("DIGEST_FETCH_TIMEOUT_MS", DEFAULT_FETCH_TIMEOUT_MS)?;
        let allow_guard_bypass = parse_env("DIGEST_ALLOW_GUARD_BYPASS", false)?;

        let mut validator = ValidatorConfig::default();
        if let Ok(raw) = env::var("DIGEST_DISALLOWED_PREFIXES") {
            validator.disallowed_prefixes = raw
                .split(',')
                .map(str::trim)
                .filter(|prefix| !prefix.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(Self {
            max_raw_records,
            strategy,
            fetch_timeout: Duration::from_millis(timeout_ms),
            allow_guard_bypass,
            validator,
        })
    }
}

/// Heuristics applied by the consistency validator to generated text.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorConfig {
    /// Leading digits of 5-digit codes that never belong to the served regions.
    pub disallowed_prefixes: Vec<String>,
    /// Fractional parts that synthetic figures tend to cluster on.
    pub suspicious_fractions: Vec<f64>,
    pub fraction_tolerance: f64,
    /// More clustered decimals than this marks the text as suspicious.
    pub max_clustered_decimals: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            disallowed_prefixes: ["00", "96", "97", "98", "99"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            suspicious_fractions: vec![0.25, 0.5, 0.75, 0.33, 0.67],
            fraction_tolerance: 0.01,
            max_clustered_decimals: 3,
        }
    }
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("{key} has an unsupported value '{value}'")]
    InvalidValue { key: &'static str, value: String },
}
