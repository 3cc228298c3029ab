use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Parses `canonical=attribute` into an alias pair.
pub(crate) fn parse_alias(raw: &str) -> Result<(String, String), String> {
    let (canonical, attribute) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected canonical=attribute, got '{raw}'"))?;
    let (canonical, attribute) = (canonical.trim(), attribute.trim());
    if canonical.is_empty() || attribute.is_empty() {
        return Err(format!("alias '{raw}' needs both a canonical field and an attribute"));
    }
    Ok((canonical.to_string(), attribute.to_string()))
}
