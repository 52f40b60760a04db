//! Operational endpoints: liveness, readiness and the Prometheus scrape target

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;

use crate::handlers::estimate::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Handle /health
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "street-smarts",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Handle /ready
///
/// The listener binds only after reference data and the price model have
/// loaded, so this reports what was loaded rather than probing anything.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ready",
        "canonical_models": state.estimator.index().len(),
    }))
}

/// Handle /metrics
pub async fn metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        handle.render(),
    )
}
