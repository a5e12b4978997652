//! Observability for the Talking Stick service.
//!
//! - [`health`] - liveness/readiness endpoints
//! - [`metrics`] - Prometheus metric definitions and recorder setup

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;

/// Router serving `/metrics` in Prometheus text format.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    )
}
