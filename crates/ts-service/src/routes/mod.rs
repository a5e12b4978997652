//! HTTP routes for the Talking Stick service.
//!
//! Defines the Axum router and application state.

use crate::handlers;
use crate::observability::{health_router, metrics_router, HealthState};
use crate::session::SessionRegistry;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions.
    pub registry: Arc<SessionRegistry>,
}

/// Build the application routes.
///
/// - `/v1/sessions/...` - command API
/// - `/health`, `/ready` - liveness and readiness
/// - `/metrics` - Prometheus exposition, when a recorder is installed
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(
    state: Arc<AppState>,
    health_state: Arc<HealthState>,
    prometheus: Option<PrometheusHandle>,
) -> Router {
    let api_routes = Router::new()
        .route("/v1/sessions", post(handlers::create_session))
        .route(
            "/v1/sessions/:channel_id",
            get(handlers::get_session).delete(handlers::end_session),
        )
        .route("/v1/sessions/:channel_id/start", post(handlers::start_session))
        .route("/v1/sessions/:channel_id/pass", post(handlers::pass_turn))
        .route("/v1/sessions/:channel_id/skip", post(handlers::skip_turn))
        .route(
            "/v1/sessions/:channel_id/actions/:custom_id",
            post(handlers::handle_action),
        )
        .with_state(state);

    let mut app = api_routes.merge(health_router(health_state));
    if let Some(handle) = prometheus {
        app = app.merge(metrics_router(handle));
    }

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    app.layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
