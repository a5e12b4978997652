//! `/health` and `/ready` for the Talking Stick service.
//!
//! The service moves through three phases: starting until the listener is
//! bound, serving while new sessions are accepted, and draining once a
//! shutdown signal arrives. `/health` answers 200 in every phase so the
//! process is not restarted mid-drain; `/ready` answers 200 only while
//! serving.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const STARTING: u8 = 0;
const SERVING: u8 = 1;
const DRAINING: u8 = 2;

/// Lifecycle phase shared by `main` and the health routes.
#[derive(Debug)]
pub struct HealthState {
    phase: AtomicU8,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Starts in the starting phase: live, not ready.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(STARTING),
        }
    }

    /// Listener bound; begin taking traffic.
    pub fn set_ready(&self) {
        self.phase.store(SERVING, Ordering::SeqCst);
    }

    /// Shutdown has begun. Draining is terminal.
    pub fn set_not_ready(&self) {
        self.phase.store(DRAINING, Ordering::SeqCst);
    }

    /// The process answers requests in every phase.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(
            self.phase.load(Ordering::SeqCst),
            STARTING | SERVING | DRAINING
        )
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase.load(Ordering::SeqCst) == SERVING
    }
}

pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(health_state)
}

fn status_for(ok: bool) -> StatusCode {
    if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn health(State(state): State<Arc<HealthState>>) -> StatusCode {
    status_for(state.is_live())
}

async fn ready(State(state): State<Arc<HealthState>>) -> StatusCode {
    status_for(state.is_ready())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    async fn get_status(state: &Arc<HealthState>, uri: &str) -> StatusCode {
        health_router(Arc::clone(state))
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn test_phases_in_order() {
        let state = HealthState::default();
        assert!(state.is_live());
        assert!(!state.is_ready());

        state.set_ready();
        assert!(state.is_ready());

        state.set_not_ready();
        assert_eq!(state.phase.load(Ordering::SeqCst), DRAINING);
        assert!(!state.is_ready());
        assert!(state.is_live());
    }

    #[tokio::test]
    async fn test_endpoints_across_lifecycle() {
        let state = Arc::new(HealthState::new());
        assert_eq!(get_status(&state, "/health").await, StatusCode::OK);
        assert_eq!(get_status(&state, "/ready").await, StatusCode::SERVICE_UNAVAILABLE);

        state.set_ready();
        assert_eq!(get_status(&state, "/ready").await, StatusCode::OK);

        // Sessions are still being closed; keep the process alive
        state.set_not_ready();
        assert_eq!(get_status(&state, "/health").await, StatusCode::OK);
        assert_eq!(get_status(&state, "/ready").await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_other_paths_not_routed() {
        let state = Arc::new(HealthState::new());
        assert_eq!(get_status(&state, "/healthz").await, StatusCode::NOT_FOUND);
    }
}
