//! Command API integration tests.
//!
//! Drives the full router (API, health) against the mock platform.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::types::{Member, UserId};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use ts_service::observability::HealthState;
use ts_service::platform::{MockPlatform, PlatformGateway};
use ts_service::routes::{build_routes, AppState};
use ts_service::session::{SessionMetrics, SessionRegistry, SessionSettings};

struct TestApp {
    router: Router,
    platform: Arc<MockPlatform>,
    registry: Arc<SessionRegistry>,
}

impl TestApp {
    fn new() -> Self {
        let members = vec![
            Member::new("1", "alice"),
            Member::new("2", "bob"),
            Member::new("3", "carol"),
        ];
        let platform = Arc::new(MockPlatform::new().with_voice_members("20", members));
        let registry = Arc::new(SessionRegistry::new(
            Arc::clone(&platform) as Arc<dyn PlatformGateway>,
            SessionSettings {
                shuffle_members: false,
                ..SessionSettings::default()
            },
            SessionMetrics::new(),
        ));

        let state = Arc::new(AppState {
            registry: Arc::clone(&registry),
        });
        let health = Arc::new(HealthState::new());
        health.set_ready();

        Self {
            router: build_routes(state, health, None),
            platform,
            registry,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_raw(method, uri, body.map(|json| json.to_string()))
            .await
    }

    async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(text) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(text)
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create(&self, auto_start: bool) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/v1/sessions",
            Some(json!({"guild_id": "10", "channel_id": "20", "auto_start": auto_start})),
        )
        .await
    }
}

#[tokio::test]
async fn test_create_with_auto_start() {
    let app = TestApp::new();

    let (status, body) = app.create(true).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"], "active");
    assert_eq!(body["holder"]["id"], "1");
    assert_eq!(body["next"]["id"], "2");
    assert_eq!(body["turn_duration_secs"], 15);
    assert_eq!(body["display"], "active");
    assert_eq!(app.platform.grants(), vec![UserId::from("1")]);

    app.registry.shutdown().await;
}

#[tokio::test]
async fn test_create_without_start_stays_new() {
    let app = TestApp::new();

    let (status, body) = app.create(false).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"], "new");
    assert!(body.get("holder").is_none());

    let (status, body) = app.send(Method::POST, "/v1/sessions/20/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "active");

    app.registry.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_create_conflicts() {
    let app = TestApp::new();
    app.create(false).await;

    let (status, body) = app.create(false).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "SESSION_ALREADY_EXISTS");

    app.registry.shutdown().await;
}

#[tokio::test]
async fn test_create_in_empty_channel() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/sessions",
            Some(json!({"guild_id": "10", "channel_id": "99"})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "NO_VOICE_MEMBERS");
}

#[tokio::test]
async fn test_create_rejects_out_of_range_duration() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/sessions",
            Some(json!({"guild_id": "10", "channel_id": "20", "duration_secs": 0})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_DURATION");
}

#[tokio::test]
async fn test_pass_to_member_and_without_body() {
    let app = TestApp::new();
    app.create(true).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/sessions/20/pass",
            Some(json!({"user_id": "3"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["holder"]["id"], "3");
    assert_eq!(body["previous"]["id"], "1");

    // No body: next in ring
    let (status, body) = app.send(Method::POST, "/v1/sessions/20/pass", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["holder"]["id"], "1");

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/sessions/20/pass",
            Some(json!({"user_id": "42"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "MEMBER_NOT_IN_SESSION");

    app.registry.shutdown().await;
}

#[tokio::test]
async fn test_pass_with_invalid_body_is_rejected() {
    let app = TestApp::new();
    app.create(true).await;

    // Numeric ids do not deserialize; must not fall through to a skip
    let (status, body) = app
        .send(
            Method::POST,
            "/v1/sessions/20/pass",
            Some(json!({"user_id": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = app
        .send_raw(Method::POST, "/v1/sessions/20/pass", Some("{\"user_id\":".into()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (_, body) = app.send(Method::GET, "/v1/sessions/20", None).await;
    assert_eq!(body["holder"]["id"], "1");
    assert_eq!(app.platform.grants(), vec![UserId::from("1")]);

    // Whitespace-only body is the same as no body
    let (status, body) = app
        .send_raw(Method::POST, "/v1/sessions/20/pass", Some("  \n".into()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["holder"]["id"], "2");

    app.registry.shutdown().await;
}

#[tokio::test]
async fn test_action_with_invalid_body_is_rejected() {
    let app = TestApp::new();
    app.create(true).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/sessions/20/actions/ts_set_duration",
            Some(json!({"value": 30})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (_, body) = app.send(Method::GET, "/v1/sessions/20", None).await;
    assert_eq!(body["turn_duration_secs"], 15);

    app.registry.shutdown().await;
}

#[tokio::test]
async fn test_panel_actions() {
    let app = TestApp::new();
    app.create(true).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/sessions/20/actions/ts_toggle_play_pause",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "paused");

    let (status, body) = app.send(Method::POST, "/v1/sessions/20/skip", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "SESSION_INACTIVE");

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/sessions/20/actions/ts_set_duration",
            Some(json!({"value": "30"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["turn_duration_secs"], 30);

    let (status, body) = app
        .send(Method::POST, "/v1/sessions/20/actions/ts_open_settings", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display"], "settings");
    assert_eq!(body["state"], "paused");

    let (_, body) = app
        .send(Method::POST, "/v1/sessions/20/actions/ts_display_back", None)
        .await;
    assert_eq!(body["display"], "paused");

    let (status, body) = app
        .send(Method::POST, "/v1/sessions/20/actions/ts_dance", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "UNKNOWN_ACTION");

    app.registry.shutdown().await;
}

#[tokio::test]
async fn test_quit_action_ends_session() {
    let app = TestApp::new();
    app.create(true).await;

    let (status, _) = app
        .send(Method::POST, "/v1/sessions/20/actions/ts_quit_session", None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.send(Method::GET, "/v1/sessions/20", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "SESSION_NOT_FOUND");

    app.registry.shutdown().await;
}

#[tokio::test]
async fn test_delete_session() {
    let app = TestApp::new();
    app.create(false).await;

    let (status, _) = app.send(Method::DELETE, "/v1/sessions/20", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::DELETE, "/v1/sessions/20", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Channel is free again right away.
    let (status, _) = app.create(false).await;
    assert_eq!(status, StatusCode::CREATED);

    app.registry.shutdown().await;
}

#[tokio::test]
async fn test_health_endpoints_are_merged() {
    let app = TestApp::new();

    let (status, _) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);

    // No recorder installed
    let (status, _) = app.send(Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
