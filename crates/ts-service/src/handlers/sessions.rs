//! Session command handlers.
//!
//! - `POST /v1/sessions` - Create (and optionally start) a session
//! - `GET /v1/sessions/:channel_id` - Current session state
//! - `POST /v1/sessions/:channel_id/start` - Start
//! - `POST /v1/sessions/:channel_id/pass` - Pass to a member, or to the next one
//! - `POST /v1/sessions/:channel_id/skip` - Pass to the next member
//! - `POST /v1/sessions/:channel_id/actions/:custom_id` - Control-panel action
//! - `DELETE /v1/sessions/:channel_id` - End

use crate::errors::TsError;
use crate::models::{ActionRequest, CreateSessionRequest, PassRequest, SessionResponse};
use crate::routes::AppState;
use crate::session::Action;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::types::ChannelId;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Handler for `POST /v1/sessions`
///
/// - 201 Created: session state
/// - 400: no voice members, invalid duration
/// - 409: a session already exists for the channel
/// - 502: member lookup failed
/// - 503: shutting down
#[instrument(skip_all, fields(guild_id = %request.guild_id, channel_id = %request.channel_id))]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), TsError> {
    let registry = &state.registry;
    let duration = request.duration_secs.map(Duration::from_secs);

    let mut snapshot = registry
        .create(&request.guild_id, &request.channel_id, duration)
        .await?;

    if request.auto_start {
        registry.start(&request.channel_id).await?;
        snapshot = registry.snapshot(&request.channel_id).await?;
    }

    info!(
        target: "ts.http",
        channel_id = %request.channel_id,
        auto_start = request.auto_start,
        "Session created via API"
    );

    Ok((StatusCode::CREATED, Json(snapshot.into())))
}

/// Handler for `GET /v1/sessions/:channel_id`
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<ChannelId>,
) -> Result<Json<SessionResponse>, TsError> {
    let snapshot = state.registry.snapshot(&channel_id).await?;
    Ok(Json(snapshot.into()))
}

/// Handler for `POST /v1/sessions/:channel_id/start`
#[instrument(skip_all, fields(channel_id = %channel_id))]
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<ChannelId>,
) -> Result<Response, TsError> {
    state.registry.start(&channel_id).await?;
    current_state(&state, &channel_id).await
}

/// Handler for `POST /v1/sessions/:channel_id/pass`
///
/// The body is optional; without a `user_id` this is a skip. A body that
/// does not parse is rejected with 400 rather than treated as a skip.
#[instrument(skip_all, fields(channel_id = %channel_id))]
pub async fn pass_turn(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<ChannelId>,
    body: Bytes,
) -> Result<Response, TsError> {
    let request: PassRequest = optional_body(&body)?;
    match request.user_id {
        Some(user_id) => state.registry.pass(&channel_id, &user_id).await?,
        None => state.registry.skip(&channel_id).await?,
    }
    current_state(&state, &channel_id).await
}

/// Handler for `POST /v1/sessions/:channel_id/skip`
#[instrument(skip_all, fields(channel_id = %channel_id))]
pub async fn skip_turn(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<ChannelId>,
) -> Result<Response, TsError> {
    state.registry.skip(&channel_id).await?;
    current_state(&state, &channel_id).await
}

/// Handler for `POST /v1/sessions/:channel_id/actions/:custom_id`
///
/// Unknown ids return 400 `UNKNOWN_ACTION`. Quit returns 204.
#[instrument(skip_all, fields(channel_id = %channel_id, custom_id = %custom_id))]
pub async fn handle_action(
    State(state): State<Arc<AppState>>,
    Path((channel_id, custom_id)): Path<(ChannelId, String)>,
    body: Bytes,
) -> Result<Response, TsError> {
    let request: ActionRequest = optional_body(&body)?;
    let action = Action::parse(&custom_id, request.value.as_deref())?;

    state.registry.handle(&channel_id, action).await?;
    current_state(&state, &channel_id).await
}

/// Handler for `DELETE /v1/sessions/:channel_id`
#[instrument(skip_all, fields(channel_id = %channel_id))]
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<ChannelId>,
) -> Result<StatusCode, TsError> {
    state.registry.end(&channel_id).await?;
    info!(target: "ts.http", channel_id = %channel_id, "Session ended via API");
    Ok(StatusCode::NO_CONTENT)
}

/// Parse an optional JSON body; an empty body yields the default request.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, TsError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| TsError::BadRequest(e.to_string()))
}

/// Session state after a command, or 204 if the command ended it.
async fn current_state(state: &AppState, channel_id: &ChannelId) -> Result<Response, TsError> {
    match state.registry.snapshot(channel_id).await {
        Ok(snapshot) => Ok(Json(SessionResponse::from(snapshot)).into_response()),
        Err(TsError::SessionNotFound) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => Err(e),
    }
}
