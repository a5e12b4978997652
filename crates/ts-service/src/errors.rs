//! Talking Stick error types.
//!
//! Registry-level errors surface directly to the command layer, which renders
//! `client_message()` to the user. All variants map to HTTP status codes via
//! the `IntoResponse` impl. Platform failures during turn passing and session
//! close never reach this type; they are logged where they happen.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Talking Stick error type.
///
/// Maps to HTTP status codes:
/// - `SessionNotFound`, `MemberNotInSession`: 404 Not Found
/// - `SessionAlreadyExists`, `SessionInactive`: 409 Conflict
/// - `NoVoiceMembers`, `UnknownAction`, `InvalidDuration`, `BadRequest`: 400 Bad Request
/// - `Platform`: 502 Bad Gateway
/// - `Draining`: 503 Service Unavailable
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TsError {
    /// A live session already exists for the channel.
    #[error("a talking stick session already exists")]
    SessionAlreadyExists,

    /// The channel has no live session.
    #[error("channel has no active talking stick session")]
    SessionNotFound,

    /// The session exists but is not accepting turn changes (new, paused or ended).
    #[error("the talking stick session is not active")]
    SessionInactive,

    /// Nobody is connected to the voice channel.
    #[error("no members are connected to the voice channel")]
    NoVoiceMembers,

    /// The requested user is not part of the session's rotation.
    #[error("member is not part of the talking stick session")]
    MemberNotInSession,

    /// A control-panel action id was not recognised.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// A turn duration outside the accepted range.
    #[error("invalid turn duration: {0}")]
    InvalidDuration(String),

    /// Malformed command payload.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The chat platform failed while creating a session.
    #[error("platform error: {0}")]
    Platform(String),

    /// The registry is shutting down and no longer accepts sessions.
    #[error("talking stick service is shutting down")]
    Draining,
}

impl TsError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            TsError::SessionNotFound | TsError::MemberNotInSession => StatusCode::NOT_FOUND,
            TsError::SessionAlreadyExists | TsError::SessionInactive => StatusCode::CONFLICT,
            TsError::NoVoiceMembers
            | TsError::UnknownAction(_)
            | TsError::InvalidDuration(_)
            | TsError::BadRequest(_) => StatusCode::BAD_REQUEST,
            TsError::Platform(_) => StatusCode::BAD_GATEWAY,
            TsError::Draining => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable machine-readable code for API clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            TsError::SessionAlreadyExists => "SESSION_ALREADY_EXISTS",
            TsError::SessionNotFound => "SESSION_NOT_FOUND",
            TsError::SessionInactive => "SESSION_INACTIVE",
            TsError::NoVoiceMembers => "NO_VOICE_MEMBERS",
            TsError::MemberNotInSession => "MEMBER_NOT_IN_SESSION",
            TsError::UnknownAction(_) => "UNKNOWN_ACTION",
            TsError::InvalidDuration(_) => "INVALID_DURATION",
            TsError::BadRequest(_) => "BAD_REQUEST",
            TsError::Platform(_) => "PLATFORM_ERROR",
            TsError::Draining => "DRAINING",
        }
    }

    /// Returns a user-facing message (no platform internals).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            TsError::SessionNotFound => {
                "There is no active talking stick session in your current channel".to_string()
            }
            TsError::NoVoiceMembers => {
                "Nobody is in your voice channel. Join one and try again".to_string()
            }
            TsError::Platform(_) => "Failed to reach the chat platform, please retry".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for TsError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let TsError::Platform(reason) = &self {
            // Details stay server-side
            tracing::warn!(target: "ts.http", reason = %reason, "Platform call failed");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.client_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}
